//! 통합 API 에러 타입.
//!
//! 모든 계층의 에러는 경계에서 [`ApiError`]로 변환되고,
//! 하나의 응답 형식([`ApiErrorResponse`])으로 직렬화됩니다.
//!
//! | 변형 | HTTP | code |
//! |------|------|------|
//! | `Unauthenticated` | 401 | `UNAUTHENTICATED` |
//! | `InvalidCredentials` | 401 | `INVALID_CREDENTIALS` |
//! | `Forbidden` | 403 | `FORBIDDEN` |
//! | `NotFound` | 404 | `NOT_FOUND` |
//! | `Validation` | 422 | `VALIDATION_FAILED` |
//! | `BadRequest` | 400 | `BAD_REQUEST` |
//! | `MalformedBody` | 400 | `BAD_REQUEST` |
//! | `Conflict` | 409 | `CONFLICT` |
//! | `Internal` | 500 | `INTERNAL_ERROR` |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::validation::RequestStage;

/// 내부 에러 상세 노출 여부 (운영 환경에서는 false).
static EXPOSE_INTERNAL_ERRORS: OnceCell<bool> = OnceCell::new();

/// 서버 시작 시 한 번 호출하여 내부 에러 상세 노출 여부를 설정합니다.
///
/// 설정하지 않으면 상세를 노출하지 않습니다.
pub fn set_expose_internal_errors(expose: bool) {
    if EXPOSE_INTERNAL_ERRORS.set(expose).is_err() {
        tracing::warn!("internal error exposure already configured, ignoring");
    }
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.get().copied().unwrap_or(false)
}

/// 통합 API 에러 응답.
///
/// ```json
/// {
///   "code": "VALIDATION_FAILED",
///   "message": "요청 데이터가 유효하지 않습니다",
///   "details": [{"field": "name", "code": "length", "message": "..."}],
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "UNAUTHENTICATED", "FORBIDDEN", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// 필드 단위 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// 필드 이름
    pub field: String,
    /// 검증 규칙 코드 (예: "length", "email")
    pub code: String,
    /// 에러 메시지
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// API 경계 에러.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 토큰 누락/형식 오류/서명 오류/만료 (원인은 구분하지 않음)
    #[error("인증이 필요합니다")]
    Unauthenticated,

    /// 로그인 실패
    #[error("아이디 또는 비밀번호가 올바르지 않습니다")]
    InvalidCredentials,

    /// 멤버가 아니거나 역할이 부족함 (원인은 구분하지 않음)
    #[error("이 작업을 수행할 권한이 없습니다")]
    Forbidden,

    /// 리소스 없음
    #[error("{0}을(를) 찾을 수 없습니다")]
    NotFound(&'static str),

    /// 요청 본문 검증 실패
    #[error("요청 데이터가 유효하지 않습니다")]
    Validation(Vec<FieldError>),

    /// 잘못된 요청
    #[error("{0}")]
    BadRequest(String),

    /// JSON 본문 파싱 실패 (문법 오류, Content-Type 누락)
    #[error("{0}")]
    MalformedBody(String),

    /// 중복/상태 충돌
    #[error("{0}")]
    Conflict(String),

    /// 예상하지 못한 내부 에러
    #[error("내부 서버 오류가 발생했습니다")]
    Internal(#[from] anyhow::Error),
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 메시지로 내부 에러 생성.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(anyhow::anyhow!(message.into()))
    }

    /// HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 응답 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::BadRequest(_) | ApiError::MalformedBody(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 요청 본문 검증 단계에서 거부된 에러인지 여부.
    pub fn is_body_rejection(&self) -> bool {
        matches!(self, ApiError::Validation(_) | ApiError::MalformedBody(_))
    }

    /// 응답 본문 생성.
    pub fn to_response_body(&self) -> ApiErrorResponse {
        let body = ApiErrorResponse::new(self.code(), self.to_string());
        match self {
            ApiError::Validation(fields) => {
                body.with_details(serde_json::to_value(fields).unwrap_or(Value::Null))
            }
            ApiError::Internal(err) if expose_internal_errors() => {
                let chain: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
                body.with_details(serde_json::json!({ "chain": chain }))
            }
            _ => body,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            tracing::error!(error = %format!("{:#}", err), "Unhandled internal error");
        }

        let body_rejected = self.is_body_rejection();
        let mut response = (self.status(), Json(self.to_response_body())).into_response();
        if body_rejected {
            response.extensions_mut().insert(RequestStage::Rejected);
        }
        response
    }
}

impl From<axum::extract::rejection::PathRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// sqlx 에러 분류.
///
/// 클라이언트 원인(중복, 잘못된 참조)은 4xx, 나머지는 500으로 분리합니다.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("리소스"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("이미 존재하는 값입니다".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::BadRequest("참조하는 리소스가 존재하지 않습니다".to_string())
            }
            _ => ApiError::Internal(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("프로젝트").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Validation(vec![]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Conflict("dup".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_details_are_field_level() {
        let err = ApiError::Validation(vec![FieldError::new("name", "length", "too short")]);
        let body = err.to_response_body();

        assert_eq!(body.code, "VALIDATION_FAILED");
        let details = body.details.unwrap();
        assert_eq!(details[0]["field"], "name");
        assert_eq!(details[0]["code"], "length");
    }

    #[test]
    fn test_internal_error_hides_chain_by_default() {
        // set_expose_internal_errors를 호출하지 않은 상태
        let err = ApiError::internal("connection refused on 10.0.0.5");
        let body = err.to_response_body();
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("10.0.0.5"));
    }

    #[test]
    fn test_body_rejections_mark_rejected_stage() {
        let response = ApiError::MalformedBody("EOF".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.extensions().get::<RequestStage>(),
            Some(&RequestStage::Rejected)
        );

        let response = ApiError::NotFound("작업").into_response();
        assert!(response.extensions().get::<RequestStage>().is_none());
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_pool_errors_are_internal() {
        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_json_serialization_skips_empty_details() {
        let body = ApiError::Forbidden.to_response_body();
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""code":"FORBIDDEN""#));
        assert!(!json.contains("details"));
    }
}
