//! 요청 본문 검증.
//!
//! [`ValidatedJson`]은 JSON 파싱 후 `validator` 규칙을 실행하는 핸들러 추출기입니다.
//! 핸들러 추출기이므로 인증/인가 미들웨어를 통과한 요청에서만 실행됩니다.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::check_password_strength;
use crate::error::{ApiError, FieldError};

// ==================== 요청 처리 단계 ====================

/// 요청 처리 단계.
///
/// `Received → Authenticated → Authorized → Validated → Handled` 순으로 진행하며,
/// 앞의 세 단계에서 `Rejected`로 끝날 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Authenticated,
    Authorized,
    Validated,
    Handled,
    Rejected,
}

impl RequestStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStage::Received => "received",
            RequestStage::Authenticated => "authenticated",
            RequestStage::Authorized => "authorized",
            RequestStage::Validated => "validated",
            RequestStage::Handled => "handled",
            RequestStage::Rejected => "rejected",
        }
    }

    /// 종료 단계 여부.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, RequestStage::Handled | RequestStage::Rejected)
    }

    /// `next` 단계로 전이 가능한지 확인.
    pub const fn can_advance_to(&self, next: RequestStage) -> bool {
        use RequestStage::*;
        matches!(
            (self, next),
            (Received, Authenticated)
                | (Authenticated, Authorized)
                | (Authorized, Validated)
                | (Validated, Handled)
                | (Received | Authenticated | Authorized, Rejected)
        )
    }

    /// `next` 단계로 전이하고 기록합니다.
    #[must_use]
    pub fn advance(self, next: RequestStage) -> RequestStage {
        debug_assert!(
            self.can_advance_to(next),
            "invalid request stage transition: {} -> {}",
            self,
            next
        );
        tracing::trace!(from = %self, to = %next, "Request stage");
        next
    }
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== 검증 추출기 ====================

/// 파싱만 된 JSON 본문.
///
/// 규칙 검증 전에 역할별 추가 검사가 필요한 핸들러에서 사용하고,
/// 검사 후 [`validate_body`]를 호출합니다.
#[derive(Debug, Clone)]
pub struct ParsedJson<T>(pub T);

impl<S, T> FromRequest<S> for ParsedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(ParsedJson(value))
    }
}

/// 검증된 JSON 본문.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ParsedJson(value) = ParsedJson::<T>::from_request(req, state).await?;
        validate_body(value).map(ValidatedJson)
    }
}

/// `validator` 규칙 실행.
pub fn validate_body<T: Validate>(value: T) -> Result<T, ApiError> {
    if let Err(errors) = value.validate() {
        let fields = field_errors(&errors);
        tracing::debug!(
            fields = ?fields.iter().map(|f| f.field.as_str()).collect::<Vec<_>>(),
            "Request body failed validation"
        );
        return Err(ApiError::Validation(fields));
    }
    Ok(value)
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => ApiError::Validation(vec![FieldError::new(
            "body",
            "invalid_type",
            err.body_text(),
        )]),
        other => ApiError::MalformedBody(other.body_text()),
    }
}

/// `ValidationErrors`를 필드 단위 에러 목록으로 변환 (필드 이름순).
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} 값이 유효하지 않습니다", field));
                FieldError::new(field.clone(), err.code.to_string(), message)
            })
        })
        .collect();

    fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    fields
}

// ==================== 커스텀 검증 함수 ====================

/// 사용자 이름 검증 (소문자, 숫자, `_`, `-`만 허용).
pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !valid {
        return Err(ValidationError::new("username_charset")
            .with_message("사용자 이름은 소문자, 숫자, '_', '-'만 사용할 수 있습니다".into()));
    }
    Ok(())
}

/// 비밀번호 강도 검증.
pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    check_password_strength(value)
        .map_err(|msg| ValidationError::new("password_strength").with_message(msg.into()))
}

/// 공백만 있는 문자열 거부.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("공백만 입력할 수 없습니다".into()));
    }
    Ok(())
}
