//! # Camp API
//!
//! ProjectCamp REST API 서버.
//!
//! 모든 프로젝트 범위 요청은 다음 순서의 파이프라인을 거칩니다:
//!
//! 1. 토큰 검증 ([`auth::TokenVerifier`]) - 실패 시 401
//! 2. 멤버십/역할 확인 ([`auth::PermissionGate`]) - 실패 시 403 (또는 404)
//! 3. 요청 본문 검증 ([`validation::ValidatedJson`]) - 실패 시 422
//! 4. 핸들러 실행
//!
//! 라우트별 허용 역할은 [`auth::ROUTE_POLICIES`] 한 곳에 선언됩니다.

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::Router;

pub use error::{ApiError, ApiErrorResponse, ApiResult, FieldError};
pub use state::AppState;

/// API 라우터와 Swagger UI를 합친 애플리케이션 라우터.
///
/// 메트릭/트레이스/CORS/타임아웃 레이어는 바이너리에서 덧붙입니다.
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::create_api_router(state.clone())
        .with_state(state)
        .merge(openapi::swagger_ui_router())
}
