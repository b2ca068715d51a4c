//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/api/v1/healthcheck` - 헬스 체크
//! - `/api/v1/auth` - 회원가입, 로그인, 토큰 관리
//! - `/api/v1/projects` - 프로젝트 및 멤버 관리
//! - `/api/v1/tasks` - 작업/하위 작업
//! - `/api/v1/notes` - 프로젝트 노트
//!
//! 프로젝트 범위 라우트는 모두 `require_project_role` 미들웨어를 거칩니다.

pub mod auth;
pub mod health;
pub mod members;
pub mod notes;
pub mod projects;
pub mod tasks;

use std::sync::Arc;

use axum::{extract::FromRequestParts, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

pub use auth::auth_router;
pub use health::{health_router, ComponentStatus, HealthResponse};
pub use notes::notes_router;
pub use projects::projects_router;
pub use tasks::tasks_router;

/// 단순 메시지 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 경로 파라미터 추출기 (거부 시 [`ApiError::BadRequest`]).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// API 라우터 생성.
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api/v1/healthcheck", health_router())
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/projects", projects_router(state.clone()))
        .nest("/api/v1/tasks", tasks_router(state.clone()))
        .nest("/api/v1/notes", notes_router(state))
}
