//! 프로젝트 API.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/projects` - 내 프로젝트 목록 (역할, 멤버 수 포함)
//! - `POST /api/v1/projects` - 프로젝트 생성 (생성자는 admin)
//! - `GET /api/v1/projects/{project_id}` - 프로젝트 상세
//! - `PUT /api/v1/projects/{project_id}` - 프로젝트 수정 (admin)
//! - `DELETE /api/v1/projects/{project_id}` - 프로젝트 삭제 (admin)

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use camp_core::ProjectRole;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{require_project_role, AuthUser, ProjectAccess, RouteGuard, RouteId};
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{ProjectInput, ProjectRecord, ProjectRepository, ProjectSummary};
use crate::routes::{members::members_router, MessageResponse};
use crate::state::AppState;
use crate::validation::{validate_not_blank, ValidatedJson};

// ==================== 요청/응답 타입 ====================

/// 프로젝트 생성/수정 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProjectRequest {
    #[validate(
        length(min = 1, max = 100, message = "프로젝트 이름은 1-100자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "설명은 1000자를 넘을 수 없습니다"))]
    pub description: Option<String>,
}

impl From<ProjectRequest> for ProjectInput {
    fn from(request: ProjectRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            description: request.description,
        }
    }
}

/// 프로젝트 목록 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
}

/// 프로젝트 상세 응답 (요청자 역할 포함).
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectRecord,
    pub role: ProjectRole,
}

fn name_conflict(err: sqlx::Error) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("이미 존재하는 프로젝트 이름입니다".to_string()),
        other => other,
    }
}

// ==================== 핸들러 ====================

/// 내 프로젝트 목록.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "프로젝트 목록", body = ProjectListResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    )
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<ProjectListResponse>> {
    debug!(user_id = %identity.user_id, "프로젝트 목록 조회");
    let pool = state.pool()?;

    let projects = ProjectRepository::list_for_user(pool, identity.user_id).await?;
    let total = projects.len();

    Ok(Json(ProjectListResponse { projects, total }))
}

/// 프로젝트 생성.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "projects",
    security(("bearer_auth" = [])),
    request_body = ProjectRequest,
    responses(
        (status = 201, description = "생성 완료", body = ProjectRecord),
        (status = 409, description = "이름 중복", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(request): ValidatedJson<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectRecord>)> {
    let pool = state.pool()?;

    let project = ProjectRepository::create(pool, identity.user_id, request.into())
        .await
        .map_err(name_conflict)?;
    info!(user_id = %identity.user_id, project_id = %project.id, "프로젝트 생성: {}", project.name);

    Ok((StatusCode::CREATED, Json(project)))
}

/// 프로젝트 상세.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    security(("bearer_auth" = [])),
    params(("project_id" = uuid::Uuid, Path, description = "프로젝트 ID")),
    responses(
        (status = 200, description = "프로젝트 상세", body = ProjectDetailResponse),
        (status = 403, description = "멤버가 아님", body = ApiErrorResponse),
        (status = 404, description = "프로젝트 없음", body = ApiErrorResponse)
    )
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
) -> ApiResult<Json<ProjectDetailResponse>> {
    let pool = state.pool()?;

    let project = ProjectRepository::find(pool, access.project_id)
        .await?
        .ok_or(ApiError::NotFound("프로젝트"))?;

    Ok(Json(ProjectDetailResponse {
        project,
        role: access.role,
    }))
}

/// 프로젝트 수정.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    security(("bearer_auth" = [])),
    params(("project_id" = uuid::Uuid, Path, description = "프로젝트 ID")),
    request_body = ProjectRequest,
    responses(
        (status = 200, description = "수정 완료", body = ProjectRecord),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 409, description = "이름 중복", body = ApiErrorResponse)
    )
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ValidatedJson(request): ValidatedJson<ProjectRequest>,
) -> ApiResult<Json<ProjectRecord>> {
    let pool = state.pool()?;

    let project = ProjectRepository::update(pool, access.project_id, request.into())
        .await
        .map_err(name_conflict)?
        .ok_or(ApiError::NotFound("프로젝트"))?;
    info!(project_id = %project.id, "프로젝트 수정");

    Ok(Json(project))
}

/// 프로젝트 삭제.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    security(("bearer_auth" = [])),
    params(("project_id" = uuid::Uuid, Path, description = "프로젝트 ID")),
    responses(
        (status = 200, description = "삭제 완료", body = MessageResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    )
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
) -> ApiResult<Json<MessageResponse>> {
    let pool = state.pool()?;

    if !ProjectRepository::delete(pool, access.project_id).await? {
        return Err(ApiError::NotFound("프로젝트"));
    }
    info!(project_id = %access.project_id, "프로젝트 삭제");

    Ok(Json(MessageResponse::new("프로젝트가 삭제되었습니다")))
}

// ==================== 라우터 ====================

/// 프로젝트 라우터 (멤버 관리 포함).
pub fn projects_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = |route| {
        middleware::from_fn_with_state(RouteGuard::new(state.clone(), route), require_project_role)
    };

    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{project_id}",
            get(get_project)
                .route_layer(gate(RouteId::ProjectRead))
                .merge(axum::routing::put(update_project).route_layer(gate(RouteId::ProjectUpdate)))
                .merge(
                    axum::routing::delete(delete_project).route_layer(gate(RouteId::ProjectDelete)),
                ),
        )
        .merge(members_router(state.clone()))
}
