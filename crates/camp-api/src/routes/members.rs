//! 프로젝트 멤버 API.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/projects/{project_id}/members` - 멤버 목록
//! - `POST /api/v1/projects/{project_id}/members` - 멤버 추가 (admin)
//! - `PUT /api/v1/projects/{project_id}/members/{user_id}` - 역할 변경 (admin)
//! - `DELETE /api/v1/projects/{project_id}/members/{user_id}` - 멤버 제거 (admin)
//!
//! 프로젝트에는 항상 admin이 최소 1명 남아 있어야 합니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use camp_core::ProjectRole;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_project_role, ProjectAccess, RouteGuard, RouteId};
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{MemberChange, MemberRecord, MemberRepository, UserRepository};
use crate::routes::{ApiPath, MessageResponse};
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ==================== 요청/응답 타입 ====================

/// 멤버 추가 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberRequest {
    /// 추가할 사용자 이메일
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: String,
    /// 역할 (기본: member)
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

/// 역할 변경 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRoleRequest {
    pub role: ProjectRole,
}

/// 멤버 목록 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberListResponse {
    pub members: Vec<MemberRecord>,
    pub total: usize,
}

fn member_change(change: MemberChange) -> ApiResult<()> {
    match change {
        MemberChange::Applied => Ok(()),
        MemberChange::NotAMember => Err(ApiError::NotFound("멤버")),
        MemberChange::LastAdmin => Err(ApiError::Conflict(
            "프로젝트에는 최소 1명의 admin이 필요합니다".to_string(),
        )),
    }
}

// ==================== 핸들러 ====================

/// 멤버 목록.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    responses(
        (status = 200, description = "멤버 목록", body = MemberListResponse),
        (status = 403, description = "멤버가 아님", body = ApiErrorResponse),
        (status = 404, description = "프로젝트 없음", body = ApiErrorResponse)
    )
)]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
) -> ApiResult<Json<MemberListResponse>> {
    let pool = state.pool()?;

    let members = MemberRepository::list(pool, access.project_id).await?;
    let total = members.len();

    Ok(Json(MemberListResponse { members, total }))
}

/// 멤버 추가.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project_id}/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "추가 완료", body = MemberRecord),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse),
        (status = 409, description = "이미 멤버", body = ApiErrorResponse)
    )
)]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ValidatedJson(request): ValidatedJson<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberRecord>)> {
    let pool = state.pool()?;

    let user = UserRepository::find_by_email(pool, &request.email.to_lowercase())
        .await?
        .ok_or(ApiError::NotFound("사용자"))?;

    if !MemberRepository::add(pool, access.project_id, user.id, request.role).await? {
        return Err(ApiError::Conflict("이미 프로젝트 멤버입니다".to_string()));
    }
    info!(project_id = %access.project_id, user_id = %user.id, role = %request.role, "멤버 추가");

    let member = MemberRepository::find(pool, access.project_id, user.id)
        .await?
        .ok_or(ApiError::NotFound("멤버"))?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// 멤버 역할 변경.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{project_id}/members/{user_id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("user_id" = Uuid, Path, description = "사용자 ID")
    ),
    request_body = UpdateMemberRoleRequest,
    responses(
        (status = 200, description = "변경 완료", body = MemberRecord),
        (status = 404, description = "멤버 아님", body = ApiErrorResponse),
        (status = 409, description = "마지막 admin", body = ApiErrorResponse)
    )
)]
pub async fn update_member_role(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateMemberRoleRequest>,
) -> ApiResult<Json<MemberRecord>> {
    let (_, user_id) = ids;
    let pool = state.pool()?;

    member_change(
        MemberRepository::update_role(pool, access.project_id, user_id, request.role).await?,
    )?;
    info!(project_id = %access.project_id, %user_id, role = %request.role, "멤버 역할 변경");

    let member = MemberRepository::find(pool, access.project_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("멤버"))?;

    Ok(Json(member))
}

/// 멤버 제거.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{project_id}/members/{user_id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("user_id" = Uuid, Path, description = "사용자 ID")
    ),
    responses(
        (status = 200, description = "제거 완료", body = MessageResponse),
        (status = 404, description = "멤버 아님", body = ApiErrorResponse),
        (status = 409, description = "마지막 admin", body = ApiErrorResponse)
    )
)]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, user_id) = ids;
    let pool = state.pool()?;

    member_change(MemberRepository::remove(pool, access.project_id, user_id).await?)?;
    info!(project_id = %access.project_id, %user_id, "멤버 제거");

    Ok(Json(MessageResponse::new("멤버가 제거되었습니다")))
}

// ==================== 라우터 ====================

/// 멤버 라우터 (프로젝트 라우터에 병합됨).
pub fn members_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = |route| {
        middleware::from_fn_with_state(RouteGuard::new(state.clone(), route), require_project_role)
    };

    Router::new()
        .route(
            "/{project_id}/members",
            get(list_members)
                .route_layer(gate(RouteId::MemberList))
                .merge(post(add_member).route_layer(gate(RouteId::MemberAdd))),
        )
        .route(
            "/{project_id}/members/{user_id}",
            put(update_member_role)
                .route_layer(gate(RouteId::MemberUpdateRole))
                .merge(delete(remove_member).route_layer(gate(RouteId::MemberRemove))),
        )
}
