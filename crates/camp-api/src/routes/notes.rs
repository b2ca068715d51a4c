//! 프로젝트 노트 API.
//!
//! 조회는 모든 멤버, 작성/수정/삭제는 admin만 가능합니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_project_role, AuthUser, ProjectAccess, RouteGuard, RouteId};
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{NoteRecord, NoteRepository};
use crate::routes::{ApiPath, MessageResponse};
use crate::state::AppState;
use crate::validation::{validate_not_blank, ValidatedJson};

/// 노트 작성/수정 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NoteRequest {
    #[validate(
        length(min = 1, max = 5000, message = "노트 내용은 1-5000자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub content: String,
}

/// 노트 목록 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct NoteListResponse {
    pub notes: Vec<NoteRecord>,
    pub total: usize,
}

/// 노트 목록.
#[utoipa::path(
    get,
    path = "/api/v1/notes/{project_id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    responses(
        (status = 200, description = "노트 목록", body = NoteListResponse),
        (status = 403, description = "멤버가 아님", body = ApiErrorResponse),
        (status = 404, description = "프로젝트 없음", body = ApiErrorResponse)
    )
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
) -> ApiResult<Json<NoteListResponse>> {
    let pool = state.pool()?;

    let notes = NoteRepository::list(pool, access.project_id).await?;
    let total = notes.len();

    Ok(Json(NoteListResponse { notes, total }))
}

/// 노트 작성.
#[utoipa::path(
    post,
    path = "/api/v1/notes/{project_id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    request_body = NoteRequest,
    responses(
        (status = 201, description = "작성 완료", body = NoteRecord),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    AuthUser(identity): AuthUser,
    ValidatedJson(request): ValidatedJson<NoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteRecord>)> {
    let pool = state.pool()?;

    let note =
        NoteRepository::create(pool, access.project_id, identity.user_id, &request.content).await?;
    info!(project_id = %access.project_id, note_id = %note.id, "노트 작성");

    Ok((StatusCode::CREATED, Json(note)))
}

/// 노트 상세.
#[utoipa::path(
    get,
    path = "/api/v1/notes/{project_id}/n/{note_id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("note_id" = Uuid, Path, description = "노트 ID")
    ),
    responses(
        (status = 200, description = "노트 상세", body = NoteRecord),
        (status = 404, description = "노트 없음", body = ApiErrorResponse)
    )
)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<NoteRecord>> {
    let (_, note_id) = ids;
    let pool = state.pool()?;

    let note = NoteRepository::find(pool, access.project_id, note_id)
        .await?
        .ok_or(ApiError::NotFound("노트"))?;

    Ok(Json(note))
}

/// 노트 수정.
#[utoipa::path(
    put,
    path = "/api/v1/notes/{project_id}/n/{note_id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("note_id" = Uuid, Path, description = "노트 ID")
    ),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "수정 완료", body = NoteRecord),
        (status = 404, description = "노트 없음", body = ApiErrorResponse)
    )
)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<NoteRequest>,
) -> ApiResult<Json<NoteRecord>> {
    let (_, note_id) = ids;
    let pool = state.pool()?;

    let note = NoteRepository::update(pool, access.project_id, note_id, &request.content)
        .await?
        .ok_or(ApiError::NotFound("노트"))?;

    Ok(Json(note))
}

/// 노트 삭제.
#[utoipa::path(
    delete,
    path = "/api/v1/notes/{project_id}/n/{note_id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("note_id" = Uuid, Path, description = "노트 ID")
    ),
    responses(
        (status = 200, description = "삭제 완료", body = MessageResponse),
        (status = 404, description = "노트 없음", body = ApiErrorResponse)
    )
)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, note_id) = ids;
    let pool = state.pool()?;

    if !NoteRepository::delete(pool, access.project_id, note_id).await? {
        return Err(ApiError::NotFound("노트"));
    }
    info!(project_id = %access.project_id, %note_id, "노트 삭제");

    Ok(Json(MessageResponse::new("노트가 삭제되었습니다")))
}

/// 노트 라우터.
pub fn notes_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = |route| {
        middleware::from_fn_with_state(RouteGuard::new(state.clone(), route), require_project_role)
    };

    Router::new()
        .route(
            "/{project_id}",
            get(list_notes)
                .route_layer(gate(RouteId::NoteList))
                .merge(post(create_note).route_layer(gate(RouteId::NoteCreate))),
        )
        .route(
            "/{project_id}/n/{note_id}",
            get(get_note)
                .route_layer(gate(RouteId::NoteRead))
                .merge(put(update_note).route_layer(gate(RouteId::NoteUpdate)))
                .merge(delete(delete_note).route_layer(gate(RouteId::NoteDelete))),
        )
}
