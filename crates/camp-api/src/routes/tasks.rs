//! 작업/하위 작업 API.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/tasks/{project_id}` - 작업 목록
//! - `POST /api/v1/tasks/{project_id}` - 작업 생성 (admin, project_admin)
//! - `GET /api/v1/tasks/{project_id}/t/{task_id}` - 작업 상세 (하위 작업 포함)
//! - `PUT /api/v1/tasks/{project_id}/t/{task_id}` - 작업 수정 (admin, project_admin)
//! - `DELETE /api/v1/tasks/{project_id}/t/{task_id}` - 작업 삭제 (admin, project_admin)
//! - `POST /api/v1/tasks/{project_id}/t/{task_id}/subtasks` - 하위 작업 생성 (admin, project_admin)
//! - `PUT /api/v1/tasks/{project_id}/st/{subtask_id}` - 하위 작업 수정 (모든 멤버)
//! - `DELETE /api/v1/tasks/{project_id}/st/{subtask_id}` - 하위 작업 삭제 (admin, project_admin)

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use camp_core::{ProjectRole, TaskStatus};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_project_role, AuthUser, ProjectAccess, RouteGuard, RouteId};
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{
    MemberRepository, NewTask, SubtaskChanges, SubtaskRecord, TaskChanges, TaskRecord,
    TaskRepository, TaskWithCounts,
};
use crate::routes::{ApiPath, MessageResponse};
use crate::state::AppState;
use crate::validation::{validate_body, validate_not_blank, ParsedJson, ValidatedJson};

// ==================== 요청/응답 타입 ====================

/// 작업 생성 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(
        length(min = 1, max = 200, message = "제목은 1-200자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "설명은 2000자를 넘을 수 없습니다"))]
    pub description: Option<String>,
    /// 담당자 (프로젝트 멤버여야 함)
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub status: TaskStatus,
}

/// 작업 수정 요청 (전달된 필드만 변경).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 200, message = "제목은 1-200자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "설명은 2000자를 넘을 수 없습니다"))]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    /// 담당자 해제 (`assigned_to`와 함께 보낼 수 없음)
    #[serde(default)]
    pub unassign: bool,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl UpdateTaskRequest {
    fn into_changes(self) -> ApiResult<TaskChanges> {
        if self.unassign && self.assigned_to.is_some() {
            return Err(ApiError::BadRequest(
                "assigned_to와 unassign은 함께 사용할 수 없습니다".to_string(),
            ));
        }

        Ok(TaskChanges {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            assigned_to: self.assigned_to,
            unassign: self.unassign,
            status: self.status,
        })
    }
}

/// 하위 작업 생성 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubtaskRequest {
    #[validate(
        length(min = 1, max = 200, message = "제목은 1-200자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
}

/// 하위 작업 수정 요청.
///
/// 일반 멤버는 완료 여부만 변경할 수 있습니다.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSubtaskRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 200, message = "제목은 1-200자여야 합니다"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

/// 일반 멤버는 하위 작업 제목을 바꿀 수 없습니다.
fn check_subtask_edit(role: ProjectRole, request: &UpdateSubtaskRequest) -> ApiResult<()> {
    if request.title.is_some() && role == ProjectRole::Member {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// 작업 목록 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskWithCounts>,
    pub total: usize,
}

/// 작업 상세 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDetailResponse {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub subtasks: Vec<SubtaskRecord>,
}

async fn ensure_assignable(
    pool: &PgPool,
    project_id: Uuid,
    assignee: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if !MemberRepository::is_member(pool, project_id, user_id).await? {
            return Err(ApiError::BadRequest(
                "담당자는 프로젝트 멤버여야 합니다".to_string(),
            ));
        }
    }
    Ok(())
}

// ==================== 작업 핸들러 ====================

/// 작업 목록.
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{project_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    responses(
        (status = 200, description = "작업 목록", body = TaskListResponse),
        (status = 403, description = "멤버가 아님", body = ApiErrorResponse),
        (status = 404, description = "프로젝트 없음", body = ApiErrorResponse)
    )
)]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
) -> ApiResult<Json<TaskListResponse>> {
    let pool = state.pool()?;

    let tasks = TaskRepository::list(pool, access.project_id).await?;
    let total = tasks.len();

    Ok(Json(TaskListResponse { tasks, total }))
}

/// 작업 생성.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{project_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("project_id" = Uuid, Path, description = "프로젝트 ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "생성 완료", body = TaskRecord),
        (status = 400, description = "담당자가 멤버가 아님", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    AuthUser(identity): AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskRecord>)> {
    let pool = state.pool()?;
    ensure_assignable(pool, access.project_id, request.assigned_to).await?;

    let task = TaskRepository::create(
        pool,
        access.project_id,
        identity.user_id,
        NewTask {
            title: request.title.trim().to_string(),
            description: request.description,
            assigned_to: request.assigned_to,
            status: request.status,
        },
    )
    .await?;
    info!(project_id = %access.project_id, task_id = %task.id, "작업 생성");

    Ok((StatusCode::CREATED, Json(task)))
}

/// 작업 상세.
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{project_id}/t/{task_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("task_id" = Uuid, Path, description = "작업 ID")
    ),
    responses(
        (status = 200, description = "작업 상세", body = TaskDetailResponse),
        (status = 404, description = "작업 없음", body = ApiErrorResponse)
    )
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<TaskDetailResponse>> {
    let (_, task_id) = ids;
    let pool = state.pool()?;

    let task = TaskRepository::find(pool, access.project_id, task_id)
        .await?
        .ok_or(ApiError::NotFound("작업"))?;
    let subtasks = TaskRepository::list_subtasks(pool, task.id).await?;

    Ok(Json(TaskDetailResponse { task, subtasks }))
}

/// 작업 수정.
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{project_id}/t/{task_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("task_id" = Uuid, Path, description = "작업 ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "수정 완료", body = TaskRecord),
        (status = 400, description = "담당자 지정 오류", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "작업 없음", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskRecord>> {
    let (_, task_id) = ids;
    let changes = request.into_changes()?;
    let pool = state.pool()?;
    ensure_assignable(pool, access.project_id, changes.assigned_to).await?;

    let task = TaskRepository::update(pool, access.project_id, task_id, changes)
        .await?
        .ok_or(ApiError::NotFound("작업"))?;
    info!(project_id = %access.project_id, %task_id, status = %task.status, "작업 수정");

    Ok(Json(task))
}

/// 작업 삭제.
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{project_id}/t/{task_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("task_id" = Uuid, Path, description = "작업 ID")
    ),
    responses(
        (status = 200, description = "삭제 완료", body = MessageResponse),
        (status = 404, description = "작업 없음", body = ApiErrorResponse)
    )
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, task_id) = ids;
    let pool = state.pool()?;

    if !TaskRepository::delete(pool, access.project_id, task_id).await? {
        return Err(ApiError::NotFound("작업"));
    }
    info!(project_id = %access.project_id, %task_id, "작업 삭제");

    Ok(Json(MessageResponse::new("작업이 삭제되었습니다")))
}

// ==================== 하위 작업 핸들러 ====================

/// 하위 작업 생성.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{project_id}/t/{task_id}/subtasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("task_id" = Uuid, Path, description = "작업 ID")
    ),
    request_body = CreateSubtaskRequest,
    responses(
        (status = 201, description = "생성 완료", body = SubtaskRecord),
        (status = 404, description = "작업 없음", body = ApiErrorResponse)
    )
)]
pub async fn create_subtask(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    AuthUser(identity): AuthUser,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<CreateSubtaskRequest>,
) -> ApiResult<(StatusCode, Json<SubtaskRecord>)> {
    let (_, task_id) = ids;
    let pool = state.pool()?;

    let subtask = TaskRepository::create_subtask(
        pool,
        access.project_id,
        task_id,
        identity.user_id,
        request.title.trim(),
    )
    .await?
    .ok_or(ApiError::NotFound("작업"))?;
    info!(project_id = %access.project_id, %task_id, subtask_id = %subtask.id, "하위 작업 생성");

    Ok((StatusCode::CREATED, Json(subtask)))
}

/// 하위 작업 수정.
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{project_id}/st/{subtask_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("subtask_id" = Uuid, Path, description = "하위 작업 ID")
    ),
    request_body = UpdateSubtaskRequest,
    responses(
        (status = 200, description = "수정 완료", body = SubtaskRecord),
        (status = 403, description = "멤버는 제목을 변경할 수 없음", body = ApiErrorResponse),
        (status = 404, description = "하위 작업 없음", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn update_subtask(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
    ParsedJson(request): ParsedJson<UpdateSubtaskRequest>,
) -> ApiResult<Json<SubtaskRecord>> {
    let (_, subtask_id) = ids;
    // 역할 검사가 본문 검증보다 먼저
    check_subtask_edit(access.role, &request)?;
    let request = validate_body(request)?;
    let pool = state.pool()?;

    let changes = SubtaskChanges {
        title: request.title.map(|t| t.trim().to_string()),
        is_completed: request.is_completed,
    };
    let subtask = TaskRepository::update_subtask(pool, access.project_id, subtask_id, changes)
        .await?
        .ok_or(ApiError::NotFound("하위 작업"))?;

    Ok(Json(subtask))
}

/// 하위 작업 삭제.
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{project_id}/st/{subtask_id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = Uuid, Path, description = "프로젝트 ID"),
        ("subtask_id" = Uuid, Path, description = "하위 작업 ID")
    ),
    responses(
        (status = 200, description = "삭제 완료", body = MessageResponse),
        (status = 404, description = "하위 작업 없음", body = ApiErrorResponse)
    )
)]
pub async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    access: ProjectAccess,
    ApiPath(ids): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, subtask_id) = ids;
    let pool = state.pool()?;

    if !TaskRepository::delete_subtask(pool, access.project_id, subtask_id).await? {
        return Err(ApiError::NotFound("하위 작업"));
    }
    info!(project_id = %access.project_id, %subtask_id, "하위 작업 삭제");

    Ok(Json(MessageResponse::new("하위 작업이 삭제되었습니다")))
}

// ==================== 라우터 ====================

/// 작업 라우터.
pub fn tasks_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = |route| {
        middleware::from_fn_with_state(RouteGuard::new(state.clone(), route), require_project_role)
    };

    Router::new()
        .route(
            "/{project_id}",
            get(list_tasks)
                .route_layer(gate(RouteId::TaskList))
                .merge(post(create_task).route_layer(gate(RouteId::TaskCreate))),
        )
        .route(
            "/{project_id}/t/{task_id}",
            get(get_task)
                .route_layer(gate(RouteId::TaskRead))
                .merge(put(update_task).route_layer(gate(RouteId::TaskUpdate)))
                .merge(delete(delete_task).route_layer(gate(RouteId::TaskDelete))),
        )
        .route(
            "/{project_id}/t/{task_id}/subtasks",
            post(create_subtask).route_layer(gate(RouteId::SubtaskCreate)),
        )
        .route(
            "/{project_id}/st/{subtask_id}",
            put(update_subtask)
                .route_layer(gate(RouteId::SubtaskUpdate))
                .merge(delete(delete_subtask).route_layer(gate(RouteId::SubtaskDelete))),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask_edit(title: Option<&str>, is_completed: Option<bool>) -> UpdateSubtaskRequest {
        UpdateSubtaskRequest {
            title: title.map(str::to_string),
            is_completed,
        }
    }

    #[test]
    fn test_member_cannot_retitle_subtask() {
        let blank_title = subtask_edit(Some("   "), None);
        assert!(matches!(
            check_subtask_edit(ProjectRole::Member, &blank_title),
            Err(ApiError::Forbidden)
        ));

        let toggle = subtask_edit(None, Some(true));
        assert!(check_subtask_edit(ProjectRole::Member, &toggle).is_ok());
    }

    #[test]
    fn test_admins_retitle_subtask() {
        let retitle = subtask_edit(Some("새 제목"), None);
        assert!(check_subtask_edit(ProjectRole::Admin, &retitle).is_ok());
        assert!(check_subtask_edit(ProjectRole::ProjectAdmin, &retitle).is_ok());
    }

    #[test]
    fn test_update_task_unassign() {
        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"unassign": true, "status": "done"}"#).unwrap();
        let changes = request.into_changes().unwrap();
        assert!(changes.unassign);
        assert_eq!(changes.assigned_to, None);
        assert_eq!(changes.status, Some(TaskStatus::Done));

        let omitted: UpdateTaskRequest = serde_json::from_str(r#"{"title": " 제목 "}"#).unwrap();
        let changes = omitted.into_changes().unwrap();
        assert!(!changes.unassign);
        assert_eq!(changes.title.as_deref(), Some("제목"));
    }

    #[test]
    fn test_update_task_rejects_assign_and_unassign() {
        let body = format!(r#"{{"assigned_to": "{}", "unassign": true}}"#, Uuid::new_v4());
        let request: UpdateTaskRequest = serde_json::from_str(&body).unwrap();
        assert!(matches!(request.into_changes(), Err(ApiError::BadRequest(_))));
    }
}
