//! OpenAPI 문서화 설정.
//!
//! utoipa로 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use camp_core::{ProjectRole, TaskStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TokenPair;
use crate::error::{ApiErrorResponse, FieldError};
use crate::repository::{
    MemberRecord, NoteRecord, ProjectRecord, ProjectSummary, SubtaskRecord, TaskRecord,
    TaskWithCounts, UserProfile,
};
use crate::routes::{
    auth::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest,
    },
    members::{AddMemberRequest, MemberListResponse, UpdateMemberRoleRequest},
    notes::{NoteListResponse, NoteRequest},
    projects::{ProjectDetailResponse, ProjectListResponse, ProjectRequest},
    tasks::{
        CreateSubtaskRequest, CreateTaskRequest, TaskDetailResponse, TaskListResponse,
        UpdateSubtaskRequest, UpdateTaskRequest,
    },
    ComponentStatus, HealthResponse, MessageResponse,
};

/// Bearer 인증 스킴 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// ProjectCamp API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ProjectCamp API",
        description = r#"
# ProjectCamp 프로젝트 관리 REST API

프로젝트, 멤버, 작업, 하위 작업, 노트를 관리합니다.

## 인증

`/auth/register`, `/auth/login`, `/auth/refresh-token`, `/healthcheck`를 제외한
모든 엔드포인트는 `Authorization: Bearer <token>` 헤더가 필요합니다.

## 역할

프로젝트마다 `admin`, `project_admin`, `member` 중 하나의 역할을 가집니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "헬스 체크"),
        (name = "auth", description = "인증 - 가입, 로그인, 토큰"),
        (name = "projects", description = "프로젝트 CRUD"),
        (name = "members", description = "프로젝트 멤버 및 역할"),
        (name = "tasks", description = "작업 및 하위 작업"),
        (name = "notes", description = "프로젝트 노트")
    ),
    components(
        schemas(
            // ===== Common =====
            ApiErrorResponse,
            FieldError,
            MessageResponse,
            ProjectRole,
            TaskStatus,

            // ===== Health =====
            HealthResponse,
            ComponentStatus,

            // ===== Auth =====
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            ChangePasswordRequest,
            TokenPair,
            UserProfile,

            // ===== Projects =====
            ProjectRequest,
            ProjectRecord,
            ProjectSummary,
            ProjectListResponse,
            ProjectDetailResponse,
            AddMemberRequest,
            UpdateMemberRoleRequest,
            MemberRecord,
            MemberListResponse,

            // ===== Tasks =====
            CreateTaskRequest,
            UpdateTaskRequest,
            CreateSubtaskRequest,
            UpdateSubtaskRequest,
            TaskRecord,
            TaskWithCounts,
            SubtaskRecord,
            TaskListResponse,
            TaskDetailResponse,

            // ===== Notes =====
            NoteRequest,
            NoteRecord,
            NoteListResponse,
        )
    ),
    paths(
        crate::routes::health::health_check,

        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh_token,
        crate::routes::auth::logout,
        crate::routes::auth::current_user,
        crate::routes::auth::change_password,

        crate::routes::projects::list_projects,
        crate::routes::projects::create_project,
        crate::routes::projects::get_project,
        crate::routes::projects::update_project,
        crate::routes::projects::delete_project,

        crate::routes::members::list_members,
        crate::routes::members::add_member,
        crate::routes::members::update_member_role,
        crate::routes::members::remove_member,

        crate::routes::tasks::list_tasks,
        crate::routes::tasks::create_task,
        crate::routes::tasks::get_task,
        crate::routes::tasks::update_task,
        crate::routes::tasks::delete_task,
        crate::routes::tasks::create_subtask,
        crate::routes::tasks::update_subtask,
        crate::routes::tasks::delete_subtask,

        crate::routes::notes::list_notes,
        crate::routes::notes::create_note,
        crate::routes::notes::get_note,
        crate::routes::notes::update_note,
        crate::routes::notes::delete_note,
    )
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
