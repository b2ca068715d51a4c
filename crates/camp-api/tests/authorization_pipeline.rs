//! 인증 → 인가 → 검증 → 핸들러 파이프라인 통합 테스트
//!
//! DB 없이 인메모리 멤버십 저장소로 전체 라우터를 구성합니다.
//! 핸들러까지 도달한 요청은 DB 풀이 없으므로 500을 반환합니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    middleware,
    routing::post,
    Router,
};
use camp_api::auth::{
    create_token, decide, require_project_role, Claims, JwtKeys, PermissionGate, PolicyTable,
    ProjectAccess, RouteGuard, RouteId,
};
use camp_api::repository::InMemoryMembershipStore;
use camp_api::validation::ValidatedJson;
use camp_api::{build_router, ApiErrorResponse, AppState};
use camp_core::{Identity, ProjectRole, RoleSet};
use proptest::prelude::*;
use secrecy::SecretString;
use serde::Deserialize;
use tower::ServiceExt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const SECRET: &str = "pipeline-test-secret-with-enough-bytes";

struct Fixture {
    state: Arc<AppState>,
    store: Arc<InMemoryMembershipStore>,
    project: Uuid,
    admin: Uuid,
    member: Uuid,
    outsider: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(InMemoryMembershipStore::new());
        let (project, admin, member, outsider) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.add(admin, project, ProjectRole::Admin).await;
        store.add(member, project, ProjectRole::Member).await;

        let keys = Arc::new(JwtKeys::from_secret(&SecretString::new(SECRET.to_string().into())));
        let state = Arc::new(AppState::new(keys, store.clone(), PolicyTable::standard().unwrap()));

        Self {
            state,
            store,
            project,
            admin,
            member,
            outsider,
        }
    }

    fn token(&self, user_id: Uuid, minutes: i64) -> String {
        create_token(&Claims::new(user_id, "pipeline", minutes), &self.state.keys).unwrap()
    }

    fn bearer(&self, user_id: Uuid) -> String {
        format!("Bearer {}", self.token(user_id, 5))
    }

    fn app(&self) -> Router {
        build_router(self.state.clone())
    }
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn error_body(bytes: &[u8]) -> ApiErrorResponse {
    serde_json::from_slice(bytes).unwrap()
}

// ==================== 인증 ====================

#[tokio::test]
async fn test_invalid_and_expired_tokens_are_indistinguishable() {
    let fx = Fixture::new().await;
    let uri = format!("/api/v1/projects/{}", fx.project);

    let expired = format!("Bearer {}", fx.token(fx.admin, -10));
    let forged = {
        let secret = SecretString::new("another-secret-entirely-different".to_string().into());
        let other = JwtKeys::from_secret(&secret);
        let token = create_token(&Claims::new(fx.admin, "pipeline", 5), &other).unwrap();
        format!("Bearer {}", token)
    };

    let headers = [
        None,
        Some("Bearer not.a.jwt"),
        Some("Basic abc"),
        Some(expired.as_str()),
        Some(forged.as_str()),
    ];

    let mut bodies = Vec::new();
    for auth in headers {
        let (status, bytes) = send(fx.app(), Method::GET, &uri, auth, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "auth header: {:?}", auth);
        bodies.push(error_body(&bytes));
    }

    for body in &bodies {
        assert_eq!(body.code, "UNAUTHENTICATED");
        assert_eq!(body.message, bodies[0].message);
        assert!(body.details.is_none());
    }
}

#[tokio::test]
async fn test_unauthenticated_wins_over_bad_path() {
    let fx = Fixture::new().await;
    let uri = "/api/v1/projects/not-a-uuid";
    let (status, _) = send(fx.app(), Method::GET, uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = fx.bearer(fx.admin);
    let (status, _) = send(fx.app(), Method::GET, uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== 인가 ====================

#[tokio::test]
async fn test_member_forbidden_on_admin_route() {
    let fx = Fixture::new().await;
    let member = fx.bearer(fx.member);

    let (status, bytes) = send(
        fx.app(),
        Method::POST,
        &format!("/api/v1/notes/{}", fx.project),
        Some(&member),
        Some(r#"{"content": "회의록"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_body(&bytes).code, "FORBIDDEN");
}

#[tokio::test]
async fn test_forbidden_does_not_reveal_reason() {
    let fx = Fixture::new().await;
    let uri = format!("/api/v1/notes/{}", fx.project);
    let payload = Some(r#"{"content": "x"}"#);

    let (outsider, member) = (fx.bearer(fx.outsider), fx.bearer(fx.member));

    let (_, not_member) = send(fx.app(), Method::POST, &uri, Some(&outsider), payload).await;
    let (_, low_role) = send(fx.app(), Method::POST, &uri, Some(&member), payload).await;

    let (not_member, low_role) = (error_body(&not_member), error_body(&low_role));
    assert_eq!(not_member.code, low_role.code);
    assert_eq!(not_member.message, low_role.message);
}

#[tokio::test]
async fn test_non_member_existence_policy() {
    let fx = Fixture::new().await;
    let outsider = fx.bearer(fx.outsider);
    let missing = Uuid::new_v4();

    let missing_uri = format!("/api/v1/projects/{}", missing);
    let existing_uri = format!("/api/v1/projects/{}", fx.project);

    // 조회 라우트: 없는 프로젝트는 404, 있는 프로젝트는 403
    let (status, _) = send(fx.app(), Method::GET, &missing_uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(fx.app(), Method::GET, &existing_uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 변경 라우트: 존재 여부와 무관하게 403
    let (status, _) = send(fx.app(), Method::DELETE, &missing_uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_change_takes_effect_on_next_request() {
    let fx = Fixture::new().await;
    let member = fx.bearer(fx.member);
    let uri = format!("/api/v1/notes/{}", fx.project);
    let payload = Some(r#"{"content": "역할 변경 후"}"#);

    let (status, _) = send(fx.app(), Method::POST, &uri, Some(&member), payload).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    fx.store.set_role(fx.member, fx.project, ProjectRole::Admin).await;

    // 같은 토큰이어도 다음 요청부터 새 역할이 적용됨 (핸들러 도달 → DB 없음 500)
    let (status, _) = send(fx.app(), Method::POST, &uri, Some(&member), payload).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    fx.store.remove(fx.member, fx.project).await;
    let (status, _) = send(fx.app(), Method::GET, &uri, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ==================== 검증 ====================

#[tokio::test]
async fn test_admin_with_invalid_payload_gets_422() {
    let fx = Fixture::new().await;
    let admin = fx.bearer(fx.admin);
    let uri = format!("/api/v1/notes/{}", fx.project);

    let blank = Some(r#"{"content": "   "}"#);
    let (status, bytes) = send(fx.app(), Method::POST, &uri, Some(&admin), blank).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = error_body(&bytes);
    assert_eq!(body.code, "VALIDATION_FAILED");
    assert!(body.details.unwrap().to_string().contains("content"));

    let (status, _) = send(fx.app(), Method::POST, &uri, Some(&admin), Some("{}")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_with_valid_payload_reaches_handler() {
    let fx = Fixture::new().await;
    let admin = fx.bearer(fx.admin);

    let (status, bytes) = send(
        fx.app(),
        Method::POST,
        &format!("/api/v1/notes/{}", fx.project),
        Some(&admin),
        Some(r#"{"content": "스프린트 계획"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(&bytes).code, "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_member_subtask_title_forbidden_before_validation() {
    let fx = Fixture::new().await;
    let uri = format!("/api/v1/tasks/{}/st/{}", fx.project, Uuid::new_v4());
    let (member, admin) = (fx.bearer(fx.member), fx.bearer(fx.admin));
    let blank_title = Some(r#"{"title": "   "}"#);

    // 멤버의 제목 변경은 본문이 유효하지 않아도 403
    let (status, bytes) = send(fx.app(), Method::PUT, &uri, Some(&member), blank_title).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_body(&bytes).code, "FORBIDDEN");

    let retitle = Some(r#"{"title": "새 제목"}"#);
    let (status, _) = send(fx.app(), Method::PUT, &uri, Some(&member), retitle).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 완료 처리는 멤버도 핸들러까지 도달 (DB 없음 → 500)
    let toggle = Some(r#"{"is_completed": true}"#);
    let (status, _) = send(fx.app(), Method::PUT, &uri, Some(&member), toggle).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // admin의 빈 제목은 검증 실패
    let (status, bytes) = send(fx.app(), Method::PUT, &uri, Some(&admin), blank_title).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(&bytes).code, "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_task_assign_and_unassign_together_is_bad_request() {
    let fx = Fixture::new().await;
    let admin = fx.bearer(fx.admin);
    let uri = format!("/api/v1/tasks/{}/t/{}", fx.project, Uuid::new_v4());
    let body = format!(r#"{{"assigned_to": "{}", "unassign": true}}"#, fx.member);
    let both = Some(body.as_str());

    let (status, bytes) = send(fx.app(), Method::PUT, &uri, Some(&admin), both).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(&bytes).code, "BAD_REQUEST");

    let (status, _) =
        send(fx.app(), Method::PUT, &uri, Some(&admin), Some(r#"{"unassign": true}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ==================== 단계 순서 ====================

static VALIDATOR_CALLS: AtomicUsize = AtomicUsize::new(0);
static HANDLER_CALLS: AtomicUsize = AtomicUsize::new(0);

fn counting_label(label: &str) -> Result<(), ValidationError> {
    VALIDATOR_CALLS.fetch_add(1, Ordering::SeqCst);
    if label.is_empty() {
        return Err(ValidationError::new("empty"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
struct Labeled {
    #[validate(custom(function = "counting_label"))]
    label: String,
}

async fn echo_label(access: ProjectAccess, ValidatedJson(body): ValidatedJson<Labeled>) -> String {
    HANDLER_CALLS.fetch_add(1, Ordering::SeqCst);
    format!("{}:{}", access.role, body.label)
}

#[tokio::test]
async fn test_stages_run_in_order_and_stop_at_first_failure() {
    let fx = Fixture::new().await;
    let app = Router::new()
        .route(
            "/labels/{project_id}",
            post(echo_label).route_layer(middleware::from_fn_with_state(
                RouteGuard::new(fx.state.clone(), RouteId::NoteCreate),
                require_project_role,
            )),
        )
        .with_state(fx.state.clone());
    let uri = format!("/labels/{}", fx.project);
    let counts = || {
        (
            VALIDATOR_CALLS.load(Ordering::SeqCst),
            HANDLER_CALLS.load(Ordering::SeqCst),
        )
    };
    let (valid, empty) = (Some(r#"{"label": "a"}"#), Some(r#"{"label": ""}"#));

    // 인증 실패: 검증기와 핸들러 모두 실행되지 않음
    let (status, _) = send(app.clone(), Method::POST, &uri, None, valid).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(counts(), (0, 0));

    // 인가 실패
    let member = fx.bearer(fx.member);
    let (status, _) = send(app.clone(), Method::POST, &uri, Some(&member), valid).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(counts(), (0, 0));

    // 검증 실패: 검증기는 한 번, 핸들러는 실행되지 않음
    let admin = fx.bearer(fx.admin);
    let (status, _) = send(app.clone(), Method::POST, &uri, Some(&admin), empty).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(counts(), (1, 0));

    // 통과: 핸들러는 정확히 한 번
    let (status, bytes) = send(app, Method::POST, &uri, Some(&admin), valid).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), "admin:a");
    assert_eq!(counts(), (2, 1));
}

// ==================== 결정 속성 ====================

fn role_strategy() -> impl Strategy<Value = ProjectRole> {
    prop::sample::select(ProjectRole::ALL.to_vec())
}

fn role_set_strategy() -> impl Strategy<Value = RoleSet> {
    prop::collection::vec(role_strategy(), 0..=3).prop_map(|roles| RoleSet::of(&roles))
}

proptest! {
    #[test]
    fn prop_decide_allows_iff_role_in_set(
        role in prop::option::of(role_strategy()),
        allowed in role_set_strategy(),
    ) {
        let decision = decide(role, allowed);
        let expected = matches!(role, Some(r) if allowed.contains(r));
        prop_assert_eq!(decision.is_allowed(), expected);
        prop_assert_eq!(decision, decide(role, allowed));
    }

    #[test]
    fn prop_gate_is_deterministic(
        role in prop::option::of(role_strategy()),
        allowed in role_set_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryMembershipStore::new());
            let (user, project) = (Uuid::new_v4(), Uuid::new_v4());
            match role {
                Some(role) => {
                    store.add(user, project, role).await;
                }
                None => store.add_project(project).await,
            }

            let gate = PermissionGate::new(store);
            let identity = Identity::new(user, "prop");
            let first = gate.authorize(&identity, project, allowed).await.unwrap();
            let second = gate.authorize(&identity, project, allowed).await.unwrap();

            assert_eq!(first, second);
            assert_eq!(first, decide(role, allowed));
        });
    }
}
