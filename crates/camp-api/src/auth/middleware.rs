//! 프로젝트 범위 라우트 인증/인가 미들웨어.
//!
//! `route_layer`로 장착되어 라우팅 이후, 핸들러 추출기보다 먼저 실행됩니다.
//!
//! 1. Bearer 토큰 검증 (실패 시 401, 경로 파라미터는 보지 않음)
//! 2. 경로의 `project_id` 파싱 (실패 시 400)
//! 3. `Existence::Reveal` 라우트는 프로젝트 존재 확인 (없으면 404)
//! 4. 권한 게이트 (거부 시 403)
//!
//! 통과하면 [`Identity`]와 [`ProjectAccess`]를 request extensions에 넣습니다.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    RequestExt,
};
use camp_core::{Identity, ProjectRole};
use metrics::counter;
use uuid::Uuid;

use super::gate::Decision;
use super::policy::{Existence, RouteId};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::RequestStage;

/// 라우트 가드 상태 (라우트마다 하나).
#[derive(Clone)]
pub struct RouteGuard {
    state: Arc<AppState>,
    route: RouteId,
}

impl RouteGuard {
    pub fn new(state: Arc<AppState>, route: RouteId) -> Self {
        Self { state, route }
    }
}

/// 게이트를 통과한 요청의 프로젝트 접근 정보.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub role: ProjectRole,
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    state
        .verifier
        .verify(authorization_header(headers))
        .map_err(|_| {
            counter!("auth_failures_total").increment(1);
            ApiError::Unauthenticated
        })
}

fn reject(route: RouteId, stage: RequestStage, reason: &'static str, error: ApiError) -> ApiError {
    let rejected = stage.advance(RequestStage::Rejected);
    tracing::debug!(route = %route, from = %stage, stage = %rejected, reason, "Request rejected");
    error
}

/// 핸들러 응답으로부터 최종 단계를 결정합니다.
///
/// 본문 검증에서 거부된 응답은 `RequestStage::Rejected` extension을 가지고 돌아옵니다.
fn finish(stage: RequestStage, response: &Response) -> RequestStage {
    match response.extensions().get::<RequestStage>() {
        Some(RequestStage::Rejected) => stage.advance(RequestStage::Rejected),
        _ => stage
            .advance(RequestStage::Validated)
            .advance(RequestStage::Handled),
    }
}

/// 프로젝트 역할 검사 미들웨어.
pub async fn require_project_role(
    State(guard): State<RouteGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = guard.route;
    let state = &guard.state;
    let stage = RequestStage::Received;

    let identity = authenticate(state, request.headers())
        .map_err(|e| reject(route, stage, "unauthenticated", e))?;
    let stage = stage.advance(RequestStage::Authenticated);

    let policy = state.policies.get(route).ok_or_else(|| {
        tracing::error!(route = %route, "No access policy declared for route");
        ApiError::internal(format!("no access policy for {}", route))
    })?;

    let Path(params) = request
        .extract_parts::<Path<HashMap<String, String>>>()
        .await
        .map_err(|_| {
            let e = ApiError::BadRequest("잘못된 경로 파라미터입니다".to_string());
            reject(route, stage, "path", e)
        })?;

    let project_id = params
        .get("project_id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            let e = ApiError::BadRequest("잘못된 프로젝트 ID입니다".to_string());
            reject(route, stage, "project_id", e)
        })?;

    if policy.existence == Existence::Reveal
        && !state.membership.project_exists(project_id).await?
    {
        let e = ApiError::NotFound("프로젝트");
        return Err(reject(route, stage, "project_missing", e));
    }

    let decision = state
        .gate
        .authorize_route(&identity, project_id, policy.allowed, route.as_str())
        .await?;

    let role = match decision {
        Decision::Allow(role) => role,
        Decision::Deny(reason) => {
            return Err(reject(route, stage, reason.as_str(), ApiError::Forbidden));
        }
    };
    let stage = stage.advance(RequestStage::Authorized);

    let user_id = identity.user_id;
    let extensions = request.extensions_mut();
    extensions.insert(identity);
    extensions.insert(ProjectAccess { project_id, role });

    let response = next.run(request).await;

    let finished = finish(stage, &response);
    tracing::debug!(
        %user_id,
        %project_id,
        route = %route,
        stage = %finished,
        status = response.status().as_u16(),
        "Request finished"
    );

    Ok(response)
}

/// 인증된 사용자 추출기.
///
/// 게이트를 거친 요청은 extensions의 [`Identity`]를 재사용하고,
/// 그 외 라우트에서는 직접 토큰을 검증합니다.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(identity.clone()));
        }

        let identity = authenticate(state, &parts.headers)?;
        parts.extensions.insert(identity.clone());
        Ok(AuthUser(identity))
    }
}

impl<S> FromRequestParts<S> for ProjectAccess
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ProjectAccess>().copied().ok_or_else(|| {
            tracing::error!(
                path = %parts.uri.path(),
                "Handler requires project access but no gate ran"
            );
            ApiError::internal("project access missing")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_token, Claims, JwtKeys, PolicyTable};
    use crate::repository::InMemoryMembershipStore;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-at-least-32-bytes";

    fn state(store: Arc<InMemoryMembershipStore>) -> Arc<AppState> {
        let keys = Arc::new(JwtKeys::from_secret(&SecretString::new(SECRET.to_string().into())));
        Arc::new(AppState::new(keys, store, PolicyTable::standard().unwrap()))
    }

    fn bearer(state: &AppState, user_id: Uuid) -> String {
        let token = create_token(&Claims::new(user_id, "tester", 5), &state.keys).unwrap();
        format!("Bearer {}", token)
    }

    async fn echo_access(access: ProjectAccess, AuthUser(identity): AuthUser) -> String {
        format!("{}:{}:{}", identity.user_id, access.project_id, access.role)
    }

    fn app(state: Arc<AppState>, route: RouteId) -> Router {
        Router::new()
            .route(
                "/p/{project_id}",
                get(echo_access).route_layer(middleware::from_fn_with_state(
                    RouteGuard::new(state.clone(), route),
                    require_project_role,
                )),
            )
            .with_state(state)
    }

    async fn send(app: Router, uri: &str, auth: Option<String>) -> Response {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_admitted_request_carries_access() {
        let store = Arc::new(InMemoryMembershipStore::new());
        let (user, project) = (Uuid::new_v4(), Uuid::new_v4());
        store.add(user, project, ProjectRole::Member).await;
        let state = state(store);

        let response = send(
            app(state.clone(), RouteId::ProjectRead),
            &format!("/p/{}", project),
            Some(bearer(&state, user)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            format!("{}:{}:member", user, project)
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_before_path_parsing() {
        let state = state(Arc::new(InMemoryMembershipStore::new()));
        let response = send(app(state, RouteId::ProjectRead), "/p/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_project_id_is_bad_request() {
        let state = state(Arc::new(InMemoryMembershipStore::new()));
        let auth = bearer(&state, Uuid::new_v4());
        let response = send(app(state, RouteId::ProjectRead), "/p/not-a-uuid", Some(auth)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_existence_reveal_vs_hide() {
        let state = state(Arc::new(InMemoryMembershipStore::new()));
        let auth = bearer(&state, Uuid::new_v4());
        let uri = format!("/p/{}", Uuid::new_v4());

        let reveal = send(app(state.clone(), RouteId::ProjectRead), &uri, Some(auth.clone())).await;
        assert_eq!(reveal.status(), StatusCode::NOT_FOUND);

        let hide = send(app(state, RouteId::ProjectUpdate), &uri, Some(auth)).await;
        assert_eq!(hide.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_insufficient_role_is_forbidden() {
        let store = Arc::new(InMemoryMembershipStore::new());
        let (user, project) = (Uuid::new_v4(), Uuid::new_v4());
        store.add(user, project, ProjectRole::ProjectAdmin).await;
        let state = state(store);

        let response = send(
            app(state.clone(), RouteId::ProjectDelete),
            &format!("/p/{}", project),
            Some(bearer(&state, user)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_finish_follows_body_rejection() {
        use axum::response::IntoResponse;

        let rejected = ApiError::Validation(Vec::new()).into_response();
        let finished = finish(RequestStage::Authorized, &rejected);
        assert_eq!(finished, RequestStage::Rejected);
        assert!(finished.is_terminal());

        let forbidden = ApiError::Forbidden.into_response();
        assert_eq!(finish(RequestStage::Authorized, &forbidden), RequestStage::Handled);

        let ok = StatusCode::OK.into_response();
        assert_eq!(finish(RequestStage::Authorized, &ok), RequestStage::Handled);
    }

    #[tokio::test]
    async fn test_project_access_without_gate_is_internal_error() {
        let state = state(Arc::new(InMemoryMembershipStore::new()));
        let app = Router::new()
            .route("/p/{project_id}", get(echo_access))
            .with_state(state.clone());

        let response = send(
            app,
            &format!("/p/{}", Uuid::new_v4()),
            Some(bearer(&state, Uuid::new_v4())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
