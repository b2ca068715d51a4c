//! 인증 및 권한 부여.
//!
//! JWT 기반 인증과 프로젝트 역할 기반 접근 제어를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`TokenVerifier`]: Bearer 토큰을 [`camp_core::Identity`]로 검증
//! - [`PermissionGate`]: 멤버십 역할과 라우트 허용 역할로 접근 결정
//! - [`PolicyTable`]: 라우트별 허용 역할 선언
//! - [`require_project_role`]: 프로젝트 범위 라우트에 장착하는 미들웨어
//! - [`AuthUser`]: 인증된 사용자 추출기
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let gate = |route| middleware::from_fn_with_state(RouteGuard::new(state.clone(), route), require_project_role);
//! Router::new().route("/{project_id}", get(get_project).route_layer(gate(RouteId::ProjectRead)));
//! ```

mod gate;
mod jwt;
mod middleware;
mod password;
mod policy;
mod verifier;

pub use gate::{decide, Decision, DenyReason, PermissionGate};
pub use jwt::{
    create_refresh_token, create_token, create_token_pair, decode_refresh_token, decode_token,
    fingerprint, Claims, JwtError, JwtKeys, RefreshClaims, TokenPair,
};
pub use middleware::{require_project_role, AuthUser, ProjectAccess, RouteGuard};
pub use password::{
    check_password_strength, hash_password, hash_password_blocking, verify_password,
    verify_password_blocking, PasswordError, MIN_PASSWORD_LEN,
};
pub use policy::{Existence, PolicyTable, RouteId, RoutePolicy, ROUTE_POLICIES};
pub use verifier::{bearer_token, AuthError, TokenVerifier};
