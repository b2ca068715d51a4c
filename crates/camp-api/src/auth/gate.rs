//! 권한 게이트.
//!
//! 인증된 사용자가 프로젝트 범위 라우트에 접근할 수 있는지 결정합니다.
//! 멤버십 조회 외에는 부수 효과가 없으며(로그/메트릭 제외), 같은 입력에
//! 대해 항상 같은 결정을 반환합니다.

use std::sync::Arc;

use camp_core::{Identity, ProjectRole, RoleSet};
use metrics::counter;
use uuid::Uuid;

use crate::repository::{MembershipStore, StoreError};

/// 거부 사유.
///
/// 응답에서는 구분하지 않고 모두 403으로 변환됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotAMember,
    InsufficientRole,
}

impl DenyReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAMember => "not_a_member",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

/// 권한 결정. 요청마다 계산되며 저장하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(ProjectRole),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// 메트릭/로그 라벨.
    pub const fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow(_) => "allow",
            Decision::Deny(reason) => reason.as_str(),
        }
    }
}

/// 멤버십 역할과 허용 역할 집합으로 결정.
pub fn decide(role: Option<ProjectRole>, allowed: RoleSet) -> Decision {
    match role {
        None => Decision::Deny(DenyReason::NotAMember),
        Some(role) if allowed.contains(role) => Decision::Allow(role),
        Some(_) => Decision::Deny(DenyReason::InsufficientRole),
    }
}

/// 권한 게이트.
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn MembershipStore>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// 접근 권한 확인.
    ///
    /// 저장소 장애는 결정이 아니라 에러로 전파됩니다.
    pub async fn authorize(
        &self,
        identity: &Identity,
        project_id: Uuid,
        allowed: RoleSet,
    ) -> Result<Decision, StoreError> {
        let role = self.store.role_of(identity.user_id, project_id).await?;
        Ok(decide(role, allowed))
    }

    /// 라우트 라벨과 함께 확인하고 결과를 기록합니다.
    pub async fn authorize_route(
        &self,
        identity: &Identity,
        project_id: Uuid,
        allowed: RoleSet,
        route: &'static str,
    ) -> Result<Decision, StoreError> {
        let decision = self.authorize(identity, project_id, allowed).await?;
        record_decision(identity, project_id, route, &decision);
        Ok(decision)
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}

fn record_decision(
    identity: &Identity,
    project_id: Uuid,
    route: &'static str,
    decision: &Decision,
) {
    let outcome = decision.outcome();

    match decision {
        Decision::Allow(role) => tracing::debug!(
            user_id = %identity.user_id,
            %project_id,
            route,
            %role,
            outcome,
            "Access granted"
        ),
        Decision::Deny(_) => tracing::info!(
            user_id = %identity.user_id,
            %project_id,
            route,
            outcome,
            "Access denied"
        ),
    }

    counter!("authz_decisions_total", "route" => route, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryMembershipStore;

    #[test]
    fn test_decide() {
        let admin_only = RoleSet::of(&[ProjectRole::Admin]);

        assert_eq!(
            decide(None, RoleSet::ALL),
            Decision::Deny(DenyReason::NotAMember)
        );
        assert_eq!(
            decide(Some(ProjectRole::Member), admin_only),
            Decision::Deny(DenyReason::InsufficientRole)
        );
        assert_eq!(
            decide(Some(ProjectRole::Admin), admin_only),
            Decision::Allow(ProjectRole::Admin)
        );
    }

    #[tokio::test]
    async fn test_authorize_against_store() {
        let store = Arc::new(InMemoryMembershipStore::new());
        let project = Uuid::new_v4();
        let admin = Identity::new(Uuid::new_v4(), "admin");
        let member = Identity::new(Uuid::new_v4(), "member");
        let outsider = Identity::new(Uuid::new_v4(), "outsider");

        store.add(admin.user_id, project, ProjectRole::Admin).await;
        store.add(member.user_id, project, ProjectRole::Member).await;

        let gate = PermissionGate::new(store);
        let admin_only = RoleSet::of(&[ProjectRole::Admin]);

        assert_eq!(
            gate.authorize(&admin, project, admin_only).await.unwrap(),
            Decision::Allow(ProjectRole::Admin)
        );
        assert_eq!(
            gate.authorize(&member, project, admin_only).await.unwrap(),
            Decision::Deny(DenyReason::InsufficientRole)
        );
        assert_eq!(
            gate.authorize(&outsider, project, RoleSet::ALL).await.unwrap(),
            Decision::Deny(DenyReason::NotAMember)
        );
    }

    #[tokio::test]
    async fn test_missing_project_is_not_a_member() {
        let gate = PermissionGate::new(Arc::new(InMemoryMembershipStore::new()));
        let identity = Identity::new(Uuid::new_v4(), "ghost");

        let decision = gate
            .authorize(&identity, Uuid::new_v4(), RoleSet::ALL)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::NotAMember));
    }

    #[tokio::test]
    async fn test_role_change_is_seen_on_next_request() {
        let store = Arc::new(InMemoryMembershipStore::new());
        let project = Uuid::new_v4();
        let user = Identity::new(Uuid::new_v4(), "user");
        store.add(user.user_id, project, ProjectRole::Admin).await;

        let gate = PermissionGate::new(store.clone());
        let admin_only = RoleSet::of(&[ProjectRole::Admin]);
        assert!(gate.authorize(&user, project, admin_only).await.unwrap().is_allowed());

        store.set_role(user.user_id, project, ProjectRole::Member).await;
        assert!(!gate.authorize(&user, project, admin_only).await.unwrap().is_allowed());
    }
}
