//! 라우트별 접근 정책.
//!
//! 프로젝트 범위 라우트가 허용하는 역할 집합을 한 곳에 선언합니다.
//! 테이블은 시작 시 한 번 생성되고 이후 변경되지 않습니다.

use std::collections::HashMap;

use camp_core::{CampError, CampResult, ProjectRole, RoleSet};

/// 프로젝트 범위 라우트 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    ProjectRead,
    ProjectUpdate,
    ProjectDelete,
    MemberList,
    MemberAdd,
    MemberUpdateRole,
    MemberRemove,
    TaskList,
    TaskCreate,
    TaskRead,
    TaskUpdate,
    TaskDelete,
    SubtaskCreate,
    SubtaskUpdate,
    SubtaskDelete,
    NoteList,
    NoteCreate,
    NoteRead,
    NoteUpdate,
    NoteDelete,
}

impl RouteId {
    /// 모든 라우트.
    pub const ALL: [RouteId; 20] = [
        RouteId::ProjectRead,
        RouteId::ProjectUpdate,
        RouteId::ProjectDelete,
        RouteId::MemberList,
        RouteId::MemberAdd,
        RouteId::MemberUpdateRole,
        RouteId::MemberRemove,
        RouteId::TaskList,
        RouteId::TaskCreate,
        RouteId::TaskRead,
        RouteId::TaskUpdate,
        RouteId::TaskDelete,
        RouteId::SubtaskCreate,
        RouteId::SubtaskUpdate,
        RouteId::SubtaskDelete,
        RouteId::NoteList,
        RouteId::NoteCreate,
        RouteId::NoteRead,
        RouteId::NoteUpdate,
        RouteId::NoteDelete,
    ];

    /// 로그/메트릭 라벨.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RouteId::ProjectRead => "project.read",
            RouteId::ProjectUpdate => "project.update",
            RouteId::ProjectDelete => "project.delete",
            RouteId::MemberList => "member.list",
            RouteId::MemberAdd => "member.add",
            RouteId::MemberUpdateRole => "member.update_role",
            RouteId::MemberRemove => "member.remove",
            RouteId::TaskList => "task.list",
            RouteId::TaskCreate => "task.create",
            RouteId::TaskRead => "task.read",
            RouteId::TaskUpdate => "task.update",
            RouteId::TaskDelete => "task.delete",
            RouteId::SubtaskCreate => "subtask.create",
            RouteId::SubtaskUpdate => "subtask.update",
            RouteId::SubtaskDelete => "subtask.delete",
            RouteId::NoteList => "note.list",
            RouteId::NoteCreate => "note.create",
            RouteId::NoteRead => "note.read",
            RouteId::NoteUpdate => "note.update",
            RouteId::NoteDelete => "note.delete",
        }
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 프로젝트가 없을 때의 응답 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// 역할 검사 전에 존재 여부를 확인하여 404로 응답 (조회 라우트)
    Reveal,
    /// 비멤버와 동일하게 403으로 응답
    Hide,
}

/// 라우트 하나의 접근 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    pub allowed: RoleSet,
    pub existence: Existence,
}

impl RoutePolicy {
    pub const fn new(allowed: RoleSet, existence: Existence) -> Self {
        Self { allowed, existence }
    }
}

const ADMIN: RoleSet = RoleSet::of(&[ProjectRole::Admin]);
const MANAGERS: RoleSet = RoleSet::of(&[ProjectRole::Admin, ProjectRole::ProjectAdmin]);
const ANY_MEMBER: RoleSet = RoleSet::ALL;

/// 라우트 정책 선언.
///
/// 조회는 모든 역할, 변경은 admin (작업/하위 작업은 project_admin 포함).
/// 하위 작업 수정은 멤버도 완료 처리할 수 있도록 모든 역할에 허용합니다.
pub const ROUTE_POLICIES: &[(RouteId, RoutePolicy)] = &[
    (RouteId::ProjectRead, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::ProjectUpdate, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::ProjectDelete, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::MemberList, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::MemberAdd, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::MemberUpdateRole, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::MemberRemove, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::TaskList, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::TaskCreate, RoutePolicy::new(MANAGERS, Existence::Hide)),
    (RouteId::TaskRead, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::TaskUpdate, RoutePolicy::new(MANAGERS, Existence::Hide)),
    (RouteId::TaskDelete, RoutePolicy::new(MANAGERS, Existence::Hide)),
    (RouteId::SubtaskCreate, RoutePolicy::new(MANAGERS, Existence::Hide)),
    (RouteId::SubtaskUpdate, RoutePolicy::new(ANY_MEMBER, Existence::Hide)),
    (RouteId::SubtaskDelete, RoutePolicy::new(MANAGERS, Existence::Hide)),
    (RouteId::NoteList, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::NoteCreate, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::NoteRead, RoutePolicy::new(ANY_MEMBER, Existence::Reveal)),
    (RouteId::NoteUpdate, RoutePolicy::new(ADMIN, Existence::Hide)),
    (RouteId::NoteDelete, RoutePolicy::new(ADMIN, Existence::Hide)),
];

/// 라우트 정책 테이블.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<RouteId, RoutePolicy>,
}

impl PolicyTable {
    /// 선언 목록으로 테이블 생성.
    ///
    /// 중복 선언, 빈 역할 집합, 누락된 라우트는 에러입니다.
    pub fn from_declarations(declarations: &[(RouteId, RoutePolicy)]) -> CampResult<Self> {
        let mut policies = HashMap::with_capacity(declarations.len());

        for (route, policy) in declarations {
            if policy.allowed.is_empty() {
                return Err(CampError::Policy(format!("{}: 허용 역할이 비어 있습니다", route)));
            }
            if policies.insert(*route, *policy).is_some() {
                return Err(CampError::Policy(format!("{}: 중복 선언", route)));
            }
        }

        if let Some(missing) = RouteId::ALL.iter().find(|r| !policies.contains_key(r)) {
            return Err(CampError::Policy(format!("{}: 정책이 선언되지 않았습니다", missing)));
        }

        Ok(Self { policies })
    }

    /// 표준 정책 테이블.
    pub fn standard() -> CampResult<Self> {
        Self::from_declarations(ROUTE_POLICIES)
    }

    /// 라우트 정책 조회.
    pub fn get(&self, route: RouteId) -> Option<RoutePolicy> {
        self.policies.get(&route).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_every_route() {
        let table = PolicyTable::standard().unwrap();
        for route in RouteId::ALL {
            assert!(table.get(route).is_some(), "missing policy for {}", route);
        }
    }

    #[test]
    fn test_mutations_require_privileged_roles() {
        let table = PolicyTable::standard().unwrap();

        for route in [
            RouteId::ProjectUpdate,
            RouteId::ProjectDelete,
            RouteId::MemberAdd,
            RouteId::MemberUpdateRole,
            RouteId::MemberRemove,
            RouteId::NoteCreate,
            RouteId::NoteUpdate,
            RouteId::NoteDelete,
        ] {
            assert_eq!(table.get(route).unwrap().allowed, ADMIN, "{}", route);
        }

        for route in [RouteId::TaskCreate, RouteId::TaskUpdate, RouteId::TaskDelete] {
            let allowed = table.get(route).unwrap().allowed;
            assert!(allowed.contains(ProjectRole::ProjectAdmin));
            assert!(!allowed.contains(ProjectRole::Member));
        }
    }

    #[test]
    fn test_reads_reveal_existence() {
        let table = PolicyTable::standard().unwrap();
        for route in [
            RouteId::ProjectRead,
            RouteId::MemberList,
            RouteId::TaskList,
            RouteId::TaskRead,
            RouteId::NoteList,
            RouteId::NoteRead,
        ] {
            let policy = table.get(route).unwrap();
            assert_eq!(policy.existence, Existence::Reveal);
            assert_eq!(policy.allowed, RoleSet::ALL);
        }
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut declarations = ROUTE_POLICIES.to_vec();
        declarations.push((RouteId::NoteRead, RoutePolicy::new(ADMIN, Existence::Hide)));
        assert!(PolicyTable::from_declarations(&declarations).is_err());
    }

    #[test]
    fn test_missing_route_rejected() {
        let declarations: Vec<_> = ROUTE_POLICIES
            .iter()
            .copied()
            .filter(|(route, _)| *route != RouteId::TaskDelete)
            .collect();
        assert!(PolicyTable::from_declarations(&declarations).is_err());
    }

    #[test]
    fn test_empty_role_set_rejected() {
        let mut declarations = ROUTE_POLICIES.to_vec();
        declarations[0].1 = RoutePolicy::new(RoleSet::EMPTY, Existence::Reveal);
        assert!(PolicyTable::from_declarations(&declarations).is_err());
    }
}
