//! 프로젝트 역할 정의.
//!
//! 사용자는 프로젝트마다 하나의 역할을 가집니다. 역할은 닫힌 열거형이며,
//! 라우트는 허용 역할 집합(`RoleSet`)으로 접근을 선언합니다.

use serde::{Deserialize, Serialize};

use crate::error::CampError;

/// 프로젝트 멤버 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// 프로젝트 관리자 - 프로젝트/멤버/노트 관리
    Admin,
    /// 프로젝트 운영자 - 작업 및 하위 작업 관리
    ProjectAdmin,
    /// 일반 멤버 - 조회 및 하위 작업 완료 처리
    Member,
}

impl ProjectRole {
    /// 모든 역할.
    pub const ALL: [ProjectRole; 3] = [
        ProjectRole::Admin,
        ProjectRole::ProjectAdmin,
        ProjectRole::Member,
    ];

    /// 저장소/직렬화에 사용하는 문자열 표현.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::ProjectAdmin => "project_admin",
            ProjectRole::Member => "member",
        }
    }

    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(ProjectRole::Admin),
            "project_admin" => Some(ProjectRole::ProjectAdmin),
            "member" => Some(ProjectRole::Member),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            ProjectRole::Admin => 0b001,
            ProjectRole::ProjectAdmin => 0b010,
            ProjectRole::Member => 0b100,
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = CampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CampError::UnknownRole(s.to_string()))
    }
}

/// DB 컬럼(TEXT)에서 역할 디코딩용.
impl TryFrom<String> for ProjectRole {
    type Error = CampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 허용 역할 집합.
///
/// 라우트 정책 테이블에서 상수로 선언할 수 있도록 `const fn`으로 구성합니다.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    /// 빈 집합.
    pub const EMPTY: RoleSet = RoleSet(0);

    /// 모든 역할.
    pub const ALL: RoleSet = RoleSet::of(&ProjectRole::ALL);

    /// 역할 목록으로 집합 생성.
    pub const fn of(roles: &[ProjectRole]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        RoleSet(bits)
    }

    /// 역할 포함 여부.
    pub const fn contains(&self, role: ProjectRole) -> bool {
        self.0 & role.bit() != 0
    }

    /// 빈 집합 여부.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// 역할 추가.
    #[must_use]
    pub const fn with(self, role: ProjectRole) -> Self {
        RoleSet(self.0 | role.bit())
    }

    /// 포함된 역할 순회.
    pub fn iter(&self) -> impl Iterator<Item = ProjectRole> + '_ {
        ProjectRole::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl std::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl FromIterator<ProjectRole> for RoleSet {
    fn from_iter<I: IntoIterator<Item = ProjectRole>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::EMPTY, RoleSet::with)
    }
}
