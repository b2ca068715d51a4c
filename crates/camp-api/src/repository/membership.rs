//! 프로젝트 멤버십 저장소.
//!
//! 권한 검사용 조회([`MembershipStore`])와 멤버 관리용 변경([`MemberRepository`])을
//! 제공합니다. 멤버십은 `(user_id, project_id)` 복합 키로 최대 1개입니다.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use camp_core::ProjectRole;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

// ================================================================================================
// Errors
// ================================================================================================

/// 멤버십 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("멤버십 저장소 조회 실패: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for crate::error::ApiError {
    fn from(err: StoreError) -> Self {
        crate::error::ApiError::Internal(err.into())
    }
}

// ================================================================================================
// Lookup trait
// ================================================================================================

/// 권한 검사용 멤버십 조회.
///
/// 프로젝트가 없는 경우와 멤버가 아닌 경우는 모두 `None`입니다.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// 사용자의 프로젝트 역할 조회.
    async fn role_of(&self, user_id: Uuid, project_id: Uuid)
        -> Result<Option<ProjectRole>, StoreError>;

    /// 프로젝트 존재 여부.
    async fn project_exists(&self, project_id: Uuid) -> Result<bool, StoreError>;
}

/// Postgres 멤버십 조회.
#[derive(Debug, Clone)]
pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn role_of(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Option<ProjectRole>, StoreError> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM project_members WHERE user_id = $1 AND project_id = $2",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        // CHECK 제약으로 알 수 없는 값은 들어올 수 없지만, 들어오면 비멤버로 취급
        Ok(role.and_then(|r| {
            let parsed = ProjectRole::parse(&r);
            if parsed.is_none() {
                tracing::warn!(role = %r, %user_id, %project_id, "Unknown role in project_members");
            }
            parsed
        }))
    }

    async fn project_exists(&self, project_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

/// 메모리 기반 멤버십 저장소.
///
/// 테스트와 로컬 도구용이며 프로세스 종료 시 사라집니다.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    projects: RwLock<HashSet<Uuid>>,
    members: RwLock<HashMap<(Uuid, Uuid), ProjectRole>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로젝트 등록.
    pub async fn add_project(&self, project_id: Uuid) {
        self.projects.write().await.insert(project_id);
    }

    /// 멤버 추가 (프로젝트도 함께 등록). 기존 멤버십이 있으면 `false`.
    pub async fn add(&self, user_id: Uuid, project_id: Uuid, role: ProjectRole) -> bool {
        self.add_project(project_id).await;
        let mut members = self.members.write().await;
        if members.contains_key(&(user_id, project_id)) {
            return false;
        }
        members.insert((user_id, project_id), role);
        true
    }

    /// 역할 변경. 멤버가 아니면 `false`.
    pub async fn set_role(&self, user_id: Uuid, project_id: Uuid, role: ProjectRole) -> bool {
        match self.members.write().await.get_mut(&(user_id, project_id)) {
            Some(current) => {
                *current = role;
                true
            }
            None => false,
        }
    }

    /// 멤버 제거.
    pub async fn remove(&self, user_id: Uuid, project_id: Uuid) -> bool {
        self.members
            .write()
            .await
            .remove(&(user_id, project_id))
            .is_some()
    }

    /// 프로젝트 삭제 (멤버십도 함께 삭제).
    pub async fn remove_project(&self, project_id: Uuid) {
        self.projects.write().await.remove(&project_id);
        self.members
            .write()
            .await
            .retain(|(_, project), _| *project != project_id);
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn role_of(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Option<ProjectRole>, StoreError> {
        Ok(self.members.read().await.get(&(user_id, project_id)).copied())
    }

    async fn project_exists(&self, project_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.projects.read().await.contains(&project_id))
    }
}

// ================================================================================================
// Member management
// ================================================================================================

/// 멤버 목록 레코드.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MemberRecord {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[sqlx(default)]
    pub full_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// 멤버 변경 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberChange {
    Applied,
    NotAMember,
    /// 마지막 admin의 강등/제거 시도
    LastAdmin,
}

impl MemberChange {
    /// 변경 가능 여부 판정.
    ///
    /// `next`가 `None`이면 제거입니다. `admins`는 현재 프로젝트의 admin 수입니다.
    pub fn evaluate(
        current: Option<ProjectRole>,
        next: Option<ProjectRole>,
        admins: usize,
    ) -> MemberChange {
        let Some(current) = current else {
            return MemberChange::NotAMember;
        };
        let leaves_admin = current == ProjectRole::Admin && next != Some(ProjectRole::Admin);
        if leaves_admin && admins <= 1 {
            return MemberChange::LastAdmin;
        }
        MemberChange::Applied
    }
}

/// 멤버 관리 Repository.
pub struct MemberRepository;

impl MemberRepository {
    /// 프로젝트 멤버 목록.
    pub async fn list(pool: &PgPool, project_id: Uuid) -> Result<Vec<MemberRecord>, sqlx::Error> {
        sqlx::query_as::<_, MemberRecord>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, u.full_name, pm.role, pm.created_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.created_at, u.username
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// 멤버 한 명 조회.
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemberRecord>, sqlx::Error> {
        sqlx::query_as::<_, MemberRecord>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, u.full_name, pm.role, pm.created_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1 AND pm.user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 멤버 추가. 이미 멤버이면 `false`.
    pub async fn add(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_members (user_id, project_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, project_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(role.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 역할 변경.
    ///
    /// 프로젝트의 admin 행을 잠근 뒤 검사하므로 동시 요청으로
    /// admin이 0명이 되지 않습니다.
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<MemberChange, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let admins = Self::lock_admins(&mut tx, project_id).await?;
        let current = Self::current_role(&mut tx, project_id, user_id).await?;

        let change = MemberChange::evaluate(current, Some(role), admins.len());
        if change != MemberChange::Applied {
            return Ok(change);
        }

        sqlx::query(
            r#"
            UPDATE project_members SET role = $3, updated_at = NOW()
            WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(MemberChange::Applied)
    }

    /// 멤버 제거.
    pub async fn remove(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<MemberChange, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let admins = Self::lock_admins(&mut tx, project_id).await?;
        let current = Self::current_role(&mut tx, project_id, user_id).await?;

        let change = MemberChange::evaluate(current, None, admins.len());
        if change != MemberChange::Applied {
            return Ok(change);
        }

        sqlx::query("DELETE FROM project_members WHERE user_id = $1 AND project_id = $2")
            .bind(user_id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(MemberChange::Applied)
    }

    /// 사용자가 프로젝트 멤버인지 확인 (작업 담당자 검증용).
    pub async fn is_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE user_id = $1 AND project_id = $2)",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_one(pool)
        .await
    }

    async fn lock_admins(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        project_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM project_members
            WHERE project_id = $1 AND role = 'admin'
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut **tx)
        .await
    }

    async fn current_role(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM project_members WHERE user_id = $1 AND project_id = $2",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(role.as_deref().and_then(ProjectRole::parse))
    }
}
