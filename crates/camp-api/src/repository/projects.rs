//! Project Repository
//!
//! 프로젝트 CRUD. 프로젝트 생성 시 생성자를 admin 멤버로 함께 등록합니다.

use camp_core::ProjectRole;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

// ================================================================================================
// Types
// ================================================================================================

/// 프로젝트 레코드
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 사용자 기준 프로젝트 목록 항목 (내 역할 + 멤버 수)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub role: ProjectRole,
    pub member_count: i64,
}

/// 프로젝트 생성/수정 입력
#[derive(Debug, Clone)]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
}

// ================================================================================================
// Repository
// ================================================================================================

/// Project Repository
pub struct ProjectRepository;

impl ProjectRepository {
    /// 사용자가 속한 프로젝트 목록.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT
                p.id, p.name, p.description, p.created_by, p.created_at, p.updated_at,
                pm.role,
                (SELECT COUNT(*) FROM project_members m WHERE m.project_id = p.id) AS member_count
            FROM projects p
            JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// 프로젝트 상세.
    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<ProjectRecord>, sqlx::Error> {
        sqlx::query_as::<_, ProjectRecord>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// 프로젝트 생성 + 생성자 admin 등록 (단일 트랜잭션).
    pub async fn create(
        pool: &PgPool,
        created_by: Uuid,
        input: ProjectInput,
    ) -> Result<ProjectRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, ProjectRecord>(
            r#"
            INSERT INTO projects (id, name, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO project_members (user_id, project_id, role) VALUES ($1, $2, $3)")
            .bind(created_by)
            .bind(project.id)
            .bind(ProjectRole::Admin.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// 프로젝트 수정.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: ProjectInput,
    ) -> Result<Option<ProjectRecord>, sqlx::Error> {
        sqlx::query_as::<_, ProjectRecord>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(pool)
        .await
    }

    /// 프로젝트 삭제 (CASCADE로 멤버/작업/노트도 삭제됨).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
