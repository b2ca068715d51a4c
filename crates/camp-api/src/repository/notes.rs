//! Note Repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

/// 노트 레코드 (작성자 이름 포함)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct NoteRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    pub created_by: Uuid,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_NOTE: &str = r#"
    SELECT n.id, n.project_id, n.content, n.created_by,
           u.username AS created_by_username, n.created_at, n.updated_at
    FROM notes n
    JOIN users u ON u.id = n.created_by
"#;

/// Note Repository
pub struct NoteRepository;

impl NoteRepository {
    /// 프로젝트 노트 목록 (최신순).
    pub async fn list(pool: &PgPool, project_id: Uuid) -> Result<Vec<NoteRecord>, sqlx::Error> {
        sqlx::query_as::<_, NoteRecord>(&format!(
            "{SELECT_NOTE} WHERE n.project_id = $1 ORDER BY n.created_at DESC"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// 노트 상세.
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<NoteRecord>, sqlx::Error> {
        sqlx::query_as::<_, NoteRecord>(&format!(
            "{SELECT_NOTE} WHERE n.id = $1 AND n.project_id = $2"
        ))
        .bind(note_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    /// 노트 생성.
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        created_by: Uuid,
        content: &str,
    ) -> Result<NoteRecord, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO notes (id, project_id, content, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(content)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Self::find(pool, project_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// 노트 수정.
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
        content: &str,
    ) -> Result<Option<NoteRecord>, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE notes SET content = $3, updated_at = NOW() WHERE id = $1 AND project_id = $2",
        )
        .bind(note_id)
        .bind(project_id)
        .bind(content)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find(pool, project_id, note_id).await
    }

    /// 노트 삭제.
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND project_id = $2")
            .bind(note_id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
