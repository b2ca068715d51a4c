//! User Repository
//!
//! 사용자 계정 및 Refresh Token 지문 저장을 담당합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

// ================================================================================================
// Types
// ================================================================================================

/// 사용자 레코드 (비밀번호 해시 포함, 응답으로 직접 노출하지 않음).
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[sqlx(default)]
    pub full_name: Option<String>,
    #[sqlx(default)]
    pub avatar_url: Option<String>,
    pub password_hash: String,
    #[sqlx(default)]
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 공개 사용자 정보.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            avatar_url: record.avatar_url,
            created_at: record.created_at,
        }
    }
}

/// 새 사용자 입력 (비밀번호는 해싱 완료 상태).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

// ================================================================================================
// Repository
// ================================================================================================

/// User Repository
pub struct UserRepository;

impl UserRepository {
    /// 사용자 생성. username/email 중복은 unique 제약 위반으로 반환됩니다.
    pub async fn create(pool: &PgPool, input: NewUser) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.full_name)
        .bind(&input.password_hash)
        .fetch_one(pool)
        .await
    }

    /// ID로 조회.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// username 또는 email로 조회 (로그인용).
    pub async fn find_by_login(
        pool: &PgPool,
        login: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users WHERE username = $1 OR email = $1 LIMIT 1",
        )
        .bind(login)
        .fetch_optional(pool)
        .await
    }

    /// email로 조회 (멤버 추가용).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Refresh Token 지문 저장 (`None`이면 로그아웃).
    pub async fn set_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Refresh Token 교체.
    ///
    /// 저장된 지문이 `expected`와 일치할 때만 교체하므로,
    /// 같은 Refresh Token으로 동시에 갱신하면 하나만 성공합니다.
    pub async fn rotate_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users SET refresh_token_hash = $3, updated_at = NOW()
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 비밀번호 변경. 기존 Refresh Token도 함께 무효화합니다.
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_token_hash = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(())
    }
}
