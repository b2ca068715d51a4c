//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 시작 시 한 번 구성되며 이후 변경되지 않습니다.
//! Arc로 래핑되어 여러 요청 간에 공유됩니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::{JwtKeys, PermissionGate, PolicyTable, TokenVerifier};
use crate::error::{ApiError, ApiResult};
use crate::repository::MembershipStore;

/// 기본 Access Token 만료 시간 (분).
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
/// 기본 Refresh Token 만료 시간 (일).
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 데이터베이스 연결 풀 (PostgreSQL)
    pub db_pool: Option<PgPool>,

    /// JWT 서명/검증 키
    pub keys: Arc<JwtKeys>,

    /// Access Token 검증기
    pub verifier: TokenVerifier,

    /// 멤버십 조회 저장소
    pub membership: Arc<dyn MembershipStore>,

    /// 권한 게이트
    pub gate: PermissionGate,

    /// 라우트 정책 테이블 (불변)
    pub policies: Arc<PolicyTable>,

    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,

    /// 서버 시작 시간
    pub started_at: DateTime<Utc>,

    /// 애플리케이션 버전
    pub version: String,
}

impl AppState {
    /// 새 상태 생성.
    pub fn new(
        keys: Arc<JwtKeys>,
        membership: Arc<dyn MembershipStore>,
        policies: PolicyTable,
    ) -> Self {
        Self {
            db_pool: None,
            verifier: TokenVerifier::new(keys.clone()),
            gate: PermissionGate::new(membership.clone()),
            keys,
            membership,
            policies: Arc::new(policies),
            access_token_ttl_minutes: DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 풀 설정.
    #[must_use]
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 토큰 만료 시간 설정.
    #[must_use]
    pub fn with_token_ttl(mut self, access_minutes: i64, refresh_days: i64) -> Self {
        self.access_token_ttl_minutes = access_minutes;
        self.refresh_token_ttl_days = refresh_days;
        self
    }

    /// 데이터베이스 풀 (없으면 500).
    pub fn pool(&self) -> ApiResult<&PgPool> {
        self.db_pool
            .as_ref()
            .ok_or_else(|| ApiError::internal("Database not available"))
    }

    /// 서버 가동 시간 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 데이터베이스 연결 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => false,
        }
    }
}
