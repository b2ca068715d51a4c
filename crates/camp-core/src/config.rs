//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 로드 순서: 기본값 → `config/default.toml` (선택) → `CAMP__` 접두사 환경 변수.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::error::{CampError, CampResult};
use crate::logging::LogFormat;

/// 운영 환경에서 요구하는 JWT 비밀 키 최소 길이 (바이트).
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 실행 환경 설정
    #[serde(default)]
    pub app: AppSection,
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 실행 환경.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// 실행 환경 설정.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    /// 실행 환경 (development | production)
    #[serde(default)]
    pub environment: Environment,
}

impl AppSection {
    /// 내부 에러 상세를 응답에 포함할지 여부.
    pub fn expose_internal_errors(&self) -> bool {
        self.environment != Environment::Production
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용 CORS origin 목록 (비어 있으면 모든 origin 허용)
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL
    #[serde(default)]
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// 인증 설정.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// JWT 서명 비밀 키
    #[serde(deserialize_with = "deserialize_secret")]
    pub jwt_secret: SecretString,
    /// Access Token 만료 시간 (분)
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: i64,
    /// Refresh Token 만료 시간 (일)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: i64,
}

fn default_access_ttl() -> i64 {
    15
}

fn default_refresh_ttl() -> i64 {
    7
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into()))
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨 또는 필터 지시자 (예: "info", "camp_api=debug")
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default)]
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력 여부
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            span_events: false,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일은 없어도 됩니다. 환경 변수는 `CAMP__AUTH__JWT_SECRET`처럼
    /// `__`로 섹션을 구분합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CampResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.connection_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("logging.span_events", false)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("CAMP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CampResult<Self> {
        Self::load("config/default.toml")
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> CampResult<()> {
        let secret_len = self.auth.jwt_secret.expose_secret().len();
        if secret_len == 0 {
            return Err(CampError::Config("auth.jwt_secret가 비어 있습니다".to_string()));
        }
        if self.app.environment == Environment::Production && secret_len < MIN_JWT_SECRET_LEN {
            return Err(CampError::Config(format!(
                "운영 환경의 auth.jwt_secret는 최소 {}바이트여야 합니다",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.auth.access_token_ttl_minutes <= 0 || self.auth.refresh_token_ttl_days <= 0 {
            return Err(CampError::Config("토큰 만료 시간은 양수여야 합니다".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(environment: Environment, secret: &str) -> AppConfig {
        AppConfig {
            app: AppSection { environment },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig {
                jwt_secret: SecretString::new(secret.to_string().into()),
                access_token_ttl_minutes: default_access_ttl(),
                refresh_token_ttl_days: default_refresh_ttl(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_short_secret_rejected_in_production() {
        let config = config_with(Environment::Production, "short");
        assert!(config.validate().is_err());

        let config = config_with(Environment::Development, "short");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = config_with(Environment::Development, "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expose_internal_errors_by_environment() {
        assert!(AppSection { environment: Environment::Development }.expose_internal_errors());
        assert!(!AppSection { environment: Environment::Production }.expose_internal_errors());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = config_with(Environment::Development, "super-secret-value");
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_logging_section_from_file() {
        let dir = std::env::temp_dir().join(format!("camp-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("logging.toml");
        std::fs::write(
            &path,
            r#"
            [auth]
            jwt_secret = "file-secret"

            [logging]
            level = "camp_api=debug"
            format = "json"
            span_events = true
            "#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.logging.level, "camp_api=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.span_events);
    }
}
