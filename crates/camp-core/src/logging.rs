//! tracing 기반 로깅 초기화.
//!
//! 형식은 `logging.format`으로 고릅니다:
//! - **pretty**: 개발용 여러 줄 형식
//! - **json**: 로그 수집용 JSON 한 줄 형식
//! - **compact**: 한 줄 텍스트 형식

use serde::Deserialize;
use tracing_subscriber::{
    filter::ParseError,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// `RUST_LOG`가 없을 때 레벨 뒤에 붙는 지시자.
///
/// sqlx는 모든 쿼리를 info로 남기므로 경고 이상만 출력합니다.
pub const DEFAULT_DIRECTIVES: &str = "sqlx::query=warn";

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// 로깅 초기화 에러.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("잘못된 로그 필터 '{directives}': {source}")]
    Filter {
        directives: String,
        #[source]
        source: ParseError,
    },
    #[error("전역 subscriber 설치 실패: {0}")]
    Install(#[from] TryInitError),
}

/// 레벨 설정으로 필터 지시자 문자열을 만듭니다.
fn filter_directives(level: &str) -> String {
    format!("{},{}", level.trim(), DEFAULT_DIRECTIVES)
}

/// `RUST_LOG`가 있으면 그것을, 없으면 `level` 기반 지시자를 사용합니다.
fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directives = match rust_log {
        Some(env) if !env.trim().is_empty() => env.to_string(),
        _ => filter_directives(level),
    };
    EnvFilter::try_new(&directives).map_err(|source| LoggingError::Filter { directives, source })
}

fn span_events(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// 전역 subscriber를 설치합니다. 프로세스당 한 번만 호출할 수 있습니다.
pub fn init_logging(settings: &LoggingConfig) -> Result<(), LoggingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&settings.level, rust_log.as_deref())?;

    let base = fmt::layer()
        .with_target(true)
        .with_span_events(span_events(settings.span_events));
    let layer = match settings.format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Json => base.json().with_current_span(true).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;

    tracing::info!(
        format = ?settings.format,
        level = %settings.level,
        span_events = settings.span_events,
        env_override = rust_log.is_some(),
        "Logging initialized"
    );

    Ok(())
}
