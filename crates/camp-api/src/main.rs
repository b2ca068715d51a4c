//! ProjectCamp API 서버 진입점.
//!
//! 설정 로드, 로깅/메트릭 초기화, DB 연결 후 HTTP 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, http::StatusCode, middleware, routing::get, Router};
use camp_api::auth::{JwtKeys, PolicyTable};
use camp_api::error::set_expose_internal_errors;
use camp_api::metrics::setup_metrics_recorder;
use camp_api::middleware::metrics_layer;
use camp_api::repository::{InMemoryMembershipStore, MembershipStore, PgMembershipStore};
use camp_api::{build_router, AppState};
use camp_core::{init_logging, AppConfig, DatabaseConfig, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// CORS 레이어.
///
/// `server.cors_origins`가 비어 있으면 모든 origin을 허용합니다 (개발 모드).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        warn!("CORS origins not configured, allowing any origin (development mode)");
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        if parsed.is_empty() {
            warn!("CORS origins contain no valid origin, allowing any");
            AllowOrigin::any()
        } else {
            info!("CORS configured with {} allowed origins", parsed.len());
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// Prometheus 메트릭 엔드포인트.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// 전체 라우터 구성.
fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    server: &ServerConfig,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(build_router(state))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_layer(&server.cors_origins))
}

/// DB 연결 풀 생성 및 마이그레이션.
///
/// URL이 설정되지 않았으면 `None`을 반환합니다.
async fn connect_database(config: &DatabaseConfig) -> anyhow::Result<Option<PgPool>> {
    let Some(url) = config.url.as_deref() else {
        warn!("DATABASE_URL not set, running without database");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url)
        .await
        .context("데이터베이스 연결 실패")?;
    info!(max_connections = config.max_connections, "Database connected");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("마이그레이션 실패")?;
        info!("Database migrations applied");
    }

    Ok(Some(pool))
}

/// Graceful shutdown 시그널 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;

    init_logging(&config.logging).context("로깅 초기화 실패")?;

    info!(environment = ?config.app.environment, "Starting ProjectCamp API server...");
    set_expose_internal_errors(config.app.expose_internal_errors());

    let metrics_handle = setup_metrics_recorder()?;
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "소켓 주소 설정이 유효하지 않습니다. CAMP__SERVER__HOST, CAMP__SERVER__PORT를 확인하세요."
            );
            anyhow::anyhow!("invalid socket address: {e}")
        })?;

    let db_pool = connect_database(&config.database).await?;

    let membership: Arc<dyn MembershipStore> = match &db_pool {
        Some(pool) => Arc::new(PgMembershipStore::new(pool.clone())),
        None => {
            warn!("Using in-memory membership store (development only)");
            Arc::new(InMemoryMembershipStore::default())
        }
    };

    let policies = PolicyTable::standard()?;
    let keys = Arc::new(JwtKeys::from_secret(&config.auth.jwt_secret));

    let mut state = AppState::new(keys, membership, policies).with_token_ttl(
        config.auth.access_token_ttl_minutes,
        config.auth.refresh_token_ttl_days,
    );
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        has_db = state.db_pool.is_some(),
        "Application state initialized"
    );

    let app = create_router(state, metrics_handle, &config.server);

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}
