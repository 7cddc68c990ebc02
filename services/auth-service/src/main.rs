//! auth-service 启动入口

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth_service::api::http::{AppState, router};
use auth_service::application::AuthService;
use auth_service::domain::repositories::{AccountDirectory, SessionStore};
use auth_service::domain::services::Argon2CredentialVerifier;
use auth_service::infrastructure::cleanup::SessionSweeper;
use auth_service::infrastructure::events::LoggingEventPublisher;
use auth_service::infrastructure::persistence::{
    InMemoryAccountDirectory, InMemorySessionStore, PostgresAccountDirectory, PostgresSessionStore,
    RedisSessionStore, schema,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_bootstrap::{Infrastructure, init_runtime, shutdown_signal};
use warden_config::{AppConfig, SessionBackend};
use warden_errors::AppError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;
    let prometheus = init_runtime(&config);

    let infra = Infrastructure::from_config(config).await?;
    let config = infra.config().clone();

    let (accounts, sessions) = build_stores(&infra).await?;
    let credentials = Arc::new(Argon2CredentialVerifier::new(&config.password)?);

    let auth = Arc::new(
        AuthService::new(accounts, sessions.clone(), credentials, infra.token_signer())
            .with_event_publisher(Arc::new(LoggingEventPublisher)),
    );

    let shutdown = CancellationToken::new();
    // Redis 会话依赖键 TTL 过期，无需后台清理
    let sweep_sessions =
        config.session_cleanup.enabled && config.storage.sessions != SessionBackend::Redis;
    let sweeper = if sweep_sessions {
        let sweeper = Arc::new(SessionSweeper::new(
            sessions,
            Duration::from_secs(config.session_cleanup.interval_secs.max(1)),
        ));
        Some(sweeper.start(shutdown.clone()))
    } else {
        None
    };

    let app = router(AppState::new(auth).with_metrics(prometheus));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "auth-service listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    infra.close().await;
    info!("auth-service stopped");

    Ok(())
}

/// 按存储配置装配账户目录与会话存储
async fn build_stores(
    infra: &Infrastructure,
) -> Result<(Arc<dyn AccountDirectory>, Arc<dyn SessionStore>), AppError> {
    let (accounts, sessions): (Arc<dyn AccountDirectory>, Arc<dyn SessionStore>) =
        match infra.postgres_pool() {
            Some(pool) => {
                let report = schema::run_migrations(&pool).await?;
                info!(
                    applied = report.applied.len(),
                    skipped = report.skipped.len(),
                    "Database migrations complete"
                );
                (
                    Arc::new(PostgresAccountDirectory::new(pool.clone())),
                    Arc::new(PostgresSessionStore::new(pool)),
                )
            }
            None => (
                Arc::new(InMemoryAccountDirectory::new()),
                Arc::new(InMemorySessionStore::new()),
            ),
        };

    let sessions: Arc<dyn SessionStore> = match infra.redis_connection_manager() {
        Some(conn) => Arc::new(RedisSessionStore::new(conn)),
        None => sessions,
    };

    info!(
        backend = ?infra.config().storage.backend,
        sessions = ?infra.config().storage.sessions,
        "Stores configured"
    );
    Ok((accounts, sessions))
}
