//! 基础设施资源管理
//!
//! 按存储配置连接 PostgreSQL / Redis，并构建令牌签发器。
//! 内存后端不建立任何外部连接。

use std::sync::Arc;

use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;
use warden_adapter_postgres::{PostgresConfig, create_pool};
use warden_adapter_redis::create_connection_manager;
use warden_auth_core::TokenSigner;
use warden_common::{RetryConfig, with_retry};
use warden_config::{AppConfig, JwtConfig, Lifetime, SessionBackend, StorageBackend};
use warden_errors::{AppError, AppResult};

/// 基础设施资源容器
pub struct Infrastructure {
    config: AppConfig,
    postgres_pool: Option<PgPool>,
    redis_conn: Option<ConnectionManager>,
    token_signer: Arc<TokenSigner>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（外部连接带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        let postgres_pool = match (config.storage.backend, &config.storage.database) {
            (StorageBackend::Postgres, Some(database)) => {
                let pg_config = PostgresConfig::new(database.url.expose_secret().as_str())
                    .with_max_connections(database.max_connections);
                let pool = with_retry(&retry_config, "PostgreSQL connection", || {
                    let cfg = pg_config.clone();
                    async move { create_pool(&cfg).await }
                })
                .await?;
                info!(
                    max_connections = database.max_connections,
                    "PostgreSQL connection pool created"
                );
                Some(pool)
            }
            (StorageBackend::Postgres, None) => {
                return Err(AppError::internal("storage.database is not configured"));
            }
            (StorageBackend::Memory, _) => None,
        };

        let redis_conn = match (config.storage.sessions, &config.storage.redis) {
            (SessionBackend::Redis, Some(redis)) => {
                let conn = with_retry(&retry_config, "Redis connection", || {
                    let url = redis.url.expose_secret().clone();
                    async move { create_connection_manager(&url).await }
                })
                .await?;
                info!("Redis connection created");
                Some(conn)
            }
            (SessionBackend::Redis, None) => {
                return Err(AppError::internal("storage.redis is not configured"));
            }
            (SessionBackend::Same, _) => None,
        };

        let token_signer = Arc::new(build_token_signer(&config.jwt)?);

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
            token_signer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// PostgreSQL 连接池（仅 postgres 后端）
    pub fn postgres_pool(&self) -> Option<PgPool> {
        self.postgres_pool.clone()
    }

    /// Redis 连接管理器（仅 redis 会话后端）
    pub fn redis_connection_manager(&self) -> Option<ConnectionManager> {
        self.redis_conn.clone()
    }

    pub fn token_signer(&self) -> Arc<TokenSigner> {
        self.token_signer.clone()
    }

    /// 关闭连接池
    pub async fn close(&self) {
        if let Some(pool) = &self.postgres_pool {
            pool.close().await;
            info!("PostgreSQL connection pool closed");
        }
    }
}

/// 按 JWT 配置构建令牌签发器
pub fn build_token_signer(jwt: &JwtConfig) -> AppResult<TokenSigner> {
    Ok(TokenSigner::new(
        jwt.access_secret.expose_secret().as_bytes(),
        jwt.refresh_secret.expose_secret().as_bytes(),
        to_chrono(jwt.access_expires_in)?,
        to_chrono(jwt.refresh_expires_in)?,
        jwt.issuer.clone(),
    ))
}

fn to_chrono(lifetime: Lifetime) -> AppResult<chrono::Duration> {
    chrono::Duration::from_std(lifetime.as_duration())
        .map_err(|_| AppError::internal(format!("Token lifetime {} is out of range", lifetime)))
}
