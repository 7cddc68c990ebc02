//! warden-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `WARDEN_` 前缀环境变量
//! （层级用 `__` 分隔，例如 `WARDEN_JWT__ACCESS_EXPIRES_IN=30m`）。

mod lifetime;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

pub use lifetime::{Lifetime, LifetimeParseError};

const DEV_ACCESS_SECRET: &str = "access_secret_key";
const DEV_REFRESH_SECRET: &str = "refresh_secret_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// JWT 配置
///
/// access / refresh 使用两把独立的签名密钥。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub access_secret: Secret<String>,
    pub refresh_secret: Secret<String>,
    pub access_expires_in: Lifetime,
    pub refresh_expires_in: Lifetime,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: Secret::new(DEV_ACCESS_SECRET.to_string()),
            refresh_secret: Secret::new(DEV_REFRESH_SECRET.to_string()),
            access_expires_in: Lifetime::from_secs(15 * 60),
            refresh_expires_in: Lifetime::from_secs(7 * 24 * 60 * 60),
            issuer: "warden".to_string(),
        }
    }
}

/// Argon2 密码哈希参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        // 与 argon2 crate 的默认参数一致
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// 账户与会话的存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

/// 会话存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// 与账户使用同一后端
    #[default]
    Same,
    Redis,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sessions: SessionBackend,
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
}

/// 过期会话清理
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionCleanupConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SessionCleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    pub app_env: String,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordHashingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session_cleanup: SessionCleanupConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_name() -> String {
    "warden".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let config: Self = Self::figment(config_dir, &env).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 构建配置源（不做校验）
    pub fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Serialized::default("app_env", env))
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("WARDEN_").split("__"))
    }

    /// 校验配置的一致性
    ///
    /// 生产环境下拒绝开发默认密钥、空密钥以及 access/refresh 共用同一密钥。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let access = self.jwt.access_secret.expose_secret();
        let refresh = self.jwt.refresh_secret.expose_secret();

        if access.is_empty() || refresh.is_empty() {
            return Err(ConfigError::Invalid("JWT secrets must not be empty".into()));
        }

        if self.is_production() {
            if access == DEV_ACCESS_SECRET || refresh == DEV_REFRESH_SECRET {
                return Err(ConfigError::Invalid(
                    "development JWT secrets are not allowed in production".into(),
                ));
            }
            if access == refresh {
                return Err(ConfigError::Invalid(
                    "access and refresh tokens must use distinct secrets".into(),
                ));
            }
        }

        if self.storage.backend == StorageBackend::Postgres && self.storage.database.is_none() {
            return Err(ConfigError::Invalid(
                "storage.database is required for the postgres backend".into(),
            ));
        }

        if self.storage.sessions == SessionBackend::Redis && self.storage.redis.is_none() {
            return Err(ConfigError::Invalid(
                "storage.redis is required for redis sessions".into(),
            ));
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
