//! 数据库结构迁移

use sqlx::PgPool;
use warden_adapter_postgres::{Migration, MigrationManager, MigrationReport};
use warden_errors::AppResult;

const CREATE_ACCOUNTS: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(320) NOT NULL,
    password_hash TEXT,
    external_id VARCHAR(255),
    role VARCHAR(32) NOT NULL DEFAULT 'user',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT accounts_email_key UNIQUE (email),
    CONSTRAINT accounts_external_id_key UNIQUE (external_id),
    CONSTRAINT accounts_role_check CHECK (role IN ('user', 'admin', 'superadmin'))
);
"#;

const CREATE_REFRESH_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS refresh_sessions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL,
    token_hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_refresh_sessions_expires_at ON refresh_sessions (expires_at);
CREATE INDEX IF NOT EXISTS idx_refresh_sessions_account_id ON refresh_sessions (account_id);
"#;

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_accounts", CREATE_ACCOUNTS),
        Migration::new(2, "create_refresh_sessions", CREATE_REFRESH_SESSIONS),
    ]
}

/// 应用全部迁移
pub async fn run_migrations(pool: &PgPool) -> AppResult<MigrationReport> {
    MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await
}
