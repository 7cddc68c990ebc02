//! PostgreSQL 会话存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use warden_adapter_postgres::map_sqlx_error;
use warden_common::{AccountId, SessionId};
use warden_errors::AppResult;

use crate::domain::RefreshSession;
use crate::domain::repositories::SessionStore;

pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn store(&self, session: &RefreshSession) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (id, account_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id.0)
        .bind(session.account_id.0)
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to store refresh session", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<RefreshSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, account_id, token_hash, created_at, expires_at
            FROM refresh_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find refresh session", e))?;

        Ok(row.map(Into::into))
    }

    async fn delete_by_id(&self, id: &SessionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete refresh session", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete expired sessions", e))?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    account_id: Uuid,
    token_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for RefreshSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: SessionId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
