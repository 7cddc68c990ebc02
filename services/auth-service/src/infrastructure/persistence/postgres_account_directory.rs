//! PostgreSQL 账户目录实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use warden_adapter_postgres::map_sqlx_error;
use warden_common::{AccountId, Role};
use warden_errors::{AppError, AppResult};

use crate::domain::Account;
use crate::domain::repositories::AccountDirectory;
use crate::domain::value_objects::{Email, HashedPassword};

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, external_id, role, created_at";

pub struct PostgresAccountDirectory {
    pool: PgPool,
}

impl PostgresAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE {} = $1", ACCOUNT_COLUMNS, column);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find account", e))?;

        row.map(AccountRow::into_account).transpose()
    }
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>> {
        self.find_one("email", email.as_str()).await
    }

    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find account", e))?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Account>> {
        self.find_one("external_id", external_id).await
    }

    async fn insert(&self, account: &Account) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, password_hash, external_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.0)
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(account.password_hash.as_ref().map(HashedPassword::as_str))
        .bind(account.external_id.as_deref())
        .bind(account.role.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert account", e))?;

        Ok(())
    }

    async fn insert_federated(&self, account: &Account) -> AppResult<Account> {
        let external_id = account
            .external_id
            .as_deref()
            .ok_or_else(|| AppError::internal("Federated account without external_id"))?;

        let sql = format!(
            r#"
            INSERT INTO accounts (id, name, email, password_hash, external_id, role, created_at)
            VALUES ($1, $2, $3, NULL, $4, $5, $6)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id.0)
            .bind(&account.name)
            .bind(account.email.as_str())
            .bind(external_id)
            .bind(account.role.as_str())
            .bind(account.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to insert federated account", e))?;

        match inserted {
            Some(row) => row.into_account(),
            // 并发请求已写入同一 external_id
            None => self
                .find_by_external_id(external_id)
                .await?
                .ok_or_else(|| AppError::database("Federated account vanished after conflict")),
        }
    }

    async fn count_accounts(&self) -> AppResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count accounts", e))?;

        Ok(count.max(0) as u64)
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    external_id: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> AppResult<Account> {
        let email = Email::new(self.email)
            .map_err(|e| AppError::database(format!("Corrupt account row {}: {}", self.id, e)))?;
        let role: Role = self
            .role
            .parse()
            .map_err(|e| AppError::database(format!("Corrupt account row {}: {}", self.id, e)))?;

        Ok(Account {
            id: AccountId::from_uuid(self.id),
            name: self.name,
            email,
            password_hash: self.password_hash.map(HashedPassword::new),
            external_id: self.external_id,
            role,
            created_at: self.created_at,
        })
    }
}
