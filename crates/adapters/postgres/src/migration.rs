//! PostgreSQL 迁移管理
//!
//! 迁移按版本号顺序执行，每个迁移与其记录在同一事务内提交。
//! 已应用迁移的 SQL 若被修改，校验和不匹配时拒绝继续。

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};
use warden_errors::{AppError, AppResult};

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: &'static str, up_sql: &'static str) -> Self {
        Self {
            version,
            name,
            up_sql,
            checksum: hex::encode(Sha256::digest(up_sql.as_bytes())),
        }
    }
}

/// 迁移结果
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_warden_migrations".to_string(),
        }
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list migrations: {}", e)))
    }

    /// 应用单个迁移
    async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
            self.table_name
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(migration.name)
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = migration.name,
            "Migration applied"
        );
        Ok(())
    }

    /// 应用所有待处理的迁移
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationReport> {
        self.init().await?;

        let applied = self.applied_migrations().await?;
        let mut report = MigrationReport::default();

        let mut pending: Vec<_> = migrations.iter().collect();
        pending.sort_by_key(|m| m.version);

        for migration in pending {
            match applied.iter().find(|r| r.version == migration.version) {
                Some(record) if record.checksum != migration.checksum => {
                    warn!(
                        version = migration.version,
                        name = migration.name,
                        "Migration checksum mismatch"
                    );
                    return Err(AppError::internal(format!(
                        "Migration {} ({}) has been modified after it was applied",
                        migration.version, migration.name
                    )));
                }
                Some(_) => report.skipped.push(migration.version),
                None => {
                    self.apply(migration).await?;
                    report.applied.push(migration.version);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_sha256_hex() {
        let m = Migration::new(1, "create_accounts", "CREATE TABLE accounts (id UUID)");
        assert_eq!(m.checksum.len(), 64);
        assert!(m.checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_checksum_tracks_sql() {
        let a = Migration::new(1, "t", "CREATE TABLE a (id INT)");
        let b = Migration::new(1, "t", "CREATE TABLE a (id INT)");
        let c = Migration::new(1, "t", "CREATE TABLE c (id INT)");

        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
    }
}
