//! Redis JSON 缓存
//!
//! 值以 JSON 存储，带 TTL 写入；删除返回是否真正删除了键，
//! 可用作并发下的单赢家判断。

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use warden_errors::{AppError, AppResult};

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    /// 带前缀的完整键名
    pub fn key(&self, id: &str) -> String {
        namespaced_key(&self.prefix, id)
    }

    /// 写入 JSON 值并设置 TTL（最少 1 秒）
    pub async fn set_json<T: Serialize + Sync>(
        &self,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Failed to encode cache value: {}", e)))?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(id), payload, ttl.as_secs().max(1))
            .await
            .map_err(|e| AppError::external_service(format!("Redis set failed: {}", e)))
    }

    /// 读取 JSON 值
    pub async fn get_json<T: DeserializeOwned>(&self, id: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.key(id))
            .await
            .map_err(|e| AppError::external_service(format!("Redis get failed: {}", e)))?;

        raw.map(|payload| {
            serde_json::from_str(&payload)
                .map_err(|e| AppError::internal(format!("Failed to decode cache value: {}", e)))
        })
        .transpose()
    }

    /// 删除键，返回是否确实删除
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(self.key(id))
            .await
            .map_err(|e| AppError::external_service(format!("Redis delete failed: {}", e)))?;
        Ok(removed > 0)
    }
}

fn namespaced_key(prefix: &str, id: &str) -> String {
    format!("{}:{}", prefix, id)
}
