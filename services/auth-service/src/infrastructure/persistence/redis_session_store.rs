//! Redis 会话存储实现
//!
//! 会话以 JSON 存于 `refresh_session:{id}`，TTL 为距 `expires_at` 的秒数，
//! 过期由 Redis 自行回收。`DEL` 的返回值保证同一会话只能被删除一次。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use warden_adapter_redis::RedisCache;
use warden_common::SessionId;
use warden_errors::AppResult;

use crate::domain::RefreshSession;
use crate::domain::repositories::SessionStore;

pub const SESSION_KEY_PREFIX: &str = "refresh_session";

pub struct RedisSessionStore {
    cache: RedisCache,
}

impl RedisSessionStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self {
            cache: RedisCache::new(conn, SESSION_KEY_PREFIX),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn store(&self, session: &RefreshSession) -> AppResult<()> {
        let ttl = ttl_until(session.expires_at, Utc::now());
        self.cache
            .set_json(&session.id.to_string(), session, ttl)
            .await
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<RefreshSession>> {
        self.cache.get_json(&id.to_string()).await
    }

    async fn delete_by_id(&self, id: &SessionId) -> AppResult<bool> {
        self.cache.delete(&id.to_string()).await
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        // 依赖键 TTL
        Ok(0)
    }
}

/// 距过期的剩余时间，已过期时为零
fn ttl_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::ttl_until;
    use chrono::{Duration, Utc};

    #[test]
    fn test_ttl_until() {
        let now = Utc::now();
        assert_eq!(ttl_until(now + Duration::days(7), now).as_secs(), 7 * 24 * 3600);
        assert!(ttl_until(now - Duration::seconds(5), now).is_zero());
    }
}
