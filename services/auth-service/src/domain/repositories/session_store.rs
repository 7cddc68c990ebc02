//! 会话存储 trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use warden_common::SessionId;
use warden_errors::AppResult;

use crate::domain::RefreshSession;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store(&self, session: &RefreshSession) -> AppResult<()>;

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<RefreshSession>>;

    /// 删除会话，返回本次调用是否真正删除了记录
    ///
    /// 记录不存在时返回 `Ok(false)`。同一 ID 的并发删除只能有一个得到 `true`。
    async fn delete_by_id(&self, id: &SessionId) -> AppResult<bool>;

    /// 清理 `expires_at <= now` 的会话，返回删除数量
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
