//! 刷新会话
//!
//! 每个已签发的 refresh token 对应一条记录。记录被删除即表示
//! 令牌已被轮换或撤销，不存在“已使用”标记。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_auth_core::IssuedRefreshToken;
use warden_common::{AccountId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    pub id: SessionId,
    pub account_id: AccountId,
    /// refresh token 的摘要，原始令牌从不落库
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    pub fn from_issued(issued: &IssuedRefreshToken, token_hash: String) -> Self {
        Self {
            id: issued.id,
            account_id: issued.account_id,
            token_hash,
            created_at: issued.created_at,
            expires_at: issued.expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> RefreshSession {
        let now = Utc::now();
        RefreshSession {
            id: SessionId::random(),
            account_id: AccountId::new(),
            token_hash: "digest".into(),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let s = session(Duration::minutes(5));
        assert!(!s.is_expired_at(s.created_at));
        assert!(s.is_expired_at(s.expires_at));
        assert!(s.is_expired_at(s.expires_at + Duration::seconds(1)));
    }
}
