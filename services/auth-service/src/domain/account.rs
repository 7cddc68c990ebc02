//! 账户实体

use chrono::{DateTime, Utc};
use warden_auth_core::Principal;
use warden_common::{AccountId, Role};

use super::value_objects::{Email, HashedPassword};

/// 账户
///
/// 本地账户持有密码哈希；联合身份账户只有外部 ID，没有密码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub password_hash: Option<HashedPassword>,
    pub external_id: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// 本地注册账户
    pub fn local(name: String, email: Email, password_hash: HashedPassword, role: Role) -> Self {
        Self {
            id: AccountId::new(),
            name,
            email,
            password_hash: Some(password_hash),
            external_id: None,
            role,
            created_at: Utc::now(),
        }
    }

    /// 外部身份提供方建立的账户
    pub fn federated(name: String, email: Email, external_id: String, role: Role) -> Self {
        Self {
            id: AccountId::new(),
            name,
            email,
            password_hash: None,
            external_id: Some(external_id),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}
