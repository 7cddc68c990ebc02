//! 账户目录 trait

use async_trait::async_trait;
use warden_common::AccountId;
use warden_errors::AppResult;

use crate::domain::Account;
use crate::domain::value_objects::Email;

/// 账户目录
///
/// email 唯一性必须由存储层原子地保证；重复时返回 `AppError::Conflict`。
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>>;

    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>>;

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Account>>;

    /// 插入本地账户
    async fn insert(&self, account: &Account) -> AppResult<()>;

    /// 插入联合身份账户，返回存储后的账户
    ///
    /// 若同一 external_id 已被并发写入，返回已存在的那条记录。
    async fn insert_federated(&self, account: &Account) -> AppResult<Account>;

    /// 账户总数（仅用于首个账户提升为 superadmin）
    async fn count_accounts(&self) -> AppResult<u64>;
}
