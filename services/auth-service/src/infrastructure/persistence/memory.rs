//! 内存存储实现
//!
//! 唯一性检查与删除都在同一把锁内完成，单进程内与数据库约束等价。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use warden_common::{AccountId, SessionId};
use warden_errors::{AppError, AppResult};

use crate::domain::repositories::{AccountDirectory, SessionStore};
use crate::domain::value_objects::Email;
use crate::domain::{Account, RefreshSession};

#[derive(Default)]
pub struct InMemoryAccountDirectory {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(accounts: &HashMap<AccountId, Account>, email: &Email) -> bool {
    accounts.values().any(|a| &a.email == email)
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        Ok(self.accounts.lock().get(id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .values()
            .find(|a| a.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut accounts = self.accounts.lock();
        if email_taken(&accounts, &account.email) {
            return Err(AppError::conflict("Email already exists"));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_federated(&self, account: &Account) -> AppResult<Account> {
        let mut accounts = self.accounts.lock();

        if let Some(existing) = accounts
            .values()
            .find(|a| a.external_id.is_some() && a.external_id == account.external_id)
        {
            return Ok(existing.clone());
        }
        if email_taken(&accounts, &account.email) {
            return Err(AppError::conflict("Email already exists"));
        }

        accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn count_accounts(&self) -> AppResult<u64> {
        Ok(self.accounts.lock().len() as u64)
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, RefreshSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn store(&self, session: &RefreshSession) -> AppResult<()> {
        self.sessions.lock().insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<RefreshSession>> {
        Ok(self.sessions.lock().get(id).cloned())
    }

    async fn delete_by_id(&self, id: &SessionId) -> AppResult<bool> {
        Ok(self.sessions.lock().remove(id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
