//! 领域事件发布
//!
//! 发布在状态变更成功之后进行，发布本身不会让业务操作失败。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_common::{AccountId, Role, SessionId};

/// 认证领域事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AuthDomainEvent {
    AccountRegistered {
        account_id: AccountId,
        email: String,
        role: Role,
        federated: bool,
        timestamp: DateTime<Utc>,
    },
    SessionIssued {
        account_id: AccountId,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
    SessionRotated {
        account_id: AccountId,
        previous_session_id: SessionId,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
}

impl AuthDomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AccountRegistered { .. } => "AccountRegistered",
            Self::SessionIssued { .. } => "SessionIssued",
            Self::SessionRotated { .. } => "SessionRotated",
        }
    }

    pub fn account_id(&self) -> AccountId {
        match self {
            Self::AccountRegistered { account_id, .. }
            | Self::SessionIssued { account_id, .. }
            | Self::SessionRotated { account_id, .. } => *account_id,
        }
    }
}

/// 事件发布器 trait
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AuthDomainEvent);
}

/// 内存事件总线（测试用）
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    events: Arc<RwLock<Vec<AuthDomainEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuthDomainEvent> {
        self.events.read().await.clone()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: AuthDomainEvent) {
        self.events.write().await.push(event);
    }
}

/// NoOp 事件发布器
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: AuthDomainEvent) {}
}

/// 日志事件发布器
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: AuthDomainEvent) {
        tracing::info!(
            event_type = event.event_type(),
            account_id = %event.account_id(),
            "Domain event published"
        );
    }
}
