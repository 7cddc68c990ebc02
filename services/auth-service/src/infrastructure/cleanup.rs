//! 过期会话定期清理

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use warden_errors::AppResult;

use crate::domain::repositories::SessionStore;

pub struct SessionSweeper {
    sessions: Arc<dyn SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn SessionStore>, interval: Duration) -> Self {
        Self { sessions, interval }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Session sweeper started");
            let mut ticker = interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!(error = %e, "Failed to sweep expired sessions");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        break;
                    }
                }
            }
            info!("Session sweeper stopped");
        })
    }

    /// 执行一次清理，返回删除数量
    pub async fn sweep_once(&self) -> AppResult<u64> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            metrics::counter!("auth_sessions_swept_total").increment(removed);
            info!(removed, "Expired sessions swept");
        } else {
            debug!("No expired sessions");
        }
        Ok(removed)
    }
}
