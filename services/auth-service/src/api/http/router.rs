//! 路由

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::application::AuthService;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/verify", post(handlers::verify))
        .route("/auth/me", get(handlers::me))
        .route("/admin/ping", get(handlers::admin_ping))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
