//! 请求处理

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use warden_auth_core::require_role;
use warden_common::Role;

use super::error::ApiError;
use super::extractors::{AuthenticatedAccount, ValidatedJson};
use super::router::AppState;
use super::validation::{LoginRequest, RefreshRequest, RegisterRequest, VerifyRequest};
use crate::application::{REGISTERED_MESSAGE, TokenPair, VerifyOutcome};

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let registration = req.validate().map_err(ApiError::validation)?;
    state.auth.register(registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": REGISTERED_MESSAGE })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let credentials = req.validate().map_err(ApiError::validation)?;
    Ok(Json(state.auth.login(credentials).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let raw_token = req.validate().map_err(ApiError::validation)?;
    Ok(Json(state.auth.refresh(&raw_token).await?))
}

pub async fn verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyRequest>,
) -> Result<Response, ApiError> {
    let token = req.validate().map_err(ApiError::validation)?;

    let response = match state.auth.verify_access(&token) {
        VerifyOutcome::Valid { account_id, role } => (
            StatusCode::OK,
            Json(json!({ "valid": true, "accountId": account_id, "role": role })),
        ),
        VerifyOutcome::Invalid => (StatusCode::UNAUTHORIZED, Json(json!({ "valid": false }))),
    };
    Ok(response.into_response())
}

pub async fn me(caller: AuthenticatedAccount) -> Json<Value> {
    Json(json!({ "accountId": caller.account_id, "role": caller.role }))
}

pub async fn admin_ping(caller: AuthenticatedAccount) -> Result<Json<Value>, ApiError> {
    require_role!(caller, at_least: Role::Admin);
    Ok(Json(json!({ "pong": true, "role": caller.role })))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
