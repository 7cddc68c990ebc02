//! 请求提取器

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;
use warden_common::{AccountId, Role};
use warden_errors::AppError;

use super::error::ApiError;
use super::router::AppState;
use crate::application::VerifyOutcome;
use crate::error::FieldError;

/// JSON 请求体
///
/// 与 `axum::Json` 相同，但解析失败时按字段校验错误返回 400。
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "Rejected request body");
                Err(ApiError::validation(vec![FieldError::new(
                    "body",
                    body_rejection_message(&rejection),
                )]))
            }
        }
    }
}

fn body_rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonDataError(_) => "Request body has missing or mistyped fields",
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
        JsonRejection::MissingJsonContentType(_) => "Expected Content-Type: application/json",
        _ => "Request body could not be read",
    }
}

/// 已通过 access token 认证的调用方
///
/// ```rust,ignore
/// async fn handler(caller: AuthenticatedAccount) -> Result<Json<Value>, ApiError> {
///     require_role!(caller, at_least: Role::Admin);
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
    pub role: Role,
}

impl FromRequestParts<AppState> for AuthenticatedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Access token required"))?;

        match state.auth.verify_access(token) {
            VerifyOutcome::Valid { account_id, role } => Ok(Self { account_id, role }),
            VerifyOutcome::Invalid => {
                debug!("Rejected bearer token");
                Err(AppError::unauthorized("Invalid or expired token").into())
            }
        }
    }
}
