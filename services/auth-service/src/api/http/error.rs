//! HTTP 错误响应

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;
use warden_errors::AppError;

use crate::error::{AuthError, FieldError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

/// HTTP 边界错误
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    App(AppError),
}

impl ApiError {
    pub fn validation(details: Vec<FieldError>) -> Self {
        Self::Auth(AuthError::Validation(details))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (app_error, details) = match self {
            Self::Auth(AuthError::Validation(details)) => {
                (AppError::validation("Validation failed"), Some(details))
            }
            Self::Auth(err) => (AppError::from(err), None),
            Self::App(err) => (err, None),
        };

        if app_error.is_fault() {
            error!(error = %app_error, "Request failed");
        }

        let status = StatusCode::from_u16(app_error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: app_error.public_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
