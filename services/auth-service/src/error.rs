//! 服务错误定义

use serde::Serialize;
use thiserror::Error;
use warden_errors::AppError;

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 认证业务错误
///
/// 除 `Infrastructure` 外均为调用方可恢复的业务失败，不按系统错误记录。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Account already exists")]
    AccountExists,

    #[error("Account not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Refresh token not found or already rotated")]
    TokenNotFoundOrAlreadyRotated,

    #[error("Refresh token expired")]
    TokenExpired,

    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// 是否为业务失败（非基础设施故障）
    pub fn is_business(&self) -> bool {
        !matches!(self, Self::Infrastructure(_))
    }

    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AccountExists => "account_exists",
            Self::NotFound => "not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::TokenNotFoundOrAlreadyRotated => "already_rotated",
            Self::TokenExpired => "expired",
            Self::Infrastructure(_) => "error",
        }
    }
}

/// HTTP 边界的折叠映射
///
/// 账户不存在与密码错误对外不可区分；所有令牌失败统一为 "Invalid token"。
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(_) => AppError::validation("Validation failed"),
            AuthError::AccountExists => AppError::conflict("Account already exists"),
            AuthError::NotFound | AuthError::InvalidCredentials => {
                AppError::unauthorized("Invalid credentials")
            }
            AuthError::InvalidToken
            | AuthError::TokenNotFoundOrAlreadyRotated
            | AuthError::TokenExpired => AppError::unauthorized("Invalid token"),
            AuthError::Infrastructure(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let not_found: AppError = AuthError::NotFound.into();
        let bad_password: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(not_found.to_string(), bad_password.to_string());
        assert_eq!(not_found.status_code(), 401);
    }

    #[test]
    fn test_token_failures_are_indistinguishable() {
        let messages: Vec<String> = [
            AuthError::InvalidToken,
            AuthError::TokenNotFoundOrAlreadyRotated,
            AuthError::TokenExpired,
        ]
        .into_iter()
        .map(|e| AppError::from(e).public_message())
        .collect();

        assert!(messages.iter().all(|m| m == "Invalid token"));
    }

    #[test]
    fn test_business_vs_infrastructure() {
        assert!(AuthError::AccountExists.is_business());
        assert!(AuthError::TokenExpired.is_business());

        let fault = AuthError::from(AppError::database("pool timed out"));
        assert!(!fault.is_business());
        assert_eq!(fault.outcome(), "error");
        assert_eq!(AppError::from(fault).status_code(), 500);
    }
}
