//! 应用层输入输出

use secrecy::Secret;
use serde::Serialize;
use std::fmt;
use warden_common::{AccountId, Role};

use crate::domain::value_objects::Email;

/// 注册成功的返回信息
pub const REGISTERED_MESSAGE: &str = "User registered successfully!";

/// 已校验的注册输入
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: Secret<String>,
}

/// 已校验的登录输入
#[derive(Debug)]
pub struct Credentials {
    pub email: Email,
    pub password: Secret<String>,
}

/// 外部身份提供方已验证的身份
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    pub email: Email,
    pub name: String,
    pub external_id: String,
}

/// 令牌对
///
/// `refresh_token` 是调用方唯一能拿到的原始令牌。
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// access token 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid { account_id: AccountId, role: Role },
    Invalid,
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}
