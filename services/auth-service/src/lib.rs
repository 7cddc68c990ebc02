//! auth-service - 凭证签发与会话管理
//!
//! 账户注册与登录、access / refresh 令牌签发、单次使用的 refresh token 轮换。

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::AuthService;
pub use error::{AuthError, AuthResult};
