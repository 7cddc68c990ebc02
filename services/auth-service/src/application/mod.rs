//! 应用层

mod auth_service;
pub mod dto;

pub use auth_service::AuthService;
pub use dto::*;
