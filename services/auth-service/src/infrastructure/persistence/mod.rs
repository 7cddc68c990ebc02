//! 持久化实现

mod memory;
mod postgres_account_directory;
mod postgres_session_store;
mod redis_session_store;
pub mod schema;

pub use memory::*;
pub use postgres_account_directory::*;
pub use postgres_session_store::*;
pub use redis_session_store::*;
