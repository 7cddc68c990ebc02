//! 领域层

pub mod account;
pub mod repositories;
pub mod services;
pub mod session;
pub mod value_objects;

pub use account::Account;
pub use session::RefreshSession;
