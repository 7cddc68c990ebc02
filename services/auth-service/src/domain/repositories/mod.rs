//! Repository traits

mod account_directory;
mod session_store;

pub use account_directory::*;
pub use session_store::*;
