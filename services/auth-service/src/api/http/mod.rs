//! HTTP 接口（axum）

mod error;
mod extractors;
mod handlers;
mod router;
pub mod validation;

pub use error::ApiError;
pub use extractors::{AuthenticatedAccount, ValidatedJson};
pub use router::{AppState, router};
