//! 领域服务

mod credential_verifier;

pub use credential_verifier::*;
