//! 基础设施层

pub mod cleanup;
pub mod events;
pub mod persistence;
