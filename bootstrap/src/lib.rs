//! warden-bootstrap - 服务启动骨架
//!
//! 运行时初始化、关闭信号与基础设施连接

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
