//! ports - 抽象 trait 层
//!
//! 远程缓存操作集、Redis 兼容命令面与错误事件出口

mod cache;
mod commands;
mod sink;

pub use cache::*;
pub use commands::*;
pub use sink::*;
