//! kvbridge-pipeline - 命令批量执行
//!
//! 动态命令名解析、类型化命令、统一回复类型与按入队顺序返回结果的 Pipeline

mod command;
mod dispatch;
mod pipeline;
mod reply;

pub use command::*;
pub use dispatch::*;
pub use pipeline::*;
pub use reply::*;
