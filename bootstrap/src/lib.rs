//! kvbridge-bootstrap - 后端装配
//!
//! 根据 [`BridgeConfig`] 选择远程缓存或 Redis 回退后端

mod backend;
mod retry;
mod runtime;

pub use backend::*;
pub use retry::*;
pub use runtime::*;

pub use kvbridge_config::BridgeConfig;
pub use kvbridge_pipeline::{Pipeline, PipelineExt, PipelineResult, Reply};
pub use kvbridge_ports::RedisCommands;
