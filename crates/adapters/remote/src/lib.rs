//! kvbridge-adapter-remote - 远程缓存上的 Redis 命令适配器

mod adapter;
mod handle;

pub use adapter::*;
pub use handle::*;
