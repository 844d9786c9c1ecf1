//! kvbridge-adapter-memory - 进程内远程缓存实现
//!
//! 行为与远程缓存服务保持一致，用于本地开发与测试

mod client;

pub use client::*;
