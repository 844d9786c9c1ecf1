//! kvbridge-adapter-redis - Redis 回退后端

mod backend;
mod connection;

pub use backend::*;
pub use connection::*;
