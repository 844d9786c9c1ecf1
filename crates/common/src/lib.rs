//! common - 通用类型和工具库
//!
//! 键、值、过期指令与编解码钩子

pub mod codec;
pub mod ttl;
pub mod types;
pub mod utils;

pub use codec::*;
pub use ttl::*;
pub use types::*;
pub use utils::*;
