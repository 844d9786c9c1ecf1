//! 缓存句柄：缓存名、编解码器与单次调用超时

use std::sync::Arc;
use std::time::Duration;

use kvbridge_common::{Codec, IdentityCodec, ZstdCodec};

#[derive(Debug, Clone)]
pub struct CacheHandle {
    cache_name: String,
    codec: Arc<dyn Codec>,
    timeout: Option<Duration>,
}

impl CacheHandle {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            codec: Arc::new(IdentityCodec),
            timeout: None,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// 使用默认级别的 zstd 压缩
    pub fn with_compression(self) -> Self {
        self.with_codec(Arc::new(ZstdCodec::default()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn use_compression(&self) -> bool {
        self.codec.is_compressing()
    }
}
