//! 值编解码钩子
//!
//! 字符串值与哈希字段值在写入前统一经过 `encode`，读取后经过 `decode`

use std::fmt;

use kvbridge_errors::{AppError, AppResult};

/// zstd 帧魔数
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// 默认压缩级别
const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// 字节编解码器
pub trait Codec: Send + Sync + fmt::Debug {
    fn encode(&self, data: &[u8]) -> AppResult<Vec<u8>>;

    fn decode(&self, data: &[u8]) -> AppResult<Vec<u8>>;

    /// 是否改变存储字节（压缩后的值无法做服务端自增）
    fn is_compressing(&self) -> bool {
        true
    }
}

/// 原样透传
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn is_compressing(&self) -> bool {
        false
    }
}

/// zstd 压缩
///
/// 解码时仅处理带 zstd 魔数的帧，其余字节原样返回，
/// 因此未压缩写入的旧值仍可读取。
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        zstd::encode_all(data, self.level)
            .map_err(|e| AppError::internal(format!("zstd compression failed: {}", e)))
    }

    fn decode(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        if !data.starts_with(&ZSTD_MAGIC) {
            return Ok(data.to_vec());
        }
        zstd::decode_all(data)
            .map_err(|e| AppError::internal(format!("zstd decompression failed: {}", e)))
    }
}
