//! 远程缓存 trait 定义
//!
//! 每个操作返回一个带标签的响应枚举。响应枚举均为 `#[non_exhaustive]`，
//! 调用方必须处理未知变体。

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use kvbridge_errors::ErrorCode;

/// 远程缓存返回的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError {
    pub code: ErrorCode,
    pub message: String,
}

impl CacheError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GetResponse {
    Hit(Vec<u8>),
    Miss,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SetResponse {
    Success,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SetIfAbsentResponse {
    Stored,
    NotStored,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DeleteResponse {
    Success,
    Error(CacheError),
}

/// 批量读取，结果顺序与请求键顺序一致
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GetBatchResponse {
    Success(Vec<GetResponse>),
    Error(CacheError),
}

/// 批量写入，结果顺序与请求顺序一致
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SetBatchResponse {
    Success(Vec<SetResponse>),
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum IncrementResponse {
    Success(i64),
    Error(CacheError),
}

/// 剩余 TTL
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ItemGetTtlResponse {
    Hit(Duration),
    Miss,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum UpdateTtlResponse {
    Set,
    Miss,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DictionarySetFieldsResponse {
    Success,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DictionaryGetFieldResponse {
    Hit(Vec<u8>),
    Miss,
    Error(CacheError),
}

/// 多字段读取，`Hit` 中每个元素对应一个请求字段
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DictionaryGetFieldsResponse {
    Hit(Vec<DictionaryGetFieldResponse>),
    Miss,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DictionaryFetchResponse {
    Hit(Vec<(Vec<u8>, Vec<u8>)>),
    Miss,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DictionaryRemoveFieldsResponse {
    Success,
    Error(CacheError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FlushResponse {
    Success,
    Error(CacheError),
}

/// 远程缓存客户端
///
/// `ttl` 为 `None` 时使用客户端默认 TTL
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, cache_name: &str, key: &[u8]) -> GetResponse;

    async fn set(
        &self,
        cache_name: &str,
        key: &[u8],
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> SetResponse;

    async fn set_if_absent(
        &self,
        cache_name: &str,
        key: &[u8],
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> SetIfAbsentResponse;

    async fn delete(&self, cache_name: &str, key: &[u8]) -> DeleteResponse;

    async fn get_batch(&self, cache_name: &str, keys: &[Vec<u8>]) -> GetBatchResponse;

    async fn set_batch(
        &self,
        cache_name: &str,
        items: Vec<(Vec<u8>, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> SetBatchResponse;

    async fn increment(&self, cache_name: &str, key: &[u8], amount: i64) -> IncrementResponse;

    async fn item_get_ttl(&self, cache_name: &str, key: &[u8]) -> ItemGetTtlResponse;

    async fn update_ttl(&self, cache_name: &str, key: &[u8], ttl: Duration) -> UpdateTtlResponse;

    async fn dictionary_set_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> DictionarySetFieldsResponse;

    async fn dictionary_get_field(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        field: &[u8],
    ) -> DictionaryGetFieldResponse;

    async fn dictionary_get_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: &[Vec<u8>],
    ) -> DictionaryGetFieldsResponse;

    async fn dictionary_fetch(&self, cache_name: &str, dictionary: &[u8]) -> DictionaryFetchResponse;

    async fn dictionary_remove_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: &[Vec<u8>],
    ) -> DictionaryRemoveFieldsResponse;

    async fn flush_cache(&self, cache_name: &str) -> FlushResponse;

    /// 释放底层连接
    async fn close(&self) {}
}
