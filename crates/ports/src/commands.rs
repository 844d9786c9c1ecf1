//! Redis 兼容命令 trait 定义
//!
//! 远程缓存适配器与 Redis 回退后端都实现该 trait，调用方可以无感切换

use std::collections::HashMap;

use async_trait::async_trait;
use kvbridge_common::{ExpireCondition, FlushMode, HashFields, Key, Okay, SetOptions, Value};
use kvbridge_errors::{AppResult, Platform};

/// Redis 命令面
///
/// `Err` 只用于调用方错误、超时与已关闭；后端错误通过错误事件上报，
/// 调用返回默认值。
#[async_trait]
pub trait RedisCommands: Send + Sync {
    /// 错误事件中的平台标签
    fn platform(&self) -> Platform;

    async fn get(&self, key: Key) -> AppResult<Option<String>>;

    async fn set(&self, key: Key, value: Value, options: SetOptions) -> AppResult<Option<Okay>>;

    /// 返回删除计数；远程缓存适配器返回请求删除的键数量
    async fn del(&self, keys: Vec<Key>) -> AppResult<i64>;

    async fn hset(&self, key: Key, fields: HashFields) -> AppResult<i64>;

    async fn hmset(&self, key: Key, fields: HashFields) -> AppResult<Okay> {
        self.hset(key, fields).await?;
        Ok(Okay)
    }

    async fn hget(&self, key: Key, field: Key) -> AppResult<Option<String>>;

    async fn hmget(&self, key: Key, fields: Vec<Key>) -> AppResult<Vec<Option<String>>>;

    async fn hgetall(&self, key: Key) -> AppResult<HashMap<String, String>>;

    async fn hdel(&self, key: Key, fields: Vec<Key>) -> AppResult<i64>;

    async fn mset(&self, pairs: Vec<(Key, Value)>) -> AppResult<Okay>;

    async fn mget(&self, keys: Vec<Key>) -> AppResult<Vec<Option<String>>>;

    async fn incr(&self, key: Key) -> AppResult<i64>;

    /// 剩余 TTL（秒）
    async fn ttl(&self, key: Key) -> AppResult<Option<i64>>;

    /// 剩余 TTL（毫秒）
    async fn pttl(&self, key: Key) -> AppResult<Option<i64>>;

    async fn pexpire(
        &self,
        key: Key,
        milliseconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64>;

    async fn expire(
        &self,
        key: Key,
        seconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.pexpire(key, seconds.saturating_mul(1000), condition).await
    }

    async fn flushdb(&self, mode: Option<FlushMode>) -> AppResult<Okay>;

    async fn quit(&self) -> AppResult<Okay>;
}
