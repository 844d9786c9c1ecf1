//! 远程缓存适配器
//!
//! 将 Redis 命令翻译为远程缓存调用：
//! - 字符串键值映射为标量条目
//! - 哈希映射为字典条目
//! - TTL 统一换算为相对时长
//!
//! 远程错误不会以 `Err` 返回，而是作为错误事件上报，命令返回默认值。

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use kvbridge_common::{ExpireCondition, FlushMode, HashFields, Key, Okay, SetOptions, Value};
use kvbridge_errors::{AppError, AppResult, ErrorCode, ErrorEvent, Platform};
use kvbridge_ports::{
    CacheClient, CacheError, DeleteResponse, DictionaryFetchResponse, DictionaryGetFieldResponse,
    DictionaryGetFieldsResponse, DictionaryRemoveFieldsResponse, DictionarySetFieldsResponse,
    ErrorSink, FlushResponse, GetBatchResponse, GetResponse, IncrementResponse,
    ItemGetTtlResponse, RedisCommands, SetBatchResponse, SetIfAbsentResponse, SetResponse,
    UpdateTtlResponse,
};
use metrics::counter;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::handle::CacheHandle;

const PLATFORM: Platform = Platform::CacheBackend;

/// 错误事件广播容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 远程缓存适配器
pub struct RemoteCacheAdapter {
    client: Arc<dyn CacheClient>,
    handle: CacheHandle,
    sink: Option<Arc<dyn ErrorSink>>,
    events: broadcast::Sender<ErrorEvent>,
    closed: AtomicBool,
}

impl RemoteCacheAdapter {
    pub fn new(client: Arc<dyn CacheClient>, handle: CacheHandle) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            cache = %handle.cache_name(),
            compression = handle.use_compression(),
            timeout_ms = handle.timeout().map(|t| t.as_millis() as u64),
            "Remote cache adapter created"
        );
        Self {
            client,
            handle,
            sink: None,
            events,
            closed: AtomicBool::new(false),
        }
    }

    /// 注入错误事件接收端
    pub fn with_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// 订阅错误事件
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.events.subscribe()
    }

    pub fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn cache(&self) -> &str {
        self.handle.cache_name()
    }

    /// 执行一次命令：检查关闭状态、计数并应用超时
    async fn call<T, F>(&self, op: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.is_closed() {
            return Err(AppError::closed(op));
        }
        counter!("kvbridge_commands_total", "op" => op, "platform" => PLATFORM.as_str())
            .increment(1);
        debug!(op, cache = %self.cache(), "Cache command");

        match self.handle.timeout() {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(op, timeout_ms = limit.as_millis() as u64, "Cache command timed out");
                    Err(AppError::timeout(op, limit))
                }
            },
            None => fut.await,
        }
    }

    /// 上报错误事件：日志、计数、接收端与广播
    fn report(&self, event: ErrorEvent) -> ErrorEvent {
        warn!(
            platform = %event.platform,
            op = %event.op,
            code = ?event.code,
            msg = %event.msg,
            "Cache backend error"
        );
        counter!(
            "kvbridge_backend_errors_total",
            "op" => event.op.clone(),
            "platform" => PLATFORM.as_str()
        )
        .increment(1);
        if let Some(sink) = &self.sink {
            sink.emit(&event);
        }
        // 没有订阅者时发送失败
        let _ = self.events.send(event.clone());
        event
    }

    fn report_error(&self, op: &str, err: &CacheError) -> ErrorEvent {
        self.report(ErrorEvent::new(PLATFORM, op, err.message()).with_code(err.error_code()))
    }

    fn report_unexpected(&self, op: &str, response: &impl fmt::Debug) -> ErrorEvent {
        self.report(ErrorEvent::unexpected_response(
            PLATFORM,
            op,
            format!("{:?}", response),
        ))
    }

    fn encode(&self, value: &Value) -> AppResult<Vec<u8>> {
        self.handle.codec().encode(&value.to_bytes())
    }

    fn decode_text(&self, op: &str, bytes: &[u8]) -> Option<String> {
        match self.handle.codec().decode(bytes) {
            Ok(decoded) => Some(String::from_utf8_lossy(&decoded).into_owned()),
            Err(e) => {
                self.report(
                    ErrorEvent::new(PLATFORM, op, format!("malformed stored value: {}", e))
                        .with_code(ErrorCode::InternalServerError),
                );
                None
            }
        }
    }

    fn read_field(&self, op: &str, response: DictionaryGetFieldResponse) -> Option<String> {
        match response {
            DictionaryGetFieldResponse::Hit(bytes) => self.decode_text(op, &bytes),
            DictionaryGetFieldResponse::Miss => None,
            DictionaryGetFieldResponse::Error(e) => {
                self.report_error(op, &e);
                None
            }
            other => {
                self.report_unexpected(op, &other);
                None
            }
        }
    }

    fn read_value(&self, op: &str, response: GetResponse) -> Option<String> {
        match response {
            GetResponse::Hit(bytes) => self.decode_text(op, &bytes),
            GetResponse::Miss => None,
            GetResponse::Error(e) => {
                self.report_error(op, &e);
                None
            }
            other => {
                self.report_unexpected(op, &other);
                None
            }
        }
    }

    async fn remaining_ttl(&self, op: &str, key: &Key) -> Option<Duration> {
        match self.client.item_get_ttl(self.cache(), key.as_bytes()).await {
            ItemGetTtlResponse::Hit(remaining) => Some(remaining),
            ItemGetTtlResponse::Miss => None,
            ItemGetTtlResponse::Error(e) => {
                self.report_error(op, &e);
                None
            }
            other => {
                self.report_unexpected(op, &other);
                None
            }
        }
    }

    /// `expire`/`pexpire` 共用的条件更新
    async fn update_expiry(
        &self,
        op: &'static str,
        key: Key,
        milliseconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.call(op, async move {
            let ttl = Duration::from_millis(milliseconds);

            if let Some(condition) = condition {
                // 远程缓存的条目总有 TTL，NX 永远不成立
                if condition == ExpireCondition::Nx {
                    return Ok(0);
                }
                let Some(remaining) = self.remaining_ttl(op, &key).await else {
                    return Ok(0);
                };
                let allowed = match condition {
                    ExpireCondition::Xx => remaining > Duration::ZERO,
                    ExpireCondition::Gt => remaining < ttl,
                    ExpireCondition::Lt => remaining > ttl,
                    ExpireCondition::Nx => false,
                };
                if !allowed {
                    debug!(op, %condition, "Expiry condition not met");
                    return Ok(0);
                }
            }

            match self.client.update_ttl(self.cache(), key.as_bytes(), ttl).await {
                UpdateTtlResponse::Set => Ok(1),
                UpdateTtlResponse::Miss => Ok(0),
                UpdateTtlResponse::Error(e) => {
                    self.report_error(op, &e);
                    Ok(0)
                }
                other => {
                    self.report_unexpected(op, &other);
                    Ok(0)
                }
            }
        })
        .await
    }
}

impl fmt::Debug for RemoteCacheAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCacheAdapter")
            .field("handle", &self.handle)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RedisCommands for RemoteCacheAdapter {
    fn platform(&self) -> Platform {
        PLATFORM
    }

    async fn get(&self, key: Key) -> AppResult<Option<String>> {
        self.call("get", async move {
            let response = self.client.get(self.cache(), key.as_bytes()).await;
            Ok(self.read_value("get", response))
        })
        .await
    }

    async fn set(&self, key: Key, value: Value, options: SetOptions) -> AppResult<Option<Okay>> {
        self.call("set", async move {
            let directive = options.resolve()?;
            let bytes = self.encode(&value)?;

            if directive.only_if_absent {
                let op = "set-not-exists";
                return match self
                    .client
                    .set_if_absent(self.cache(), key.as_bytes(), bytes, directive.ttl)
                    .await
                {
                    SetIfAbsentResponse::Stored => Ok(Some(Okay)),
                    SetIfAbsentResponse::NotStored => Ok(None),
                    SetIfAbsentResponse::Error(e) => {
                        self.report_error(op, &e);
                        Ok(None)
                    }
                    other => {
                        self.report_unexpected(op, &other);
                        Ok(None)
                    }
                };
            }

            match self
                .client
                .set(self.cache(), key.as_bytes(), bytes, directive.ttl)
                .await
            {
                SetResponse::Success => Ok(Some(Okay)),
                SetResponse::Error(e) => {
                    self.report_error("set", &e);
                    Ok(None)
                }
                other => {
                    self.report_unexpected("set", &other);
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn del(&self, keys: Vec<Key>) -> AppResult<i64> {
        self.call("del", async move {
            let requested = keys.len() as i64;
            let responses = join_all(
                keys.iter()
                    .map(|key| self.client.delete(self.cache(), key.as_bytes())),
            )
            .await;

            for response in responses {
                match response {
                    DeleteResponse::Success => {}
                    DeleteResponse::Error(e) => {
                        self.report_error("del", &e);
                    }
                    other => {
                        self.report_unexpected("del", &other);
                    }
                }
            }
            Ok(requested)
        })
        .await
    }

    async fn hset(&self, key: Key, fields: HashFields) -> AppResult<i64> {
        self.call("hset", async move {
            if fields.is_empty() {
                return Err(AppError::wrong_arity("hset"));
            }
            let mut distinct: HashMap<Vec<u8>, Vec<u8>> = HashMap::with_capacity(fields.len());
            for (field, value) in fields.into_inner() {
                let encoded = self.encode(&value)?;
                distinct.insert(field.into_bytes(), encoded);
            }
            let count = distinct.len() as i64;

            match self
                .client
                .dictionary_set_fields(self.cache(), key.as_bytes(), distinct.into_iter().collect())
                .await
            {
                DictionarySetFieldsResponse::Success => Ok(count),
                DictionarySetFieldsResponse::Error(e) => {
                    self.report_error("hset", &e);
                    Ok(0)
                }
                other => {
                    self.report_unexpected("hset", &other);
                    Ok(0)
                }
            }
        })
        .await
    }

    async fn hget(&self, key: Key, field: Key) -> AppResult<Option<String>> {
        self.call("hget", async move {
            let response = self
                .client
                .dictionary_get_field(self.cache(), key.as_bytes(), field.as_bytes())
                .await;
            Ok(self.read_field("hget", response))
        })
        .await
    }

    async fn hmget(&self, key: Key, fields: Vec<Key>) -> AppResult<Vec<Option<String>>> {
        self.call("hmget", async move {
            let requested = fields.len();
            let fields: Vec<Vec<u8>> = fields.into_iter().map(Key::into_bytes).collect();

            match self
                .client
                .dictionary_get_fields(self.cache(), key.as_bytes(), &fields)
                .await
            {
                DictionaryGetFieldsResponse::Hit(responses) if responses.len() == requested => Ok(
                    responses
                        .into_iter()
                        .map(|response| self.read_field("hmget", response))
                        .collect(),
                ),
                DictionaryGetFieldsResponse::Miss => Ok(vec![None; requested]),
                DictionaryGetFieldsResponse::Error(e) => {
                    self.report_error("hmget", &e);
                    Ok(vec![None; requested])
                }
                other => {
                    self.report_unexpected("hmget", &other);
                    Ok(vec![None; requested])
                }
            }
        })
        .await
    }

    async fn hgetall(&self, key: Key) -> AppResult<HashMap<String, String>> {
        self.call("hgetall", async move {
            match self.client.dictionary_fetch(self.cache(), key.as_bytes()).await {
                DictionaryFetchResponse::Hit(pairs) => Ok(pairs
                    .into_iter()
                    .filter_map(|(field, value)| {
                        let value = self.decode_text("hgetall", &value)?;
                        Some((String::from_utf8_lossy(&field).into_owned(), value))
                    })
                    .collect()),
                DictionaryFetchResponse::Miss => Ok(HashMap::new()),
                DictionaryFetchResponse::Error(e) => {
                    self.report_error("hgetall", &e);
                    Ok(HashMap::new())
                }
                other => {
                    self.report_unexpected("hgetall", &other);
                    Ok(HashMap::new())
                }
            }
        })
        .await
    }

    async fn hdel(&self, key: Key, fields: Vec<Key>) -> AppResult<i64> {
        self.call("hdel", async move {
            let requested = fields.len() as i64;
            let fields: Vec<Vec<u8>> = fields.into_iter().map(Key::into_bytes).collect();

            match self
                .client
                .dictionary_remove_fields(self.cache(), key.as_bytes(), &fields)
                .await
            {
                DictionaryRemoveFieldsResponse::Success => Ok(requested),
                DictionaryRemoveFieldsResponse::Error(e) => {
                    self.report_error("hdel", &e);
                    Ok(0)
                }
                other => {
                    self.report_unexpected("hdel", &other);
                    Ok(0)
                }
            }
        })
        .await
    }

    async fn mset(&self, pairs: Vec<(Key, Value)>) -> AppResult<Okay> {
        self.call("mset", async move {
            if pairs.is_empty() {
                return Err(AppError::wrong_arity("mset"));
            }
            let mut items = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                items.push((key.into_bytes(), self.encode(&value)?));
            }

            match self.client.set_batch(self.cache(), items, None).await {
                SetBatchResponse::Success(responses) => {
                    for response in responses {
                        match response {
                            SetResponse::Success => {}
                            SetResponse::Error(e) => {
                                self.report_error("mset", &e);
                            }
                            other => {
                                self.report_unexpected("mset", &other);
                            }
                        }
                    }
                }
                SetBatchResponse::Error(e) => {
                    self.report_error("mset", &e);
                }
                other => {
                    self.report_unexpected("mset", &other);
                }
            }
            Ok(Okay)
        })
        .await
    }

    async fn mget(&self, keys: Vec<Key>) -> AppResult<Vec<Option<String>>> {
        self.call("mget", async move {
            if keys.is_empty() {
                return Err(AppError::wrong_arity("mget"));
            }
            let requested = keys.len();
            let keys: Vec<Vec<u8>> = keys.into_iter().map(Key::into_bytes).collect();

            match self.client.get_batch(self.cache(), &keys).await {
                GetBatchResponse::Success(responses) if responses.len() == requested => Ok(
                    responses
                        .into_iter()
                        .map(|response| self.read_value("mget", response))
                        .collect(),
                ),
                GetBatchResponse::Error(e) => {
                    self.report_error("mget", &e);
                    Ok(vec![None; requested])
                }
                other => {
                    self.report_unexpected("mget", &other);
                    Ok(vec![None; requested])
                }
            }
        })
        .await
    }

    async fn incr(&self, key: Key) -> AppResult<i64> {
        self.call("incr", async move {
            if self.handle.use_compression() {
                return Err(AppError::unsupported(
                    "incr",
                    "Increment is not supported when compression is enabled.",
                ));
            }

            match self.client.increment(self.cache(), key.as_bytes(), 1).await {
                IncrementResponse::Success(value) => Ok(value),
                IncrementResponse::Error(e) => Err(AppError::backend(self.report_error("incr", &e))),
                other => Err(AppError::backend(self.report_unexpected("incr", &other))),
            }
        })
        .await
    }

    async fn ttl(&self, key: Key) -> AppResult<Option<i64>> {
        self.call("ttl", async move {
            Ok(self
                .remaining_ttl("ttl", &key)
                .await
                .map(|remaining| i64::try_from(remaining.as_secs()).unwrap_or(i64::MAX)))
        })
        .await
    }

    async fn pttl(&self, key: Key) -> AppResult<Option<i64>> {
        self.call("pttl", async move {
            Ok(self
                .remaining_ttl("pttl", &key)
                .await
                .map(|remaining| i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX)))
        })
        .await
    }

    async fn pexpire(
        &self,
        key: Key,
        milliseconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.update_expiry("pexpire", key, milliseconds, condition).await
    }

    async fn expire(
        &self,
        key: Key,
        seconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.update_expiry("expire", key, seconds.saturating_mul(1000), condition)
            .await
    }

    async fn flushdb(&self, mode: Option<FlushMode>) -> AppResult<Okay> {
        self.call("flushdb", async move {
            debug!(mode = mode.map(|m| m.as_str()), "Flushing cache");
            match self.client.flush_cache(self.cache()).await {
                FlushResponse::Success => {}
                FlushResponse::Error(e) => {
                    self.report_error("flushdb", &e);
                }
                other => {
                    self.report_unexpected("flushdb", &other);
                }
            }
            Ok(Okay)
        })
        .await
    }

    async fn quit(&self) -> AppResult<Okay> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(Okay);
        }
        self.client.close().await;
        info!(cache = %self.cache(), "Remote cache adapter closed");
        Ok(Okay)
    }
}
