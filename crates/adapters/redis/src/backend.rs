//! Redis 回退后端
//!
//! 直接使用原生 Redis 命令实现 [`RedisCommands`]，错误分层与远程缓存适配器一致：
//! Redis 返回的错误作为错误事件上报，命令返回默认值。
//! 单机使用 `ConnectionManager`，集群使用 `cluster_async::ClusterConnection`。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kvbridge_common::{
    ExpireCondition, Expiry, FlushMode, HashFields, Key, Okay, SetOptions, Value,
};
use kvbridge_errors::{AppError, AppResult, ErrorCode, ErrorEvent, Platform};
use kvbridge_ports::{ErrorSink, RedisCommands};
use metrics::counter;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::cluster_async::ClusterConnection;
use redis::{Cmd, ErrorKind, FromRedisValue, RedisError, RedisResult};
use tracing::{debug, info, warn};

use crate::connection::{check_connection, create_cluster_connection, create_connection_manager};

const PLATFORM: Platform = Platform::FallbackBackend;

/// 将 Redis 错误映射为错误码
pub fn map_redis_error(err: &RedisError) -> ErrorCode {
    if err.is_timeout() {
        return ErrorCode::TimeoutError;
    }
    if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        return ErrorCode::ConnectionError;
    }
    match err.kind() {
        ErrorKind::AuthenticationFailed => ErrorCode::AuthenticationError,
        ErrorKind::ResponseError | ErrorKind::ExtensionError => ErrorCode::FailedPreconditionError,
        ErrorKind::BusyLoadingError | ErrorKind::TryAgain | ErrorKind::ClusterDown => {
            ErrorCode::ServerUnavailable
        }
        ErrorKind::TypeError => ErrorCode::InternalServerError,
        _ => ErrorCode::UnknownError,
    }
}

/// 构造 `SET` 命令，过期选项使用原生写法
pub fn set_command(key: &Key, value: &Value, options: &SetOptions) -> AppResult<Cmd> {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key.as_bytes()).arg(value.to_bytes());

    match options.expiry {
        None => {}
        Some(Expiry::Seconds(_) | Expiry::Milliseconds(_)) => {
            // 负数在此拒绝
            let directive = options.resolve()?;
            let millis = directive
                .ttl
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default();
            cmd.arg("PX").arg(millis);
        }
        Some(Expiry::UnixSeconds(ts)) => {
            cmd.arg("EXAT").arg(ts.max(0));
        }
        Some(Expiry::UnixMilliseconds(ts)) => {
            cmd.arg("PXAT").arg(ts.max(0));
        }
    }
    if options.only_if_absent {
        cmd.arg("NX");
    }
    Ok(cmd)
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

fn remaining_ttl(value: i64) -> Option<i64> {
    // -2 表示键不存在，-1 表示没有过期时间
    match value {
        -2 | -1 => None,
        t => Some(t),
    }
}

/// Redis 回退后端
pub struct RedisBackend<C = ConnectionManager> {
    conn: C,
    sink: Option<Arc<dyn ErrorSink>>,
    timeout: Option<Duration>,
    closed: AtomicBool,
}

/// Redis 集群回退后端
pub type RedisClusterBackend = RedisBackend<ClusterConnection>;

impl RedisBackend<ConnectionManager> {
    /// 连接到指定 Redis 并发送 PING 确认可用
    pub async fn connect(url: &str) -> AppResult<Self> {
        let mut conn = create_connection_manager(url).await?;
        check_connection(&mut conn).await?;
        info!("Redis fallback backend connected");
        Ok(Self::new(conn))
    }
}

impl RedisBackend<ClusterConnection> {
    /// 连接到 Redis 集群
    pub async fn connect_cluster(nodes: &[String]) -> AppResult<Self> {
        let mut conn = create_cluster_connection(nodes).await?;
        check_connection(&mut conn).await?;
        info!(nodes = nodes.len(), "Redis cluster fallback backend connected");
        Ok(Self::new(conn))
    }
}

impl<C> RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            sink: None,
            timeout: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 执行命令；外层 `Err` 为超时或已关闭，内层为 Redis 错误
    async fn run<T>(&self, op: &'static str, cmd: &Cmd) -> AppResult<RedisResult<T>>
    where
        T: FromRedisValue + Send,
    {
        if self.is_closed() {
            return Err(AppError::closed(op));
        }
        counter!("kvbridge_commands_total", "op" => op, "platform" => PLATFORM.as_str())
            .increment(1);
        debug!(op, "Redis command");

        let mut conn = self.conn.clone();
        let fut = cmd.query_async::<T>(&mut conn);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                warn!(op, timeout_ms = limit.as_millis() as u64, "Redis command timed out");
                AppError::timeout(op, limit)
            }),
            None => Ok(fut.await),
        }
    }

    fn report(&self, op: &str, err: &RedisError) -> ErrorEvent {
        let event = ErrorEvent::new(PLATFORM, op, err.to_string()).with_code(map_redis_error(err));
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
        event
    }

    /// Redis 错误上报后返回 `None`
    fn reported<T>(&self, op: &str, result: RedisResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(op, &e);
                None
            }
        }
    }

    async fn expire_with(
        &self,
        op: &'static str,
        key: Key,
        amount: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        let mut cmd = redis::cmd(if op == "expire" { "EXPIRE" } else { "PEXPIRE" });
        cmd.arg(key.as_bytes()).arg(amount);
        if let Some(condition) = condition {
            cmd.arg(condition.as_str());
        }
        let result = self.run::<i64>(op, &cmd).await?;
        Ok(self.reported(op, result).unwrap_or_default())
    }
}

#[async_trait]
impl<C> RedisCommands for RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    fn platform(&self) -> Platform {
        PLATFORM
    }

    async fn get(&self, key: Key) -> AppResult<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key.as_bytes());
        let result = self.run::<Option<Vec<u8>>>("get", &cmd).await?;
        Ok(self.reported("get", result).flatten().map(text))
    }

    async fn set(&self, key: Key, value: Value, options: SetOptions) -> AppResult<Option<Okay>> {
        let op = if options.only_if_absent { "set-not-exists" } else { "set" };
        let cmd = set_command(&key, &value, &options)?;
        let result = self.run::<Option<String>>(op, &cmd).await?;
        Ok(self.reported(op, result).flatten().map(|_| Okay))
    }

    async fn del(&self, keys: Vec<Key>) -> AppResult<i64> {
        let mut cmd = redis::cmd("DEL");
        for key in &keys {
            cmd.arg(key.as_bytes());
        }
        let result = self.run::<i64>("del", &cmd).await?;
        Ok(self.reported("del", result).unwrap_or_default())
    }

    async fn hset(&self, key: Key, fields: HashFields) -> AppResult<i64> {
        if fields.is_empty() {
            return Err(AppError::wrong_arity("hset"));
        }
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key.as_bytes());
        for (field, value) in fields.iter() {
            cmd.arg(field.as_bytes()).arg(value.to_bytes());
        }
        let result = self.run::<i64>("hset", &cmd).await?;
        Ok(self.reported("hset", result).unwrap_or_default())
    }

    async fn hget(&self, key: Key, field: Key) -> AppResult<Option<String>> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key.as_bytes()).arg(field.as_bytes());
        let result = self.run::<Option<Vec<u8>>>("hget", &cmd).await?;
        Ok(self.reported("hget", result).flatten().map(text))
    }

    async fn hmget(&self, key: Key, fields: Vec<Key>) -> AppResult<Vec<Option<String>>> {
        let requested = fields.len();
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key.as_bytes());
        for field in &fields {
            cmd.arg(field.as_bytes());
        }
        let result = self.run::<Vec<Option<Vec<u8>>>>("hmget", &cmd).await?;
        Ok(match self.reported("hmget", result) {
            Some(values) => values.into_iter().map(|v| v.map(text)).collect(),
            None => vec![None; requested],
        })
    }

    async fn hgetall(&self, key: Key) -> AppResult<HashMap<String, String>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key.as_bytes());
        let result = self.run::<HashMap<Vec<u8>, Vec<u8>>>("hgetall", &cmd).await?;
        Ok(self
            .reported("hgetall", result)
            .unwrap_or_default()
            .into_iter()
            .map(|(field, value)| (text(field), text(value)))
            .collect())
    }

    async fn hdel(&self, key: Key, fields: Vec<Key>) -> AppResult<i64> {
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key.as_bytes());
        for field in &fields {
            cmd.arg(field.as_bytes());
        }
        let result = self.run::<i64>("hdel", &cmd).await?;
        Ok(self.reported("hdel", result).unwrap_or_default())
    }

    async fn mset(&self, pairs: Vec<(Key, Value)>) -> AppResult<Okay> {
        if pairs.is_empty() {
            return Err(AppError::wrong_arity("mset"));
        }
        let mut cmd = redis::cmd("MSET");
        for (key, value) in &pairs {
            cmd.arg(key.as_bytes()).arg(value.to_bytes());
        }
        let result = self.run::<()>("mset", &cmd).await?;
        self.reported("mset", result);
        Ok(Okay)
    }

    async fn mget(&self, keys: Vec<Key>) -> AppResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Err(AppError::wrong_arity("mget"));
        }
        let requested = keys.len();
        let mut cmd = redis::cmd("MGET");
        for key in &keys {
            cmd.arg(key.as_bytes());
        }
        let result = self.run::<Vec<Option<Vec<u8>>>>("mget", &cmd).await?;
        Ok(match self.reported("mget", result) {
            Some(values) => values.into_iter().map(|v| v.map(text)).collect(),
            None => vec![None; requested],
        })
    }

    async fn incr(&self, key: Key) -> AppResult<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key.as_bytes());
        match self.run::<i64>("incr", &cmd).await? {
            Ok(value) => Ok(value),
            Err(e) => Err(AppError::backend(self.report("incr", &e))),
        }
    }

    async fn ttl(&self, key: Key) -> AppResult<Option<i64>> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key.as_bytes());
        let result = self.run::<i64>("ttl", &cmd).await?;
        Ok(self.reported("ttl", result).and_then(remaining_ttl))
    }

    async fn pttl(&self, key: Key) -> AppResult<Option<i64>> {
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(key.as_bytes());
        let result = self.run::<i64>("pttl", &cmd).await?;
        Ok(self.reported("pttl", result).and_then(remaining_ttl))
    }

    async fn pexpire(
        &self,
        key: Key,
        milliseconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.expire_with("pexpire", key, milliseconds, condition).await
    }

    async fn expire(
        &self,
        key: Key,
        seconds: u64,
        condition: Option<ExpireCondition>,
    ) -> AppResult<i64> {
        self.expire_with("expire", key, seconds, condition).await
    }

    async fn flushdb(&self, mode: Option<FlushMode>) -> AppResult<Okay> {
        let mut cmd = redis::cmd("FLUSHDB");
        if let Some(mode) = mode {
            cmd.arg(mode.as_str());
        }
        let result = self.run::<()>("flushdb", &cmd).await?;
        self.reported("flushdb", result);
        Ok(Okay)
    }

    async fn quit(&self) -> AppResult<Okay> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Redis fallback backend closed");
        }
        Ok(Okay)
    }
}
