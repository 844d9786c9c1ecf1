//! 命令管道
//!
//! 命令在入队时即提交执行，`exec` 只按入队顺序等待结果。
//! `exec` 消费管道本身，执行后无法再次入队。

use std::fmt;
use std::sync::Arc;

use kvbridge_common::{ExpireCondition, FlushMode, HashFields, Key, SetOptions, Value};
use kvbridge_errors::{AppError, AppResult};
use kvbridge_ports::RedisCommands;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::command::{Command, CommandName};
use crate::dispatch::dispatch;
use crate::reply::Reply;

/// 单条结果：`(错误, 回复)`，出错时回复为 `Nil`
pub type PipelineResult = (Option<AppError>, Reply);

/// 已入队命令
#[derive(Debug)]
enum Slot {
    Running(JoinHandle<AppResult<Reply>>),
    Failed(AppError),
}

/// 命令管道
///
/// 入队需要在 Tokio 运行时内进行。
pub struct Pipeline<C: RedisCommands + ?Sized + 'static> {
    client: Arc<C>,
    slots: Vec<Slot>,
}

impl<C: RedisCommands + ?Sized + 'static> Pipeline<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            slots: Vec::new(),
        }
    }

    /// 按命令名入队
    ///
    /// 未知命令名直接返回错误；参数错误记录在该命令的结果槽位上。
    pub fn enqueue<I>(&mut self, name: &str, args: I) -> AppResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let name: CommandName = name.parse()?;
        let args: Vec<Value> = args.into_iter().map(Into::into).collect();
        match Command::parse(name, args) {
            Ok(command) => Ok(self.push(command)),
            Err(err) => {
                debug!(command = %name, error = %err, "Queued command failed to parse");
                self.slots.push(Slot::Failed(err));
                Ok(self)
            }
        }
    }

    /// 批量入队，每项为 `[命令名, 参数...]`
    pub fn add_batch<I>(&mut self, commands: I) -> AppResult<&mut Self>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        for command in commands {
            let mut parts = command.into_iter();
            let name = parts
                .next()
                .map(|v| v.as_text().into_owned())
                .unwrap_or_default();
            self.enqueue(&name, parts)?;
        }
        Ok(self)
    }

    /// 入队类型化命令
    pub fn push(&mut self, command: Command) -> &mut Self {
        let client = Arc::clone(&self.client);
        let handle = tokio::spawn(async move { dispatch(client.as_ref(), command).await });
        self.slots.push(Slot::Running(handle));
        self
    }

    pub fn get(&mut self, key: impl Into<Key>) -> &mut Self {
        self.push(Command::Get { key: key.into() })
    }

    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> &mut Self {
        self.set_with(key, value, SetOptions::default())
    }

    pub fn set_with(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> &mut Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
            options,
        })
    }

    pub fn del<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>) -> &mut Self {
        self.push(Command::Del {
            keys: keys.into_iter().map(Into::into).collect(),
        })
    }

    pub fn hset(&mut self, key: impl Into<Key>, fields: impl Into<HashFields>) -> &mut Self {
        self.push(Command::Hset {
            key: key.into(),
            fields: fields.into(),
        })
    }

    pub fn hmset(&mut self, key: impl Into<Key>, fields: impl Into<HashFields>) -> &mut Self {
        self.push(Command::Hmset {
            key: key.into(),
            fields: fields.into(),
        })
    }

    pub fn hget(&mut self, key: impl Into<Key>, field: impl Into<Key>) -> &mut Self {
        self.push(Command::Hget {
            key: key.into(),
            field: field.into(),
        })
    }

    pub fn hmget<F: Into<Key>>(
        &mut self,
        key: impl Into<Key>,
        fields: impl IntoIterator<Item = F>,
    ) -> &mut Self {
        self.push(Command::Hmget {
            key: key.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    pub fn hgetall(&mut self, key: impl Into<Key>) -> &mut Self {
        self.push(Command::Hgetall { key: key.into() })
    }

    pub fn hdel<F: Into<Key>>(
        &mut self,
        key: impl Into<Key>,
        fields: impl IntoIterator<Item = F>,
    ) -> &mut Self {
        self.push(Command::Hdel {
            key: key.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    pub fn mset<K: Into<Key>, V: Into<Value>>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self {
        self.push(Command::Mset {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        })
    }

    pub fn mget<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>) -> &mut Self {
        self.push(Command::Mget {
            keys: keys.into_iter().map(Into::into).collect(),
        })
    }

    pub fn incr(&mut self, key: impl Into<Key>) -> &mut Self {
        self.push(Command::Incr { key: key.into() })
    }

    pub fn ttl(&mut self, key: impl Into<Key>) -> &mut Self {
        self.push(Command::Ttl { key: key.into() })
    }

    pub fn pttl(&mut self, key: impl Into<Key>) -> &mut Self {
        self.push(Command::Pttl { key: key.into() })
    }

    pub fn expire(
        &mut self,
        key: impl Into<Key>,
        seconds: u64,
        condition: Option<ExpireCondition>,
    ) -> &mut Self {
        self.push(Command::Expire {
            key: key.into(),
            seconds,
            condition,
        })
    }

    pub fn pexpire(
        &mut self,
        key: impl Into<Key>,
        milliseconds: u64,
        condition: Option<ExpireCondition>,
    ) -> &mut Self {
        self.push(Command::Pexpire {
            key: key.into(),
            milliseconds,
            condition,
        })
    }

    pub fn flushdb(&mut self, mode: Option<FlushMode>) -> &mut Self {
        self.push(Command::Flushdb { mode })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 按入队顺序等待全部结果
    pub async fn exec(self) -> Vec<PipelineResult> {
        let mut results = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let outcome = match slot {
                Slot::Running(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(AppError::internal(format!("Pipeline command task failed: {}", e))),
                },
                Slot::Failed(err) => Err(err),
            };
            results.push(match outcome {
                Ok(reply) => (None, reply),
                Err(err) => (Some(err), Reply::Nil),
            });
        }
        debug!(commands = results.len(), "Pipeline executed");
        results
    }
}

impl<C: RedisCommands + ?Sized + 'static> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("platform", &self.client.platform())
            .field("commands", &self.slots.len())
            .finish()
    }
}

/// 从共享后端创建管道
pub trait PipelineExt<C: RedisCommands + ?Sized + 'static> {
    fn pipeline(&self) -> Pipeline<C>;

    /// 创建管道并依次入队 `[命令名, 参数...]`
    fn pipeline_with<I>(&self, commands: I) -> AppResult<Pipeline<C>>
    where
        I: IntoIterator<Item = Vec<Value>>;
}

impl<C: RedisCommands + ?Sized + 'static> PipelineExt<C> for Arc<C> {
    fn pipeline(&self) -> Pipeline<C> {
        Pipeline::new(Arc::clone(self))
    }

    fn pipeline_with<I>(&self, commands: I) -> AppResult<Pipeline<C>>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut pipeline = self.pipeline();
        pipeline.add_batch(commands)?;
        Ok(pipeline)
    }
}
