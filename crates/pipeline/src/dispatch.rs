//! 命令分发

use kvbridge_errors::AppResult;
use kvbridge_ports::RedisCommands;
use tracing::debug;

use crate::command::Command;
use crate::reply::Reply;

/// 在给定后端上执行一条命令
pub async fn dispatch<C>(client: &C, command: Command) -> AppResult<Reply>
where
    C: RedisCommands + ?Sized,
{
    debug!(command = %command.name(), platform = %client.platform(), "Dispatching command");

    let reply: Reply = match command {
        Command::Get { key } => client.get(key).await?.into(),
        Command::Set {
            key,
            value,
            options,
        } => client.set(key, value, options).await?.into(),
        Command::Del { keys } => client.del(keys).await?.into(),
        Command::Hset { key, fields } => client.hset(key, fields).await?.into(),
        Command::Hmset { key, fields } => client.hmset(key, fields).await?.into(),
        Command::Hget { key, field } => client.hget(key, field).await?.into(),
        Command::Hmget { key, fields } => client.hmget(key, fields).await?.into(),
        Command::Hgetall { key } => client.hgetall(key).await?.into(),
        Command::Hdel { key, fields } => client.hdel(key, fields).await?.into(),
        Command::Mset { pairs } => client.mset(pairs).await?.into(),
        Command::Mget { keys } => client.mget(keys).await?.into(),
        Command::Incr { key } => client.incr(key).await?.into(),
        Command::Ttl { key } => client.ttl(key).await?.into(),
        Command::Pttl { key } => client.pttl(key).await?.into(),
        Command::Expire {
            key,
            seconds,
            condition,
        } => client.expire(key, seconds, condition).await?.into(),
        Command::Pexpire {
            key,
            milliseconds,
            condition,
        } => client.pexpire(key, milliseconds, condition).await?.into(),
        Command::Flushdb { mode } => client.flushdb(mode).await?.into(),
        Command::Quit => client.quit().await?.into(),
    };

    Ok(reply)
}
