//! 命令解析
//!
//! 命令名大小写不敏感；参数解析失败不影响入队，只落在对应的结果槽位上

use std::fmt;
use std::str::FromStr;

use kvbridge_common::{
    ExpireCondition, FlushMode, HashFields, Key, SetOptions, Value, parse_mset_pairs,
};
use kvbridge_errors::{AppError, AppResult};

/// 支持的命令名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Get,
    Set,
    Del,
    Hset,
    Hmset,
    Hget,
    Hmget,
    Hgetall,
    Hdel,
    Mset,
    Mget,
    Incr,
    Ttl,
    Pttl,
    Expire,
    Pexpire,
    Flushdb,
    Quit,
}

impl CommandName {
    pub const ALL: [CommandName; 18] = [
        Self::Get,
        Self::Set,
        Self::Del,
        Self::Hset,
        Self::Hmset,
        Self::Hget,
        Self::Hmget,
        Self::Hgetall,
        Self::Hdel,
        Self::Mset,
        Self::Mget,
        Self::Incr,
        Self::Ttl,
        Self::Pttl,
        Self::Expire,
        Self::Pexpire,
        Self::Flushdb,
        Self::Quit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Del => "del",
            Self::Hset => "hset",
            Self::Hmset => "hmset",
            Self::Hget => "hget",
            Self::Hmget => "hmget",
            Self::Hgetall => "hgetall",
            Self::Hdel => "hdel",
            Self::Mset => "mset",
            Self::Mget => "mget",
            Self::Incr => "incr",
            Self::Ttl => "ttl",
            Self::Pttl => "pttl",
            Self::Expire => "expire",
            Self::Pexpire => "pexpire",
            Self::Flushdb => "flushdb",
            Self::Quit => "quit",
        }
    }
}

impl FromStr for CommandName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::unsupported_command(s))
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 类型化命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get { key: Key },
    Set { key: Key, value: Value, options: SetOptions },
    Del { keys: Vec<Key> },
    Hset { key: Key, fields: HashFields },
    Hmset { key: Key, fields: HashFields },
    Hget { key: Key, field: Key },
    Hmget { key: Key, fields: Vec<Key> },
    Hgetall { key: Key },
    Hdel { key: Key, fields: Vec<Key> },
    Mset { pairs: Vec<(Key, Value)> },
    Mget { keys: Vec<Key> },
    Incr { key: Key },
    Ttl { key: Key },
    Pttl { key: Key },
    Expire { key: Key, seconds: u64, condition: Option<ExpireCondition> },
    Pexpire { key: Key, milliseconds: u64, condition: Option<ExpireCondition> },
    Flushdb { mode: Option<FlushMode> },
    Quit,
}

impl Command {
    pub fn name(&self) -> CommandName {
        match self {
            Self::Get { .. } => CommandName::Get,
            Self::Set { .. } => CommandName::Set,
            Self::Del { .. } => CommandName::Del,
            Self::Hset { .. } => CommandName::Hset,
            Self::Hmset { .. } => CommandName::Hmset,
            Self::Hget { .. } => CommandName::Hget,
            Self::Hmget { .. } => CommandName::Hmget,
            Self::Hgetall { .. } => CommandName::Hgetall,
            Self::Hdel { .. } => CommandName::Hdel,
            Self::Mset { .. } => CommandName::Mset,
            Self::Mget { .. } => CommandName::Mget,
            Self::Incr { .. } => CommandName::Incr,
            Self::Ttl { .. } => CommandName::Ttl,
            Self::Pttl { .. } => CommandName::Pttl,
            Self::Expire { .. } => CommandName::Expire,
            Self::Pexpire { .. } => CommandName::Pexpire,
            Self::Flushdb { .. } => CommandName::Flushdb,
            Self::Quit => CommandName::Quit,
        }
    }

    /// 按 Redis 参数格式解析
    pub fn parse(name: CommandName, args: Vec<Value>) -> AppResult<Self> {
        let op = name.as_str();
        let command = match name {
            CommandName::Get => Self::Get {
                key: single_key(op, args)?,
            },
            CommandName::Set => {
                if args.len() < 2 {
                    return Err(AppError::wrong_arity(op));
                }
                let options = SetOptions::from_args(&args[2..])?;
                let mut iter = args.into_iter();
                match (iter.next(), iter.next()) {
                    (Some(key), Some(value)) => Self::Set {
                        key: key.into(),
                        value,
                        options,
                    },
                    _ => return Err(AppError::wrong_arity(op)),
                }
            }
            CommandName::Del => Self::Del {
                keys: keys(op, args, 1)?,
            },
            CommandName::Hset | CommandName::Hmset => {
                let (key, rest) = split_key(op, args)?;
                let fields = HashFields::from_flat(op, rest)?;
                if name == CommandName::Hset {
                    Self::Hset { key, fields }
                } else {
                    Self::Hmset { key, fields }
                }
            }
            CommandName::Hget => {
                if args.len() != 2 {
                    return Err(AppError::wrong_arity(op));
                }
                let (key, mut rest) = split_key(op, args)?;
                match rest.pop() {
                    Some(field) => Self::Hget {
                        key,
                        field: field.into(),
                    },
                    None => return Err(AppError::wrong_arity(op)),
                }
            }
            CommandName::Hmget | CommandName::Hdel => {
                let (key, rest) = split_key(op, args)?;
                let fields = keys(op, rest, 1)?;
                if name == CommandName::Hmget {
                    Self::Hmget { key, fields }
                } else {
                    Self::Hdel { key, fields }
                }
            }
            CommandName::Hgetall => Self::Hgetall {
                key: single_key(op, args)?,
            },
            CommandName::Mset => Self::Mset {
                pairs: parse_mset_pairs(args)?,
            },
            CommandName::Mget => Self::Mget {
                keys: keys(op, args, 1)?,
            },
            CommandName::Incr => Self::Incr {
                key: single_key(op, args)?,
            },
            CommandName::Ttl => Self::Ttl {
                key: single_key(op, args)?,
            },
            CommandName::Pttl => Self::Pttl {
                key: single_key(op, args)?,
            },
            CommandName::Expire | CommandName::Pexpire => {
                if !(2..=3).contains(&args.len()) {
                    return Err(AppError::wrong_arity(op));
                }
                let amount = non_negative(op, &args[1])?;
                let condition = ExpireCondition::from_args(op, &args[2..])?;
                let (key, _) = split_key(op, args)?;
                if name == CommandName::Expire {
                    Self::Expire {
                        key,
                        seconds: amount,
                        condition,
                    }
                } else {
                    Self::Pexpire {
                        key,
                        milliseconds: amount,
                        condition,
                    }
                }
            }
            CommandName::Flushdb => Self::Flushdb {
                mode: FlushMode::from_args(&args)?,
            },
            CommandName::Quit => {
                if !args.is_empty() {
                    return Err(AppError::wrong_arity(op));
                }
                Self::Quit
            }
        };
        Ok(command)
    }
}

fn single_key(op: &str, args: Vec<Value>) -> AppResult<Key> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.next()) {
        (Some(key), None) => Ok(key.into()),
        _ => Err(AppError::wrong_arity(op)),
    }
}

fn split_key(op: &str, args: Vec<Value>) -> AppResult<(Key, Vec<Value>)> {
    let mut iter = args.into_iter();
    let key = iter.next().ok_or_else(|| AppError::wrong_arity(op))?;
    Ok((key.into(), iter.collect()))
}

fn keys(op: &str, args: Vec<Value>, min: usize) -> AppResult<Vec<Key>> {
    if args.len() < min {
        return Err(AppError::wrong_arity(op));
    }
    Ok(args.into_iter().map(Key::from).collect())
}

fn non_negative(op: &str, value: &Value) -> AppResult<u64> {
    value
        .as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| AppError::invalid_argument(op, "value is not an integer or out of range"))
}
