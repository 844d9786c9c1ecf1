//! 通用类型定义

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use derive_more::{Display, From};
use kvbridge_errors::{AppError, AppResult};

/// 缓存键
///
/// 字符串与字节形式统一投影为字节序列
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Key {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(value: &[u8; N]) -> Self {
        Self(value.to_vec())
    }
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        Self(value.to_bytes())
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        match value {
            Value::Bytes(bytes) => Self(bytes),
            other => Self(other.to_bytes()),
        }
    }
}

/// 缓存值：字符串、字节或数字
#[derive(Debug, Clone, PartialEq, From)]
pub enum Value {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl Value {
    /// 存储前的字节形式（数字按十进制格式化）
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Str(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
            Self::Int(i) => i.to_string().into_bytes(),
            Self::Float(f) => f.to_string().into_bytes(),
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Str(s) => Cow::Borrowed(s.as_str()),
            Self::Bytes(b) => String::from_utf8_lossy(b),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Float(_) => None,
            other => other.as_text().trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            other => other.as_text().trim().parse().ok(),
        }
    }

    /// 大小写不敏感地匹配协议标记（如 `EX`、`NX`）
    pub fn is_token(&self, token: &str) -> bool {
        match self {
            Self::Str(_) | Self::Bytes(_) => self.as_text().eq_ignore_ascii_case(token),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Str(value.to_string()),
        }
    }
}

impl From<&Key> for Value {
    fn from(value: &Key) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}

impl From<Key> for Value {
    fn from(value: Key) -> Self {
        Self::Bytes(value.into_bytes())
    }
}

/// Redis 的 `OK` 状态回复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[display("OK")]
pub struct Okay;

/// 哈希字段集合
///
/// 对应 `hset key field value ...`、对象与 Map 三种调用形式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashFields(Vec<(Key, Value)>);

impl HashFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.0.push((field.into(), value.into()));
        self
    }

    /// 从扁平参数 `field value field value ...` 构造
    pub fn from_flat(op: &str, args: Vec<Value>) -> AppResult<Self> {
        if args.is_empty() || args.len() % 2 != 0 {
            return Err(AppError::wrong_arity(op));
        }
        let mut fields = Vec::with_capacity(args.len() / 2);
        let mut iter = args.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            fields.push((Key::from(field), value));
        }
        Ok(Self(fields))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<(Key, Value)> {
        self.0
    }
}

impl<K: Into<Key>, V: Into<Value>> From<Vec<(K, V)>> for HashFields {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<Key>, V: Into<Value>, const N: usize> From<[(K, V); N]> for HashFields {
    fn from(pairs: [(K, V); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<Key>, V: Into<Value>> From<HashMap<K, V>> for HashFields {
    fn from(map: HashMap<K, V>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<Key>, V: Into<Value>> From<BTreeMap<K, V>> for HashFields {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 将 `mset` 的扁平参数 `key value key value ...` 拆分为键值对
pub fn parse_mset_pairs(args: Vec<Value>) -> AppResult<Vec<(Key, Value)>> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(AppError::wrong_arity("mset"));
    }
    let mut pairs = Vec::with_capacity(args.len() / 2);
    let mut iter = args.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((Key::from(key), value));
    }
    Ok(pairs)
}
