//! 统一回复类型

use std::collections::HashMap;

use kvbridge_common::Okay;

/// 命令回复
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    #[default]
    Nil,
    Okay,
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
    Map(HashMap<String, String>),
}

impl Reply {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn is_okay(&self) -> bool {
        matches!(self, Self::Okay)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bulk(s) => Some(s),
            Self::Okay => Some("OK"),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Reply>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Okay> for Reply {
    fn from(_: Okay) -> Self {
        Self::Okay
    }
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Self::Bulk(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Self::Bulk(value.to_string())
    }
}

impl From<HashMap<String, String>> for Reply {
    fn from(value: HashMap<String, String>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl<T: Into<Reply>> From<Vec<T>> for Reply {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}
