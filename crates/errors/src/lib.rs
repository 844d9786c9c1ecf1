//! kvbridge-errors - 统一错误处理
//!
//! 两层错误模型：调用方错误以 `AppError` 直接返回，
//! 后端错误以 `ErrorEvent` 上报，调用本身返回默认值

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误来源平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// 远程缓存服务
    CacheBackend,
    /// Redis 回退后端
    FallbackBackend,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheBackend => "cache-backend",
            Self::FallbackBackend => "fallback-backend",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后端错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgumentError,
    BadRequestError,
    NotFoundError,
    AlreadyExistsError,
    FailedPreconditionError,
    PermissionError,
    AuthenticationError,
    LimitExceededError,
    CancelledError,
    TimeoutError,
    ServerUnavailable,
    ConnectionError,
    InternalServerError,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgumentError => "INVALID_ARGUMENT_ERROR",
            Self::BadRequestError => "BAD_REQUEST_ERROR",
            Self::NotFoundError => "NOT_FOUND_ERROR",
            Self::AlreadyExistsError => "ALREADY_EXISTS_ERROR",
            Self::FailedPreconditionError => "FAILED_PRECONDITION_ERROR",
            Self::PermissionError => "PERMISSION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::LimitExceededError => "LIMIT_EXCEEDED_ERROR",
            Self::CancelledError => "CANCELLED_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ServerUnavailable => "SERVER_UNAVAILABLE",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后端错误事件
///
/// 序列化形状固定为 `{platform, op, msg, code}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub platform: Platform,
    pub op: String,
    pub msg: String,
    #[serde(default)]
    pub code: Option<ErrorCode>,
}

impl ErrorEvent {
    pub fn new(platform: Platform, op: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            platform,
            op: op.into(),
            msg: msg.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// 响应形状不符合预期
    pub fn unexpected_response(
        platform: Platform,
        op: impl Into<String>,
        detail: impl fmt::Display,
    ) -> Self {
        Self::new(platform, op, format!("unexpected-response {}", detail))
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {} failed ({}): {}", self.platform, self.op, code, self.msg),
            None => write!(f, "[{}] {} failed: {}", self.platform, self.op, self.msg),
        }
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    InvalidArgument { op: String, msg: String },

    #[error("Un-Supported Command Passed: {0}")]
    UnsupportedCommand(String),

    #[error("{msg}")]
    Unsupported { op: String, msg: String },

    #[error("{0}")]
    Backend(ErrorEvent),

    #[error("Operation '{op}' timed out after {timeout_ms}ms")]
    Timeout { op: String, timeout_ms: u64 },

    #[error("Client is closed, cannot run '{0}'")]
    Closed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_argument(op: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op: op.into(),
            msg: msg.into(),
        }
    }

    /// Redis 风格的参数个数错误
    pub fn wrong_arity(op: &str) -> Self {
        Self::invalid_argument(op, format!("Wrong number of arguments for '{}' command", op))
    }

    /// Redis 风格的语法错误
    pub fn syntax(op: impl Into<String>) -> Self {
        Self::invalid_argument(op, "syntax error")
    }

    pub fn unsupported_command(name: impl Into<String>) -> Self {
        Self::UnsupportedCommand(name.into())
    }

    pub fn unsupported(op: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Unsupported {
            op: op.into(),
            msg: msg.into(),
        }
    }

    pub fn backend(event: ErrorEvent) -> Self {
        Self::Backend(event)
    }

    pub fn timeout(op: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            op: op.into(),
            timeout_ms: after.as_millis() as u64,
        }
    }

    pub fn closed(op: impl Into<String>) -> Self {
        Self::Closed(op.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 出错的操作名
    pub fn op(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { op, .. } => Some(op),
            Self::UnsupportedCommand(_) => None,
            Self::Unsupported { op, .. } => Some(op),
            Self::Backend(event) => Some(&event.op),
            Self::Timeout { op, .. } => Some(op),
            Self::Closed(op) => Some(op),
            Self::Config(_) => None,
            Self::Internal(_) => None,
        }
    }

    /// 转换为错误码
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgumentError,
            Self::UnsupportedCommand(_) => ErrorCode::BadRequestError,
            Self::Unsupported { .. } => ErrorCode::FailedPreconditionError,
            Self::Backend(event) => event.code.unwrap_or(ErrorCode::UnknownError),
            Self::Timeout { .. } => ErrorCode::TimeoutError,
            Self::Closed(_) => ErrorCode::ConnectionError,
            Self::Config(_) => ErrorCode::InvalidArgumentError,
            Self::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    /// 转换为错误事件（用于统一上报）
    pub fn to_event(&self, platform: Platform) -> ErrorEvent {
        match self {
            Self::Backend(event) => event.clone(),
            Self::InvalidArgument { msg, .. } | Self::Unsupported { msg, .. } => {
                ErrorEvent::new(platform, self.op().unwrap_or_default(), msg.clone())
                    .with_code(self.error_code())
            }
            other => ErrorEvent::new(platform, other.op().unwrap_or_default(), other.to_string())
                .with_code(other.error_code()),
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_json_shape() {
        let event = ErrorEvent::new(Platform::CacheBackend, "get", "unavailable")
            .with_code(ErrorCode::ServerUnavailable);
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["platform"], "cache-backend");
        assert_eq!(json["op"], "get");
        assert_eq!(json["msg"], "unavailable");
        assert_eq!(json["code"], "SERVER_UNAVAILABLE");
    }

    #[test]
    fn test_error_event_json_escapes_message() {
        let event = ErrorEvent::new(Platform::CacheBackend, "set", "bad \"value\"\n");
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["msg"], "bad \"value\"\n");
    }

    #[test]
    fn test_error_event_without_code_serializes_null() {
        let event = ErrorEvent::unexpected_response(Platform::FallbackBackend, "hset", "Nil");
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["platform"], "fallback-backend");
        assert_eq!(json["msg"], "unexpected-response Nil");
        assert!(json["code"].is_null());
    }

    #[test]
    fn test_unsupported_command_message() {
        let err = AppError::unsupported_command("UNSUPPORTED_CMD");
        assert_eq!(err.to_string(), "Un-Supported Command Passed: UNSUPPORTED_CMD");
        assert_eq!(err.error_code(), ErrorCode::BadRequestError);
        assert!(err.op().is_none());
    }

    #[test]
    fn test_wrong_arity_context() {
        let err = AppError::wrong_arity("mset");
        assert_eq!(err.to_string(), "Wrong number of arguments for 'mset' command");

        let event = err.to_event(Platform::CacheBackend);
        assert_eq!(event.op, "mset");
        assert_eq!(event.code, Some(ErrorCode::InvalidArgumentError));
        assert_eq!(event.msg, "Wrong number of arguments for 'mset' command");
    }

    #[test]
    fn test_backend_error_keeps_event() {
        let event = ErrorEvent::new(Platform::CacheBackend, "incr", "failed to parse value into long")
            .with_code(ErrorCode::FailedPreconditionError);
        let err = AppError::backend(event.clone());

        assert_eq!(err.op(), Some("incr"));
        assert_eq!(err.error_code(), ErrorCode::FailedPreconditionError);
        assert_eq!(err.to_event(Platform::FallbackBackend), event);
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::timeout("get", Duration::from_millis(250));
        assert_eq!(err.to_string(), "Operation 'get' timed out after 250ms");
        assert_eq!(err.error_code(), ErrorCode::TimeoutError);
    }
}
