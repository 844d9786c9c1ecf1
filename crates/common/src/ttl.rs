//! 过期指令解析
//!
//! `SET` 的 `EX`/`PX`/`EXAT`/`PXAT`/`NX` 写法统一归一化为 [`TtlDirective`]：
//! 相对 TTL（或使用客户端默认 TTL）加上独立的"仅当不存在时写入"标记。

use std::fmt;
use std::time::Duration;

use kvbridge_errors::{AppError, AppResult};

use crate::types::Value;
use crate::utils::now_millis;

/// 过期时间写法
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    /// `EX`：相对秒数
    Seconds(f64),
    /// `PX`：相对毫秒数
    Milliseconds(f64),
    /// `EXAT`：Unix 时间戳（秒）
    UnixSeconds(i64),
    /// `PXAT`：Unix 时间戳（毫秒）
    UnixMilliseconds(i64),
}

impl Expiry {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Seconds(_) => "EX",
            Self::Milliseconds(_) => "PX",
            Self::UnixSeconds(_) => "EXAT",
            Self::UnixMilliseconds(_) => "PXAT",
        }
    }

    /// 换算为相对秒数，`now_ms` 为当前 Unix 毫秒时间戳
    pub fn relative_seconds(&self, now_ms: i64) -> f64 {
        match *self {
            Self::Seconds(s) => s,
            Self::Milliseconds(ms) => ms / 1000.0,
            Self::UnixSeconds(ts) => ts.saturating_sub(now_ms.div_euclid(1000)) as f64,
            Self::UnixMilliseconds(ts) => ts.saturating_sub(now_ms).div_euclid(1000) as f64,
        }
    }
}

/// `SET` 选项
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetOptions {
    pub expiry: Option<Expiry>,
    pub only_if_absent: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ex(mut self, seconds: u64) -> Self {
        self.expiry = Some(Expiry::Seconds(seconds as f64));
        self
    }

    pub fn px(mut self, milliseconds: u64) -> Self {
        self.expiry = Some(Expiry::Milliseconds(milliseconds as f64));
        self
    }

    pub fn exat(mut self, unix_seconds: i64) -> Self {
        self.expiry = Some(Expiry::UnixSeconds(unix_seconds));
        self
    }

    pub fn pxat(mut self, unix_milliseconds: i64) -> Self {
        self.expiry = Some(Expiry::UnixMilliseconds(unix_milliseconds));
        self
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn nx(mut self) -> Self {
        self.only_if_absent = true;
        self
    }

    /// 解析 `key value` 之后的参数
    pub fn from_args(args: &[Value]) -> AppResult<Self> {
        let mut options = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            if arg.is_token("NX") {
                options.only_if_absent = true;
                continue;
            }

            let token = ["EX", "PX", "EXAT", "PXAT"]
                .into_iter()
                .find(|t| arg.is_token(t))
                .ok_or_else(|| AppError::syntax("set"))?;
            if options.expiry.is_some() {
                return Err(AppError::syntax("set"));
            }
            let amount = iter.next().ok_or_else(|| AppError::syntax("set"))?;

            let expiry = match token {
                "EX" => Expiry::Seconds(parse_f64(amount)?),
                "PX" => Expiry::Milliseconds(parse_f64(amount)?),
                "EXAT" => Expiry::UnixSeconds(parse_i64(amount)?),
                _ => Expiry::UnixMilliseconds(parse_i64(amount)?),
            };
            options.expiry = Some(expiry);
        }

        Ok(options)
    }

    /// 以给定时间归一化
    pub fn resolve_at(&self, now_ms: i64) -> AppResult<TtlDirective> {
        let ttl = match self.expiry {
            None => None,
            Some(expiry @ (Expiry::Seconds(_) | Expiry::Milliseconds(_))) => {
                Some(to_duration(expiry.relative_seconds(now_ms))?)
            }
            // 已过去的绝对时间截断为 0
            Some(expiry) => Some(to_duration(expiry.relative_seconds(now_ms).max(0.0))?),
        };

        Ok(TtlDirective {
            ttl,
            only_if_absent: self.only_if_absent,
        })
    }

    pub fn resolve(&self) -> AppResult<TtlDirective> {
        self.resolve_at(now_millis())
    }
}

/// 归一化后的过期指令
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlDirective {
    /// `None` 表示使用客户端默认 TTL
    pub ttl: Option<Duration>,
    pub only_if_absent: bool,
}

impl TtlDirective {
    pub fn ttl_seconds(&self) -> Option<f64> {
        self.ttl.map(|d| d.as_secs_f64())
    }
}

/// `PEXPIRE`/`EXPIRE` 条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpireCondition {
    /// 仅当键没有 TTL
    Nx,
    /// 仅当键已有 TTL
    Xx,
    /// 仅当新 TTL 大于当前
    Gt,
    /// 仅当新 TTL 小于当前
    Lt,
}

impl ExpireCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nx => "NX",
            Self::Xx => "XX",
            Self::Gt => "GT",
            Self::Lt => "LT",
        }
    }

    pub fn parse(op: &str, value: &Value) -> AppResult<Self> {
        [Self::Nx, Self::Xx, Self::Gt, Self::Lt]
            .into_iter()
            .find(|c| value.is_token(c.as_str()))
            .ok_or_else(|| {
                AppError::invalid_argument(
                    op,
                    format!("Unsupported option {}", value.as_text()),
                )
            })
    }

    /// 解析可选的条件参数
    pub fn from_args(op: &str, args: &[Value]) -> AppResult<Option<Self>> {
        match args {
            [] => Ok(None),
            [flag] => Self::parse(op, flag).map(Some),
            _ => Err(AppError::syntax(op)),
        }
    }
}

impl fmt::Display for ExpireCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `FLUSHDB` 模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushMode {
    Async,
    Sync,
}

impl FlushMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Async => "ASYNC",
            Self::Sync => "SYNC",
        }
    }

    pub fn from_args(args: &[Value]) -> AppResult<Option<Self>> {
        match args {
            [] => Ok(None),
            [flag] if flag.is_token("ASYNC") => Ok(Some(Self::Async)),
            [flag] if flag.is_token("SYNC") => Ok(Some(Self::Sync)),
            _ => Err(AppError::syntax("flushdb")),
        }
    }
}

/// 负数、非有限值或超出 `Duration` 范围的秒数均视为非法
fn to_duration(secs: f64) -> AppResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| AppError::invalid_argument("set", "invalid expire time in 'set' command"))
}

fn parse_f64(value: &Value) -> AppResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| AppError::invalid_argument("set", "value is not an integer or out of range"))
}

fn parse_i64(value: &Value) -> AppResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| AppError::invalid_argument("set", "value is not an integer or out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const NOW_MS: i64 = 1_700_000_000_500;

    fn args(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn test_no_expiry_uses_default() {
        let directive = assert_ok!(SetOptions::new().resolve_at(NOW_MS));
        assert_eq!(directive.ttl, None);
        assert!(!directive.only_if_absent);
    }

    #[test]
    fn test_relative_expiry() {
        let ex = assert_ok!(SetOptions::new().ex(3).resolve_at(NOW_MS));
        assert_eq!(ex.ttl, Some(Duration::from_secs(3)));

        let px = assert_ok!(SetOptions::new().px(1500).resolve_at(NOW_MS));
        assert_eq!(px.ttl_seconds(), Some(1.5));
    }

    #[test]
    fn test_absolute_expiry() {
        // now 秒数向下取整为 1_700_000_000
        let exat = assert_ok!(SetOptions::new().exat(1_700_000_003).resolve_at(NOW_MS));
        assert_eq!(exat.ttl, Some(Duration::from_secs(3)));

        // floor((NOW_MS + 3000 - NOW_MS) / 1000) = 3
        let pxat = assert_ok!(SetOptions::new().pxat(NOW_MS + 3000).resolve_at(NOW_MS));
        assert_eq!(pxat.ttl, Some(Duration::from_secs(3)));

        // floor(2999 / 1000) = 2
        let pxat = assert_ok!(SetOptions::new().pxat(NOW_MS + 2999).resolve_at(NOW_MS));
        assert_eq!(pxat.ttl, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_past_absolute_expiry_clamps_to_zero() {
        let directive = assert_ok!(SetOptions::new().exat(1).resolve_at(NOW_MS));
        assert_eq!(directive.ttl, Some(Duration::ZERO));

        let directive = assert_ok!(SetOptions::new().pxat(NOW_MS - 10_000).resolve_at(NOW_MS));
        assert_eq!(directive.ttl, Some(Duration::ZERO));
    }

    #[test]
    fn test_negative_relative_expiry_is_rejected() {
        let options = SetOptions::new().expiry(Expiry::Seconds(-1.0));
        let err = assert_err!(options.resolve_at(NOW_MS));
        assert_eq!(err.to_string(), "invalid expire time in 'set' command");
    }

    #[test]
    fn test_out_of_range_expiry_is_rejected() {
        let err = assert_err!(SetOptions::new().ex(u64::MAX).resolve_at(NOW_MS));
        assert_eq!(err.to_string(), "invalid expire time in 'set' command");

        let options = assert_ok!(SetOptions::from_args(&args(&["EX", "1e30"])));
        assert_err!(options.resolve_at(NOW_MS));

        let options = SetOptions::new().expiry(Expiry::Milliseconds(f64::NAN));
        assert_err!(options.resolve_at(NOW_MS));
    }

    #[test]
    fn test_extreme_absolute_expiry() {
        let directive = assert_ok!(SetOptions::new().pxat(i64::MIN).resolve_at(NOW_MS));
        assert_eq!(directive.ttl, Some(Duration::ZERO));

        let directive = assert_ok!(SetOptions::new().exat(i64::MIN).resolve_at(NOW_MS));
        assert_eq!(directive.ttl, Some(Duration::ZERO));

        let directive = assert_ok!(SetOptions::new().exat(i64::MAX).resolve_at(i64::MIN));
        assert!(directive.ttl.is_some());
    }

    #[test]
    fn test_parse_all_spellings() {
        let parsed = assert_ok!(SetOptions::from_args(&args(&["EX", "3"])));
        assert_eq!(parsed.expiry, Some(Expiry::Seconds(3.0)));

        let parsed = assert_ok!(SetOptions::from_args(&args(&["px", "3000"])));
        assert_eq!(parsed.expiry, Some(Expiry::Milliseconds(3000.0)));

        let parsed = assert_ok!(SetOptions::from_args(&args(&["EXAT", "1700000003"])));
        assert_eq!(parsed.expiry, Some(Expiry::UnixSeconds(1_700_000_003)));

        let parsed = assert_ok!(SetOptions::from_args(&args(&["PXAT", "1700000003000", "NX"])));
        assert_eq!(parsed.expiry, Some(Expiry::UnixMilliseconds(1_700_000_003_000)));
        assert!(parsed.only_if_absent);

        let parsed = assert_ok!(SetOptions::from_args(&args(&["NX"])));
        assert_eq!(parsed.expiry, None);
        assert!(parsed.only_if_absent);
    }

    #[test]
    fn test_parse_numeric_amount() {
        let parsed = assert_ok!(SetOptions::from_args(&[Value::from("EX"), Value::from(5)]));
        assert_eq!(parsed.expiry, Some(Expiry::Seconds(5.0)));
    }

    #[test]
    fn test_parse_rejects_malformed_options() {
        assert_err!(SetOptions::from_args(&args(&["EX"])));
        assert_err!(SetOptions::from_args(&args(&["EX", "abc"])));
        assert_err!(SetOptions::from_args(&args(&["EX", "1", "PX", "1000"])));
        assert_err!(SetOptions::from_args(&args(&["KEEPTTL"])));
    }

    #[test]
    fn test_expire_condition_parsing() {
        let cond = assert_ok!(ExpireCondition::from_args("pexpire", &args(&["gt"])));
        assert_eq!(cond, Some(ExpireCondition::Gt));
        assert_eq!(assert_ok!(ExpireCondition::from_args("pexpire", &[])), None);
        assert_err!(ExpireCondition::from_args("pexpire", &args(&["ZZ"])));
        assert_err!(ExpireCondition::from_args("pexpire", &args(&["NX", "GT"])));
    }

    #[test]
    fn test_flush_mode_parsing() {
        assert_eq!(assert_ok!(FlushMode::from_args(&args(&["ASYNC"]))), Some(FlushMode::Async));
        assert_eq!(assert_ok!(FlushMode::from_args(&args(&["sync"]))), Some(FlushMode::Sync));
        assert_eq!(assert_ok!(FlushMode::from_args(&[])), None);
        assert_err!(FlushMode::from_args(&args(&["LATER"])));
    }
}
