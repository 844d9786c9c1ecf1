//! 通用工具函数

use chrono::Utc;

/// 当前 Unix 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当前 Unix 时间戳（秒，向下取整）
pub fn now_seconds() -> i64 {
    now_millis().div_euclid(1000)
}
