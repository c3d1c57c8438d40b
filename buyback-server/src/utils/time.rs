//! 时间工具函数
//!
//! 所有持久化时间戳统一为 `i64` Unix millis，
//! 格式化只在对外消息（工单正文）处完成。

use chrono::{DateTime, Utc};

/// 当前时间 (Unix millis)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 天数 → millis 偏移量
pub fn days_to_millis(days: i64) -> i64 {
    days * 24 * 60 * 60 * 1000
}

/// Unix millis → "YYYY-MM-DD" (UTC)，用于面向买家的截止日期文案
///
/// 无法解析的时间戳按原样输出数字，不 panic。
pub fn format_date(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_to_millis() {
        assert_eq!(days_to_millis(7), 604_800_000);
    }

    #[test]
    fn test_format_date() {
        // 2026-01-15 00:00:00 UTC
        assert_eq!(format_date(1_768_435_200_000), "2026-01-15");
    }
}
