//! 修正儒略日（MJD）与日历时间之间的换算
//!
//! MJD 0 对应 1858-11-17T00:00:00Z，Unix 纪元对应 MJD 40587。
//! 换算精确到毫秒，格式化输出时截断到整秒（不四舍五入）。

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::errors::{QueueError, QueueResult};

/// Unix 纪元 (1970-01-01) 的 MJD
pub const MJD_UNIX_EPOCH: f64 = 40587.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 日历时间转换为 MJD
pub fn mjd_from_datetime(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64 / MILLIS_PER_DAY + MJD_UNIX_EPOCH
}

/// 当前时刻的 MJD
pub fn mjd_now() -> f64 {
    mjd_from_datetime(&Utc::now())
}

/// MJD 转换为日历时间
///
/// 毫秒部分向零截断。非有限值或超出 chrono 可表示范围时返回错误。
pub fn datetime_from_mjd(mjd: f64) -> QueueResult<DateTime<Utc>> {
    if !mjd.is_finite() {
        return Err(QueueError::InvalidMjd(format!("{mjd}")));
    }

    let millis = ((mjd - MJD_UNIX_EPOCH) * MILLIS_PER_DAY).trunc();
    if millis.abs() > i64::MAX as f64 {
        return Err(QueueError::InvalidMjd(format!("{mjd}")));
    }

    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(|| QueueError::InvalidMjd(format!("{mjd}")))
}

/// MJD 格式化为 `YYYY-MM-DDTHH:MM:SSZ`，亚秒部分截断
pub fn format_mjd_iso(mjd: f64) -> QueueResult<String> {
    let dt = datetime_from_mjd(mjd)?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// 解析 `format_mjd_iso` 的输出（或任意 RFC 3339 时间）为 MJD
pub fn parse_iso_to_mjd(value: &str) -> QueueResult<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(mjd_from_datetime(&dt.with_timezone(&Utc)));
    }

    let naive = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| QueueError::InvalidMjd(format!("{value}: {e}")))?;
    Ok(mjd_from_datetime(&Utc.from_utc_datetime(&naive)))
}

/// 表单中 MJD 输入框的日历预览
///
/// 空字符串返回提示文字；无法解析的输入返回字面量 `error`，不会传播错误。
pub fn mjd_preview(input: &str, blank_hint: &str) -> String {
    if input.is_empty() {
        return blank_hint.to_string();
    }

    match parse_float_prefix(input).and_then(|mjd| format_mjd_iso(mjd).ok()) {
        Some(iso) => iso,
        None => {
            tracing::debug!("无法预览MJD输入: {input}");
            "error".to_string()
        }
    }
}

/// 近似 `parseFloat`：解析开头最长的合法浮点数前缀
fn parse_float_prefix(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let mut best = None;
    for (idx, ch) in trimmed.char_indices() {
        let end = idx + ch.len_utf8();
        if let Ok(value) = trimmed[..end].parse::<f64>() {
            best = Some(value);
        }
    }
    best.filter(|v| v.is_finite())
}
