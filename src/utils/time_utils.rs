use chrono::{DateTime, Utc};
use std::time::Duration;

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_MIN * 5;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
}

pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds from `now_ms` until `target_ms`, or `None` if the target is not in the future.
pub fn duration_until_ms(target_ms: i64, now_ms: i64) -> Option<Duration> {
    let remaining = target_ms.checked_sub(now_ms)?;
    if remaining <= 0 {
        return None;
    }
    Some(Duration::from_millis(remaining as u64))
}

pub fn epoch_sec_to_utc_string(epoch_sec: i64) -> String {
    // Used for display purposes
    match DateTime::from_timestamp(epoch_sec, 0) {
        Some(dt) => format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT)),
        None => format!("<invalid timestamp {}>", epoch_sec),
    }
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }
    let months = days / 30;
    if months < 12 {
        return format!("{}M", months);
    }
    let years = months / 12;
    let rem_months = months % 12;
    format!("{}Y {}M", years, rem_months)
}

/// Short, log-safe preview of a credential.
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    format!("{}…({} chars)", visible, token.chars().count())
}
