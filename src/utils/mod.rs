mod sync;
mod time_utils;

pub use time_utils::{
    TimeUtils, duration_until_ms, epoch_sec_to_utc_string, format_duration, now_timestamp_ms,
    redact_token,
};

pub(crate) use sync::{lock, read, write};
