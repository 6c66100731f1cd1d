//! Wall-clock formatting shared by console output and heartbeat records.

use chrono::{DateTime, Local};

/// `strftime` pattern for every timestamp vmctl prints or persists.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a local time at second precision, e.g. `2014-05-01 13:37:00`.
#[must_use]
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats the current local time.
#[must_use]
pub fn timestamp() -> String {
    format_timestamp(&Local::now())
}
