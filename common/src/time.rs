//! Time utilities
//!
//! Timestamps are epoch milliseconds throughout the harness; these helpers
//! produce the two textual forms the stats report uses.

use chrono::{Local, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since UNIX_EPOCH.
///
/// A clock set before the epoch yields 0.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Format a number of whole seconds as `h:mm:ss`.
///
/// Hours are not padded and may exceed 24. Negative input keeps its sign in
/// every component, e.g. `-5` renders as `0:00:-5`.
pub fn format_hms(seconds: i64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}

/// Format epoch milliseconds as a local wall-clock time, `HH:MM:SS`.
pub fn format_clock(millis: u64) -> String {
    match Local.timestamp_millis_opt(millis as i64).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => "00:00:00".to_string(),
    }
}
