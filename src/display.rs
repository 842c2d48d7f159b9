//! Display formatting policies for finalized records

use chrono::{Local, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

/// Label used when a completed request has no measurable duration
pub const CACHED_LABEL: &str = "(Cached)";

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Format a byte count with binary prefixes and one decimal place
///
/// A trailing `.0` is dropped, so `1024` renders as `"1 KB"` and `1536`
/// as `"1.5 KB"`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const K: f64 = 1024.0;

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= K && unit < UNITS.len() - 1 {
        value /= K;
        unit += 1;
    }

    let mut formatted = format!("{value:.1}");
    if let Some(stripped) = formatted.strip_suffix(".0") {
        formatted = stripped.to_string();
    }

    format!("{formatted} {}", UNITS[unit])
}

/// Format an epoch-seconds timestamp as a local `HH:MM:SS` clock time
#[must_use]
pub fn format_clock_time(timestamp_secs: f64) -> String {
    let secs = timestamp_secs.trunc() as i64;
    let nanos = (timestamp_secs.fract() * 1_000_000_000.0) as u32;

    match Local.timestamp_opt(secs, nanos) {
        chrono::LocalResult::Single(time) => time.format("%H:%M:%S").to_string(),
        _ => "00:00:00".to_string(),
    }
}

/// Duration label for a finalized network record
///
/// Renders whole milliseconds; a zero duration (or one that rounds down to
/// `0 ms`) is relabeled with the cached marker, unless the status is a
/// failure/abort/CORS state. Failure detection is a substring match on the
/// status text.
#[must_use]
pub fn format_duration_label(duration_secs: f64, status: &str) -> String {
    let terminal_failure = status.contains("Failed")
        || status.contains("CORS ERROR")
        || status.contains("Aborted");

    let label = if duration_secs > 0.0 {
        format!("{:.0} ms", duration_secs * 1000.0)
    } else if terminal_failure {
        "0 ms".to_string()
    } else {
        CACHED_LABEL.to_string()
    };

    if label == "0 ms" && !terminal_failure {
        CACHED_LABEL.to_string()
    } else {
        label
    }
}
