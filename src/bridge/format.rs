//! Small formatting helpers for forwarded messages.

use std::sync::OnceLock;

use regex::Regex;

/// Render a duration in seconds as `35s`, `2m` or `2m35s`.
pub fn format_duration(seconds: u64) -> String {
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    if minutes == 0 {
        format!("{seconds}s")
    } else if seconds == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m{seconds}s")
    }
}

/// Render a byte count with decimal units, one fraction digit, trailing
/// `.0` removed.
pub fn format_filesize(bytes: u64) -> String {
    let (divisor, unit) = if bytes >= 1000u64.pow(3) {
        (1000u64.pow(3), "GB")
    } else if bytes >= 1000u64.pow(2) {
        (1000u64.pow(2), "MB")
    } else if bytes >= 1000 {
        (1000, "KB")
    } else {
        (1, "bytes")
    };
    let mut value = format!("{:.1}", bytes as f64 / divisor as f64);
    if value.ends_with(".0") {
        value.truncate(value.len() - 2);
    }
    format!("{value} {unit}")
}

/// Extract the original IRC nick from a message this bridge itself sent,
/// i.e. one shaped like `<nick> text` or `* nick text`.
pub fn parse_own_prefix(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(?:<([^>]+)>|\* ([^ ]+)) ").expect("own-prefix pattern is valid")
    });
    let captures = re.captures(text)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
}
