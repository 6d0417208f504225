//! Duration strings for poll intervals and request timeouts.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Units used when printing, largest first.
const DISPLAY_UNITS: &[(&str, u128)] = &[
    ("h", 3_600_000_000_000),
    ("m", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("µs", 1_000),
];

/// Parse duration strings like "500ms", "10s", "1.5m", "2h"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str
                .trim()
                .parse()
                .with_context(|| format!("Not a number: {:?}", val_str))?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Parse a duration that is used as a wait, so zero is rejected.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let d = parse_duration(s)?;
    if d.is_zero() {
        bail!("Interval must be greater than zero: {}", s.trim());
    }
    Ok(d)
}

/// Format a duration in the largest unit that keeps it at or above one,
/// in a form [`parse_duration`] reads back.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    for (suffix, size) in DISPLAY_UNITS {
        if nanos >= *size {
            let value = format!("{:.2}", nanos as f64 / *size as f64);
            let value = value.trim_end_matches('0').trim_end_matches('.');
            return format!("{value}{suffix}");
        }
    }
    format!("{nanos}ns")
}
