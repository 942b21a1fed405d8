//! Timestamp normalization and timecode formatting.
//!
//! The inference collaborator reports event times in whatever shape its
//! model happened to produce: bare seconds, `"MM:SS"`, `"HH:MM:SS"`, or
//! garbage. These helpers fold all of that into canonical f64 seconds.
//! They are pure and total: malformed input maps to `0.0`, never an error,
//! because upstream data is untrusted and must not wedge the pipeline.

use serde_json::Value;

/// Normalize a colon-separated or bare-seconds string into seconds.
///
/// Three parts are read as `HH:MM:SS`, two as `MM:SS`, one as seconds.
/// Any non-numeric component, or an empty string, yields `0.0`.
pub fn normalize_str(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let mut components = Vec::with_capacity(parts.len());
    for part in &parts {
        match part.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => components.push(n),
            _ => return 0.0,
        }
    }

    match components.as_slice() {
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        [m, s] => m * 60.0 + s,
        [s] => *s,
        _ => 0.0,
    }
}

/// Normalize an arbitrary JSON value into seconds.
///
/// Numbers pass through, strings go through [`normalize_str`], anything
/// else (null, objects, arrays, booleans, a missing field) is `0.0`.
pub fn normalize_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => normalize_str(s),
        _ => 0.0,
    }
}

/// Format seconds as a display timecode: `MM:SS`, or `H:MM:SS` from one
/// hour up. Fractional seconds are truncated.
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
