//! Normalization of raw inference findings.
//!
//! The inference collaborator is untrusted: different models label the same
//! concept with different field names, omit fields, or mistype them. This
//! adapter folds each raw JSON finding into a [`TimelineEvent`] using a
//! fixed priority order per field, isolated here so the tolerance list can
//! change without touching state-machine logic.

use serde_json::Value;

use crate::domain::TimelineEvent;
use crate::timecode;

/// Start-of-range field names, highest priority first.
const START_KEYS: &[&str] = &["startTime", "start_time", "from_time", "fromTime", "start", "from", "timestamp"];

/// End-of-range field names, highest priority first.
const END_KEYS: &[&str] = &["endTime", "end_time", "to_time", "toTime", "end", "to"];

/// Description field names, highest priority first.
const SUMMARY_KEYS: &[&str] = &["description", "summary", "label", "event", "text"];

/// Confidence field names, highest priority first.
const CONFIDENCE_KEYS: &[&str] = &["confidence", "score", "probability"];

/// Summary used when the model supplies none.
const DEFAULT_SUMMARY: &str = "Event Detected";

/// Confidence used when the model supplies none (or garbage).
const DEFAULT_CONFIDENCE: f64 = 0.95;

fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| raw.get(*k)).filter(|v| !v.is_null())
}

/// Normalize one raw finding into a timeline event.
///
/// Missing or malformed times degrade to `0.0`; a missing end time falls
/// back to the start time, keeping `from_time <= to_time`.
pub fn normalize_finding(raw: &Value) -> TimelineEvent {
    let from_time = first_present(raw, START_KEYS)
        .map(timecode::normalize_value)
        .unwrap_or(0.0);

    let to_time = first_present(raw, END_KEYS)
        .map(timecode::normalize_value)
        .unwrap_or(from_time);

    let summary = first_present(raw, SUMMARY_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUMMARY)
        .to_string();

    let confidence = first_present(raw, CONFIDENCE_KEYS)
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE);

    TimelineEvent::new(from_time, to_time, summary, confidence)
}

/// Normalize a batch of raw findings, in order.
pub fn normalize_findings(raws: &[Value]) -> Vec<TimelineEvent> {
    raws.iter().map(normalize_finding).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_priority_order() {
        // "startTime" outranks "start"
        let event = normalize_finding(&json!({
            "startTime": "00:10",
            "start": 99,
            "endTime": 12,
            "description": "person at gate",
            "confidence": 0.8,
        }));

        assert_eq!(event.from_time, 10.0);
        assert_eq!(event.to_time, 12.0);
        assert_eq!(event.summary, "person at gate");
        assert_eq!(event.confidence, 0.8);
    }

    #[test]
    fn test_synonym_fields() {
        let event = normalize_finding(&json!({
            "from": "01:00",
            "to": "01:30",
            "label": "vehicle departs",
            "score": 0.72,
        }));

        assert_eq!(event.from_time, 60.0);
        assert_eq!(event.to_time, 90.0);
        assert_eq!(event.summary, "vehicle departs");
        assert_eq!(event.confidence, 0.72);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let event = normalize_finding(&json!({}));

        assert_eq!(event.from_time, 0.0);
        assert_eq!(event.to_time, 0.0);
        assert_eq!(event.summary, DEFAULT_SUMMARY);
        assert_eq!(event.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_mistyped_fields_degrade() {
        let event = normalize_finding(&json!({
            "startTime": {"nested": true},
            "endTime": "garbage",
            "description": 42,
            "confidence": "high",
        }));

        assert_eq!(event.from_time, 0.0);
        assert_eq!(event.to_time, 0.0);
        assert_eq!(event.summary, DEFAULT_SUMMARY);
        assert_eq!(event.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_missing_end_falls_back_to_start() {
        let event = normalize_finding(&json!({"start": 30}));
        assert_eq!(event.from_time, 30.0);
        assert_eq!(event.to_time, 30.0);
    }

    #[test]
    fn test_batch_preserves_order() {
        let events = normalize_findings(&[
            json!({"start": 5, "end": 6, "summary": "a"}),
            json!({"start": 1, "end": 2, "summary": "b"}),
        ]);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "a");
        assert_eq!(events[1].summary, "b");
    }
}
