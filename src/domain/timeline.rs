//! Timeline events and bookmarks.
//!
//! A timeline event is one time-ranged finding produced by analysis. Events
//! carry no identity of their own beyond structural equality (time range +
//! summary); bookmarks are the externally persisted subset of events, each
//! with an identifier assigned by the persistence collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One time-ranged finding within the evidence video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Start of the range, in seconds from the beginning of the video
    pub from_time: f64,

    /// End of the range, in seconds (`from_time <= to_time`)
    pub to_time: f64,

    /// Free-text description of the finding
    pub summary: String,

    /// Model confidence in [0, 1]
    pub confidence: f64,
}

impl TimelineEvent {
    /// Create an event, clamping the fields into their valid ranges.
    pub fn new(from_time: f64, to_time: f64, summary: impl Into<String>, confidence: f64) -> Self {
        let from_time = from_time.max(0.0);
        Self {
            from_time,
            to_time: to_time.max(from_time),
            summary: summary.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A timeline event marked for inclusion in a report.
///
/// Owned by the persistence collaborator; the client only ever references
/// bookmarks by the `id` the collaborator assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    /// Identifier assigned by the persistence collaborator
    pub id: String,

    /// Start of the bookmarked range, in seconds
    pub from_time: f64,

    /// End of the bookmarked range, in seconds
    pub to_time: f64,

    /// Description copied from the event at save time
    pub summary: String,

    /// Confidence copied from the event at save time
    pub confidence: f64,

    /// When the bookmark was created
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Build a bookmark from an event's current fields.
    pub fn from_event(id: impl Into<String>, event: &TimelineEvent) -> Self {
        Self {
            id: id.into(),
            from_time: event.from_time,
            to_time: event.to_time,
            summary: event.summary.clone(),
            confidence: event.confidence,
            created_at: Utc::now(),
        }
    }
}
