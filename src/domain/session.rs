//! Evidence session state.
//!
//! An `EvidenceSession` is the unit of work for one video: its lifecycle
//! status, durable storage coordinates, the cumulative timeline of findings,
//! and the conversation log. The record is exclusively owned by the engine;
//! all transitions go through the reducer in `crate::core::reducer`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timeline::TimelineEvent;
use super::turn::Turn;

/// Lifecycle status of a session.
///
/// Status only moves forward through the lifecycle, except for the explicit
/// reset back to `Idle` and the `Ready -> Analyzing` loop for follow-up
/// prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No work in flight
    Idle,

    /// Evidence bytes are being fingerprinted and stored
    Uploading,

    /// An inference call is in flight
    Analyzing,

    /// At least one well-formed findings list has been received
    Ready,

    /// The last operation failed; prior data is preserved
    Error,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Ready => "ready",
            SessionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// The unit of work for one video under investigation.
///
/// Invariants:
/// - `storage_key` is set if and only if `fingerprint` is set
/// - `events` is append-only within a session except on explicit reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSession {
    /// Persistence identifier; empty string until first persisted
    #[serde(default)]
    pub id: String,

    /// Current lifecycle status
    #[serde(default)]
    pub status: SessionStatus,

    /// Playback locator: a transient local reference before upload, then
    /// the durable reference returned by the object store
    pub video_reference: Option<String>,

    /// Display name of the attached video
    #[serde(default)]
    pub video_name: String,

    /// Lowercase hex content digest of the video bytes
    pub fingerprint: Option<String>,

    /// Content-addressed object key derived from the fingerprint
    pub storage_key: Option<String>,

    /// Cumulative timeline of findings across all turns
    #[serde(default)]
    pub events: Vec<TimelineEvent>,

    /// Ordered conversation log
    #[serde(default)]
    pub conversation: Vec<Turn>,

    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl EvidenceSession {
    /// Create a fresh, unpersisted idle session.
    pub fn new() -> Self {
        Self {
            id: String::new(),
            status: SessionStatus::Idle,
            video_reference: None,
            video_name: String::new(),
            fingerprint: None,
            storage_key: None,
            events: Vec::new(),
            conversation: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether this session has been persisted yet.
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Whether the evidence bytes are already durably stored.
    ///
    /// The presence of a storage key is the single source of truth for
    /// "already durable": no re-hash or re-upload happens once it is set.
    pub fn is_durable(&self) -> bool {
        self.storage_key.is_some()
    }

    /// The pending assistant turn, if one exists.
    ///
    /// At most one turn may be pending at a time; submissions are rejected
    /// while one is outstanding so turns resolve in submission order.
    pub fn pending_turn(&self) -> Option<&Turn> {
        self.conversation.iter().find(|t| t.is_pending())
    }

    /// Locate a turn by id for in-place resolution.
    pub fn find_turn_mut(&mut self, id: Uuid) -> Option<&mut Turn> {
        self.conversation.iter_mut().find(|t| t.id == id)
    }
}

impl Default for EvidenceSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::turn::TurnState;

    #[test]
    fn test_new_session_is_idle_and_unpersisted() {
        let session = EvidenceSession::new();

        assert_eq!(session.status, SessionStatus::Idle);
        assert!(!session.is_persisted());
        assert!(!session.is_durable());
        assert!(session.events.is_empty());
        assert!(session.conversation.is_empty());
    }

    #[test]
    fn test_pending_turn_lookup() {
        let mut session = EvidenceSession::new();
        session.conversation.push(Turn::user("first question"));
        assert!(session.pending_turn().is_none());

        let placeholder = Turn::pending_assistant();
        let id = placeholder.id;
        session.conversation.push(placeholder);

        assert_eq!(session.pending_turn().unwrap().id, id);

        session
            .find_turn_mut(id)
            .unwrap()
            .resolve("done", None);
        assert!(session.pending_turn().is_none());
        assert_eq!(session.conversation[1].state, TurnState::Resolved);
    }

    #[test]
    fn test_session_serialization() {
        let mut session = EvidenceSession::new();
        session.video_name = "gate_cam.mp4".to_string();
        session.fingerprint = Some("abc123".to_string());
        session.storage_key = Some("abc123.mp4".to_string());

        let json = serde_json::to_string(&session).unwrap();
        let parsed: EvidenceSession = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.video_name, "gate_cam.mp4");
        assert_eq!(parsed.storage_key.as_deref(), Some("abc123.mp4"));
    }
}
