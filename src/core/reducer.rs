//! Session state transitions.
//!
//! Every lifecycle change goes through [`apply`], a pure function from
//! `(session, action)` to the next session state. The engine only dispatches
//! actions and stores the latest result, which keeps each transition
//! independently testable.
//!
//! Transition map:
//!
//! ```text
//! idle       --UploadStarted-->    uploading
//! uploading  --AnalysisStarted-->  analyzing
//! ready      --AnalysisStarted-->  analyzing     (follow-up prompt)
//! analyzing  --TurnResolved-->     ready
//! analyzing  --TurnFailed-->       error
//! error      --UploadStarted-->    uploading     (retry of a failed upload)
//! error      --AnalysisStarted-->  analyzing     (retry of failed inference)
//! any        --Reset-->            idle          (clears events + turns)
//! ```
//!
//! Actions that are invalid for the current status leave the session
//! unchanged; status never moves backward except through `Reset`.

use tracing::debug;
use uuid::Uuid;

use crate::domain::{EvidenceSession, FindingsBatch, SessionStatus, Turn};

/// An event dispatched against the session record.
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// A video file was attached: record its name and transient local
    /// reference for playback before upload completes.
    EvidenceAttached {
        name: String,
        local_reference: Option<String>,
    },

    /// Fingerprinting finished; derive the content-addressed storage key.
    FingerprintComputed { fingerprint: String },

    /// The upload stage began.
    UploadStarted,

    /// The evidence bytes are durable; swap in the durable reference.
    UploadCompleted { reference: String },

    /// An inference call is in flight.
    AnalysisStarted,

    /// A user turn and its pending assistant placeholder, appended
    /// atomically in that order.
    TurnsAppended { user: Turn, placeholder: Turn },

    /// The pending turn identified by `turn_id` resolved; its findings are
    /// folded into the session's flat event list.
    TurnResolved {
        turn_id: Uuid,
        text: String,
        findings: Option<FindingsBatch>,
    },

    /// The pending turn identified by `turn_id` failed with a visible
    /// message; prior events and turns are preserved.
    TurnFailed { turn_id: Uuid, message: String },

    /// Explicit new-session reset.
    Reset,
}

/// Fixed extension appended to the fingerprint to form the storage key.
const STORAGE_EXTENSION: &str = "mp4";

/// Apply an action to a session, returning the next session state.
pub fn apply(mut session: EvidenceSession, action: SessionAction) -> EvidenceSession {
    match action {
        SessionAction::EvidenceAttached {
            name,
            local_reference,
        } => {
            session.video_name = name;
            if local_reference.is_some() {
                session.video_reference = local_reference;
            }
        }

        SessionAction::FingerprintComputed { fingerprint } => {
            // fingerprint and storage_key are set together, never apart
            session.storage_key = Some(format!("{}.{}", fingerprint, STORAGE_EXTENSION));
            session.fingerprint = Some(fingerprint);
        }

        SessionAction::UploadStarted => {
            if session.status == SessionStatus::Idle || session.status == SessionStatus::Error {
                session.status = SessionStatus::Uploading;
            } else {
                debug!(status = %session.status, "Ignoring UploadStarted");
            }
        }

        SessionAction::UploadCompleted { reference } => {
            session.video_reference = Some(reference);
        }

        SessionAction::AnalysisStarted => {
            if matches!(
                session.status,
                SessionStatus::Uploading | SessionStatus::Ready | SessionStatus::Error
            ) {
                session.status = SessionStatus::Analyzing;
            } else {
                debug!(status = %session.status, "Ignoring AnalysisStarted");
            }
        }

        SessionAction::TurnsAppended { user, placeholder } => {
            // The user turn lands first so the log never shows a
            // placeholder without its prompt.
            session.conversation.push(user);
            session.conversation.push(placeholder);
        }

        SessionAction::TurnResolved {
            turn_id,
            text,
            findings,
        } => {
            let new_events = findings
                .as_ref()
                .map(|f| f.events.clone())
                .unwrap_or_default();

            match session.find_turn_mut(turn_id) {
                Some(turn) if turn.is_pending() => {
                    turn.resolve(text, findings);
                    // History is cumulative: append, never replace
                    session.events.extend(new_events);
                    session.status = SessionStatus::Ready;
                }
                _ => debug!(%turn_id, "Ignoring TurnResolved for unknown or settled turn"),
            }
        }

        SessionAction::TurnFailed { turn_id, message } => {
            match session.find_turn_mut(turn_id) {
                Some(turn) if turn.is_pending() => {
                    turn.fail(message);
                    session.status = SessionStatus::Error;
                }
                _ => debug!(%turn_id, "Ignoring TurnFailed for unknown or settled turn"),
            }
        }

        SessionAction::Reset => {
            session = EvidenceSession::new();
        }
    }

    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimelineEvent;

    fn attached_session() -> EvidenceSession {
        apply(
            EvidenceSession::new(),
            SessionAction::EvidenceAttached {
                name: "gate_cam.mp4".to_string(),
                local_reference: Some("/tmp/gate_cam.mp4".to_string()),
            },
        )
    }

    fn batch(n: usize) -> FindingsBatch {
        FindingsBatch {
            summary: format!("{} events", n),
            events: (0..n)
                .map(|i| TimelineEvent::new(i as f64, i as f64 + 1.0, "motion", 0.9))
                .collect(),
        }
    }

    #[test]
    fn test_fingerprint_sets_storage_key_together() {
        let session = apply(
            attached_session(),
            SessionAction::FingerprintComputed {
                fingerprint: "abc123".to_string(),
            },
        );

        assert_eq!(session.fingerprint.as_deref(), Some("abc123"));
        assert_eq!(session.storage_key.as_deref(), Some("abc123.mp4"));
        assert!(session.is_durable());
    }

    #[test]
    fn test_full_lifecycle_to_ready() {
        let mut session = attached_session();
        session = apply(session, SessionAction::UploadStarted);
        assert_eq!(session.status, SessionStatus::Uploading);

        let user = Turn::user("what happens?");
        let placeholder = Turn::pending_assistant();
        let turn_id = placeholder.id;
        session = apply(session, SessionAction::TurnsAppended { user, placeholder });

        session = apply(
            session,
            SessionAction::UploadCompleted {
                reference: "/objects/abc123.mp4".to_string(),
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        assert_eq!(session.status, SessionStatus::Analyzing);

        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id,
                text: "2 events".to_string(),
                findings: Some(batch(2)),
            },
        );

        assert_eq!(session.status, SessionStatus::Ready);
        assert_eq!(session.events.len(), 2);
        let resolved = &session.conversation[1];
        assert!(!resolved.is_pending());
        assert_eq!(resolved.findings.as_ref().unwrap().events.len(), 2);
    }

    #[test]
    fn test_followup_keeps_prior_events() {
        let mut session = attached_session();
        session = apply(session, SessionAction::UploadStarted);

        let first = Turn::pending_assistant();
        let first_id = first.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q1"),
                placeholder: first,
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: first_id,
                text: "2 events".to_string(),
                findings: Some(batch(2)),
            },
        );

        // Follow-up against the ready session
        let second = Turn::pending_assistant();
        let second_id = second.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q2"),
                placeholder: second,
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        assert_eq!(session.status, SessionStatus::Analyzing);

        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: second_id,
                text: "1 event".to_string(),
                findings: Some(batch(1)),
            },
        );

        assert_eq!(session.events.len(), 3);
        assert_eq!(session.conversation.len(), 4);
    }

    #[test]
    fn test_failure_preserves_prior_data() {
        let mut session = attached_session();
        session = apply(session, SessionAction::UploadStarted);

        let first = Turn::pending_assistant();
        let first_id = first.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q1"),
                placeholder: first,
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: first_id,
                text: "2 events".to_string(),
                findings: Some(batch(2)),
            },
        );

        let second = Turn::pending_assistant();
        let second_id = second.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q2"),
                placeholder: second,
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        session = apply(
            session,
            SessionAction::TurnFailed {
                turn_id: second_id,
                message: "inference failed: timeout".to_string(),
            },
        );

        assert_eq!(session.status, SessionStatus::Error);
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.conversation.len(), 4);
        assert_eq!(
            session.conversation[3].text,
            "inference failed: timeout"
        );
    }

    #[test]
    fn test_status_never_regresses_without_reset() {
        let mut session = attached_session();
        session = apply(session, SessionAction::UploadStarted);

        let placeholder = Turn::pending_assistant();
        let id = placeholder.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q"),
                placeholder,
            },
        );
        session = apply(session, SessionAction::AnalysisStarted);
        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: id,
                text: "done".to_string(),
                findings: None,
            },
        );
        assert_eq!(session.status, SessionStatus::Ready);

        // Ready never regresses to uploading
        let session = apply(session, SessionAction::UploadStarted);
        assert_eq!(session.status, SessionStatus::Ready);
    }

    #[test]
    fn test_resolved_turn_is_immutable() {
        let mut session = attached_session();
        let placeholder = Turn::pending_assistant();
        let id = placeholder.id;
        session = apply(
            session,
            SessionAction::TurnsAppended {
                user: Turn::user("q"),
                placeholder,
            },
        );
        session = apply(session, SessionAction::UploadStarted);
        session = apply(session, SessionAction::AnalysisStarted);
        session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: id,
                text: "first".to_string(),
                findings: Some(batch(1)),
            },
        );

        // A second resolution of the same turn is a no-op
        let session = apply(
            session,
            SessionAction::TurnResolved {
                turn_id: id,
                text: "second".to_string(),
                findings: Some(batch(5)),
            },
        );

        assert_eq!(session.conversation[1].text, "first");
        assert_eq!(session.events.len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = attached_session();
        session = apply(
            session,
            SessionAction::FingerprintComputed {
                fingerprint: "abc".to_string(),
            },
        );
        session.events.push(TimelineEvent::new(1.0, 2.0, "x", 0.9));
        session.conversation.push(Turn::user("q"));

        let session = apply(session, SessionAction::Reset);

        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.events.is_empty());
        assert!(session.conversation.is_empty());
        assert!(session.fingerprint.is_none());
        assert!(session.storage_key.is_none());
    }
}
