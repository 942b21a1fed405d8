//! Conversation turns.
//!
//! A turn is one exchange in a session's conversation log. Assistant turns
//! are appended in a `Pending` state and later resolved in place by id, so
//! the conversation stays correct even if the surrounding list is reordered
//! or re-rendered while analysis is in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timeline::TimelineEvent;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle state of a turn.
///
/// Turns are immutable once out of `Pending`; exactly one turn transitions
/// from pending to resolved (or failed) per submitted prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Placeholder awaiting analysis
    Pending,

    /// Analysis completed, text (and possibly findings) attached
    Resolved,

    /// Analysis failed, text carries the failure message
    Failed,
}

/// The findings a resolved assistant turn produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingsBatch {
    /// Model-provided summary of the batch
    pub summary: String,

    /// Normalized timeline events
    pub events: Vec<TimelineEvent>,
}

/// One exchange in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier, used to resolve pending turns in place
    pub id: Uuid,

    /// Who produced this turn
    pub role: Role,

    /// Message text (failure message for failed turns)
    pub text: String,

    /// When the turn was appended
    pub created_at: DateTime<Utc>,

    /// Lifecycle state
    pub state: TurnState,

    /// Findings attached when the turn resolved with results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<FindingsBatch>,
}

impl Turn {
    /// Create a resolved user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            state: TurnState::Resolved,
            findings: None,
        }
    }

    /// Create a pending assistant placeholder.
    pub fn pending_assistant() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: String::new(),
            created_at: Utc::now(),
            state: TurnState::Pending,
            findings: None,
        }
    }

    /// Resolve this turn with text and optional findings.
    pub fn resolve(&mut self, text: impl Into<String>, findings: Option<FindingsBatch>) {
        self.text = text.into();
        self.state = TurnState::Resolved;
        self.findings = findings;
    }

    /// Mark this turn failed with a visible message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.text = message.into();
        self.state = TurnState::Failed;
        self.findings = None;
    }

    /// Whether this turn is still awaiting analysis.
    pub fn is_pending(&self) -> bool {
        self.state == TurnState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_placeholder_resolves_in_place() {
        let mut turn = Turn::pending_assistant();
        assert!(turn.is_pending());
        assert!(turn.text.is_empty());

        turn.resolve(
            "Two events detected.",
            Some(FindingsBatch {
                summary: "Two events detected.".to_string(),
                events: vec![TimelineEvent::new(1.0, 2.0, "motion", 0.9)],
            }),
        );

        assert_eq!(turn.state, TurnState::Resolved);
        assert_eq!(turn.findings.as_ref().unwrap().events.len(), 1);
    }

    #[test]
    fn test_failed_turn_drops_findings() {
        let mut turn = Turn::pending_assistant();
        turn.fail("inference failed: connection refused");

        assert_eq!(turn.state, TurnState::Failed);
        assert!(turn.findings.is_none());
        assert!(turn.text.contains("inference failed"));
    }

    #[test]
    fn test_turn_serialization() {
        let turn = Turn::user("what happens at the gate?");
        let json = serde_json::to_string(&turn).unwrap();
        let parsed: Turn = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, turn.id);
        assert_eq!(parsed.role, Role::User);
        assert_eq!(parsed.state, TurnState::Resolved);
    }
}
