//! evicase - session engine for AI-assisted video evidence analysis
//!
//! An investigator attaches a video file to a case, asks natural-language
//! questions about its contents, and receives time-ranged findings that can
//! be saved and compiled into a narrative report.
//!
//! # Architecture
//!
//! The engine is built around an explicit state-transition function:
//! - Every session lifecycle change is a `SessionAction` applied by a pure
//!   reducer, so each transition is independently testable
//! - External systems (object storage, inference, persistence, identity)
//!   are consumed through narrow adapter traits
//! - Findings from the untrusted inference collaborator pass through a
//!   normalization adapter before touching session state
//!
//! # Modules
//!
//! - `adapters`: External collaborator traits and reference implementations
//! - `core`: Engine logic (reducer, pipeline, reconciler, report)
//! - `domain`: Data structures (EvidenceSession, Turn, TimelineEvent)
//! - `fingerprint`: Streaming content fingerprinting
//! - `timecode`: Timestamp normalization
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start a session: attach evidence and ask the first question
//! evicase analyze gate_cam.mp4 "when does anyone approach the gate?"
//!
//! # Follow up against the same session (no re-upload)
//! evicase ask <session-id> "does the person in frame carry anything?"
//!
//! # Save finding 0, then compile the report
//! evicase mark <session-id> 0
//! evicase report <session-id> -o findings.md
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod fingerprint;
pub mod timecode;

// Re-export main types at crate root for convenience
pub use crate::adapters::{
    CaseStore, InferenceClient, InferenceRequest, InferenceResponse, ObjectStore,
};
pub use crate::core::{EngineError, SavedEventReconciler, SessionAction, SessionEngine};
pub use crate::domain::{Bookmark, EvidenceSession, SessionStatus, TimelineEvent, Turn, TurnState};
pub use crate::fingerprint::{FingerprintError, FingerprintGenerator};
