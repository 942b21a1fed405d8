//! Engine error taxonomy.
//!
//! Every failure is scoped to the current operation and leaves the session
//! resumable; nothing here is fatal.

use thiserror::Error;

use crate::fingerprint::FingerprintError;

/// Errors surfaced by the session engine and reconciler.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fingerprinting I/O failure while reading the evidence file
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Submission without a file attached or a previously uploaded video
    #[error("a prompt and either an attached file or uploaded evidence are required")]
    MissingEvidence,

    /// A prior turn is still pending; turns must resolve in submission order
    #[error("a previous prompt is still being analyzed")]
    TurnPending,

    /// No timeline event exists at the given display index
    #[error("no timeline event at index {0}")]
    UnknownEvent(usize),

    /// The object store failed to make the evidence durable
    #[error("evidence upload failed: {0}")]
    UploadFailure(String),

    /// The inference call failed or returned an unusable response
    #[error("inference failed: {0}")]
    InferenceFailure(String),

    /// A bookmark or turn read/write against the persistence collaborator
    /// failed
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
}
