//! Collaborator interfaces for external systems.
//!
//! The engine owns none of the storage, inference, persistence, or identity
//! machinery; it consumes them through the narrow traits defined here.
//! Implementations are untrusted edges and return `anyhow::Result`; the
//! engine maps their failures into its own error taxonomy.

pub mod identity;
pub mod inference;
pub mod persistence;
pub mod storage;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Bookmark, EvidenceSession, TimelineEvent, Turn};

pub use identity::{EnvIdentity, IdentityProvider, UserId};
pub use inference::HttpInferenceClient;
pub use persistence::FileCaseStore;
pub use storage::FsObjectStore;

/// Request sent to the inference collaborator.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Durable reference to the uploaded evidence
    pub evidence_reference: String,

    /// The investigator's question
    pub prompt: String,

    /// Optional model override
    pub model_id: Option<String>,
}

/// Raw response from the inference collaborator.
///
/// Findings are kept as raw JSON values: any field may be absent or
/// mistyped, and normalization happens downstream in
/// [`crate::core::findings`].
#[derive(Debug, Clone, Default)]
pub struct InferenceResponse {
    /// Raw findings, one JSON object per detected event
    pub findings: Vec<serde_json::Value>,

    /// Overall answer text, if the model provided one
    pub summary: Option<String>,
}

/// Binary object storage, keyed by content fingerprint.
///
/// Keys are content-addressed, so a `put` of identical content is
/// idempotent: implementations must return the existing reference without
/// rewriting the object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the file at `source` under `key`, returning a durable
    /// reference usable for playback and inference.
    async fn put(&self, key: &str, source: &Path) -> Result<String>;
}

/// Remote model inference.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Human-readable client name
    fn name(&self) -> &str;

    /// Ask the model about the referenced evidence.
    async fn analyze(&self, request: &InferenceRequest) -> Result<InferenceResponse>;
}

/// Session, turn, and bookmark persistence, scoped per authenticated
/// identity. The store owns bookmark identifiers; the client only ever
/// references them.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Persist a new session, returning its assigned id.
    async fn create_session(&self, user: &UserId, session: &EvidenceSession) -> Result<String>;

    /// Overwrite the persisted document for an existing session.
    async fn save_session(&self, user: &UserId, session: &EvidenceSession) -> Result<()>;

    /// Load a session, with its conversation folded from the turn log.
    async fn load_session(&self, user: &UserId, session_id: &str) -> Result<EvidenceSession>;

    /// List the user's sessions, most recent first.
    async fn list_sessions(&self, user: &UserId) -> Result<Vec<EvidenceSession>>;

    /// Delete a session and everything persisted under it.
    async fn delete_session(&self, user: &UserId, session_id: &str) -> Result<()>;

    /// Append a turn state to the session's turn log.
    async fn append_turn(&self, user: &UserId, session_id: &str, turn: &Turn) -> Result<()>;

    /// List turns in creation order, one entry per turn id (latest state
    /// wins for turns that resolved after their pending append).
    async fn list_turns(&self, user: &UserId, session_id: &str) -> Result<Vec<Turn>>;

    /// Create a bookmark from an event's current fields, returning the
    /// stored bookmark with its assigned id.
    async fn create_bookmark(
        &self,
        user: &UserId,
        session_id: &str,
        event: &TimelineEvent,
    ) -> Result<Bookmark>;

    /// List all bookmarks for a session.
    async fn list_bookmarks(&self, user: &UserId, session_id: &str) -> Result<Vec<Bookmark>>;

    /// Delete a bookmark by its assigned id.
    async fn delete_bookmark(&self, user: &UserId, session_id: &str, bookmark_id: &str)
        -> Result<()>;
}
