//! The session engine: submission pipeline over the session reducer.
//!
//! The engine exclusively owns one [`EvidenceSession`] and is the only
//! mutator of it. A submission validates its inputs, appends the user turn
//! and a pending assistant placeholder atomically, drives the
//! upload/inference stages, and resolves the placeholder in place by id.
//! Resume is idempotent and keyed on work already completed: once the
//! session has a storage key, no prompt ever re-hashes or re-uploads the
//! evidence.
//!
//! The case store is mirrored best-effort while a submission is in flight:
//! losing the mirror must not lose the answer, so append/save failures are
//! logged and analysis continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{CaseStore, InferenceClient, InferenceRequest, ObjectStore, UserId};
use crate::domain::{EvidenceSession, FindingsBatch, TimelineEvent, Turn};
use crate::fingerprint::FingerprintGenerator;

use super::error::EngineError;
use super::findings;
use super::reducer::{apply, SessionAction};

/// Progress callback for the fingerprint/upload stage.
pub type ProgressHook = Box<dyn FnMut(f64) + Send>;

/// Drives one evidence session through its lifecycle.
pub struct SessionEngine {
    session: EvidenceSession,
    user: UserId,
    store: Arc<dyn CaseStore>,
    objects: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceClient>,
    fingerprinter: FingerprintGenerator,
    model_id: Option<String>,
    attachment: Option<PathBuf>,
    attachment_hashed: bool,
    progress: Option<ProgressHook>,
}

impl SessionEngine {
    /// Create an engine with a fresh idle session.
    pub fn new(
        user: UserId,
        store: Arc<dyn CaseStore>,
        objects: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            session: EvidenceSession::new(),
            user,
            store,
            objects,
            inference,
            fingerprinter: FingerprintGenerator::new(),
            model_id: None,
            attachment: None,
            attachment_hashed: false,
            progress: None,
        }
    }

    /// Resume an engine over a previously persisted session.
    pub async fn resume(
        user: UserId,
        store: Arc<dyn CaseStore>,
        objects: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceClient>,
        session_id: &str,
    ) -> Result<Self, EngineError> {
        let session = store
            .load_session(&user, session_id)
            .await
            .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;

        let mut engine = Self::new(user, store, objects, inference);
        engine.session = session;
        Ok(engine)
    }

    /// Override the model passed to the inference collaborator.
    pub fn set_model_id(&mut self, model_id: Option<String>) {
        self.model_id = model_id;
    }

    /// Replace the fingerprint generator (chunk size tuning).
    pub fn set_fingerprinter(&mut self, fingerprinter: FingerprintGenerator) {
        self.fingerprinter = fingerprinter;
    }

    /// Install a progress callback for the fingerprint stage.
    pub fn on_fingerprint_progress(&mut self, hook: ProgressHook) {
        self.progress = Some(hook);
    }

    /// The current session record.
    pub fn session(&self) -> &EvidenceSession {
        &self.session
    }

    /// The cumulative timeline across all turns.
    pub fn events(&self) -> &[TimelineEvent] {
        &self.session.events
    }

    /// Attach a video file. On a session that is already durable this is the
    /// deliberate act of replacing the evidence: the new file is hashed
    /// independently on the next submission, and prior events are kept.
    pub fn attach_evidence(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.dispatch(SessionAction::EvidenceAttached {
            name,
            local_reference: Some(path.display().to_string()),
        });
        self.attachment = Some(path.to_path_buf());
        self.attachment_hashed = false;
    }

    /// Explicit new-session reset: clears events and conversation and drops
    /// interest in any in-flight work.
    pub fn reset(&mut self) {
        self.attachment = None;
        self.attachment_hashed = false;
        self.dispatch(SessionAction::Reset);
        info!("Session reset");
    }

    /// Submit a prompt against the session.
    ///
    /// Returns the id of the assistant turn that resolved (or failed). The
    /// session never loses prior turns or events on failure, and a
    /// resubmission re-attempts only the failed stage.
    #[instrument(skip(self, prompt), fields(session = %self.session.id))]
    pub async fn submit(&mut self, prompt: &str) -> Result<Uuid, EngineError> {
        let prompt = prompt.trim();
        if prompt.is_empty() || (self.attachment.is_none() && !self.session.is_durable()) {
            return Err(EngineError::MissingEvidence);
        }
        if self.session.pending_turn().is_some() {
            return Err(EngineError::TurnPending);
        }

        self.ensure_persisted().await;

        // User turn and placeholder land in one dispatch so no observer can
        // see one without the other.
        let user_turn = Turn::user(prompt);
        let placeholder = Turn::pending_assistant();
        let turn_id = placeholder.id;
        self.mirror_turn(&user_turn).await;
        self.mirror_turn(&placeholder).await;
        self.dispatch(SessionAction::TurnsAppended {
            user: user_turn,
            placeholder,
        });

        if let Err(e) = self.ensure_durable(turn_id).await {
            self.mirror_session().await;
            return Err(e);
        }

        self.dispatch(SessionAction::AnalysisStarted);
        self.mirror_session().await;

        let reference = self
            .session
            .video_reference
            .clone()
            .or_else(|| self.session.storage_key.clone())
            .ok_or(EngineError::MissingEvidence)?;

        let request = InferenceRequest {
            evidence_reference: reference,
            prompt: prompt.to_string(),
            model_id: self.model_id.clone(),
        };

        match self.inference.analyze(&request).await {
            Ok(response) => {
                let events = findings::normalize_findings(&response.findings);
                let summary = response.summary.unwrap_or_else(|| {
                    format!("Analysis complete: {} event(s) detected.", events.len())
                });

                info!(count = events.len(), "Findings received");
                self.dispatch(SessionAction::TurnResolved {
                    turn_id,
                    text: summary.clone(),
                    findings: Some(FindingsBatch {
                        summary,
                        events,
                    }),
                });
                self.mirror_resolved_turn(turn_id).await;
                self.mirror_session().await;
                Ok(turn_id)
            }
            Err(e) => {
                let failure = EngineError::InferenceFailure(e.to_string());
                self.fail_turn(turn_id, format!("Analysis failed: {}", e)).await;
                Err(failure)
            }
        }
    }

    /// Make the attached evidence durable, if a fresh attachment exists.
    ///
    /// With no attachment the storage key is the single source of truth:
    /// its presence means the bytes are already durable and the stage is
    /// skipped entirely.
    async fn ensure_durable(&mut self, turn_id: Uuid) -> Result<(), EngineError> {
        let path = match self.attachment.clone() {
            Some(path) => path,
            None => return Ok(()),
        };

        self.dispatch(SessionAction::UploadStarted);
        self.mirror_session().await;

        // Hashing completed on a prior attempt is not repeated; a retry
        // after a failed upload re-attempts only the upload stage.
        if !self.attachment_hashed {
            let mut progress = self.progress.take();
            let digest = self
                .fingerprinter
                .digest_file(&path, |p| {
                    if let Some(cb) = progress.as_mut() {
                        cb(p);
                    }
                })
                .await;
            self.progress = progress;

            let fingerprint = match digest {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    let message = format!("Could not read the evidence file: {}", e);
                    self.fail_turn(turn_id, message).await;
                    return Err(EngineError::Fingerprint(e));
                }
            };

            self.dispatch(SessionAction::FingerprintComputed { fingerprint });
            self.attachment_hashed = true;
        }

        // Invariant: FingerprintComputed always sets the storage key
        let key = match self.session.storage_key.clone() {
            Some(key) => key,
            None => return Err(EngineError::UploadFailure("storage key missing".into())),
        };

        match self.objects.put(&key, &path).await {
            Ok(reference) => {
                info!(%key, "Evidence durable");
                self.dispatch(SessionAction::UploadCompleted { reference });
                self.attachment = None;
                self.attachment_hashed = false;
                Ok(())
            }
            Err(e) => {
                let failure = EngineError::UploadFailure(e.to_string());
                self.fail_turn(turn_id, format!("Upload failed: {}", e)).await;
                Err(failure)
            }
        }
    }

    /// Resolve the pending turn as failed and mirror the result.
    async fn fail_turn(&mut self, turn_id: Uuid, message: String) {
        warn!(%turn_id, %message, "Turn failed");
        self.dispatch(SessionAction::TurnFailed { turn_id, message });
        self.mirror_resolved_turn(turn_id).await;
        self.mirror_session().await;
    }

    fn dispatch(&mut self, action: SessionAction) {
        let session = std::mem::take(&mut self.session);
        self.session = apply(session, action);
    }

    /// Assign a persistence id if the session has none yet. Best-effort:
    /// the engine keeps working in memory if the store is down.
    async fn ensure_persisted(&mut self) {
        if self.session.is_persisted() {
            return;
        }

        match self.store.create_session(&self.user, &self.session).await {
            Ok(id) => self.session.id = id,
            Err(e) => warn!(error = %e, "Could not persist session, continuing in memory"),
        }
    }

    async fn mirror_turn(&self, turn: &Turn) {
        if !self.session.is_persisted() {
            return;
        }
        if let Err(e) = self
            .store
            .append_turn(&self.user, &self.session.id, turn)
            .await
        {
            warn!(error = %e, "Could not mirror turn to the case store");
        }
    }

    async fn mirror_resolved_turn(&self, turn_id: Uuid) {
        if let Some(turn) = self.session.conversation.iter().find(|t| t.id == turn_id) {
            self.mirror_turn(turn).await;
        }
    }

    async fn mirror_session(&self) {
        if !self.session.is_persisted() {
            return;
        }
        if let Err(e) = self.store.save_session(&self.user, &self.session).await {
            warn!(error = %e, "Could not mirror session to the case store");
        }
    }
}
