//! Saved-event reconciliation.
//!
//! Timeline events have no identity beyond structural equality, and
//! bookmarks are owned by the persistence collaborator, so there is no
//! foreign key between the two datasets. Reconciliation is a best-effort
//! fuzzy match: a displayed event is "saved" when some bookmark's
//! `from_time` is within a small tolerance of the event's AND the summaries
//! are exactly equal. First match wins.
//!
//! Known limitation: duplicate findings with identical time and summary are
//! indistinguishable from each other; each display index simply matches the
//! first bookmark that fits, and two such events may map to the same
//! bookmark presentation.
//!
//! The local cache is subordinate to the store: on any failure the prior
//! saved view is left unchanged, and on any ambiguity the caller should
//! re-fetch rather than trust the cache.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::adapters::{CaseStore, UserId};
use crate::domain::{Bookmark, TimelineEvent};

use super::error::EngineError;

/// Default `from_time` tolerance in seconds, absorbing float round-trip
/// drift through the persistence layer.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Find the first bookmark matching an event under the tolerance rule.
pub fn match_bookmark<'a>(
    event: &TimelineEvent,
    bookmarks: &'a [Bookmark],
    tolerance: f64,
) -> Option<&'a Bookmark> {
    bookmarks
        .iter()
        .find(|b| (b.from_time - event.from_time).abs() < tolerance && b.summary == event.summary)
}

/// Reconciles the displayed timeline against the persisted bookmark set.
pub struct SavedEventReconciler {
    tolerance: f64,

    /// Matched bookmark ids, keyed by display index
    saved: HashMap<usize, String>,
}

impl Default for SavedEventReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl SavedEventReconciler {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            saved: HashMap::new(),
        }
    }

    /// Whether the event at a display index is currently saved.
    pub fn is_saved(&self, index: usize) -> bool {
        self.saved.contains_key(&index)
    }

    /// The cached bookmark id for a display index, if saved.
    pub fn saved_id(&self, index: usize) -> Option<&str> {
        self.saved.get(&index).map(String::as_str)
    }

    /// Number of displayed events currently matched to a bookmark.
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }

    /// Re-fetch the bookmark set and rebuild the saved view for the given
    /// events. On a store failure the prior view is left unchanged and a
    /// `PersistenceFailure` is returned for a non-fatal notice.
    pub async fn refresh(
        &mut self,
        store: &dyn CaseStore,
        user: &UserId,
        session_id: &str,
        events: &[TimelineEvent],
    ) -> Result<(), EngineError> {
        let bookmarks = store
            .list_bookmarks(user, session_id)
            .await
            .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;

        let mut saved = HashMap::new();
        for (index, event) in events.iter().enumerate() {
            if let Some(bookmark) = match_bookmark(event, &bookmarks, self.tolerance) {
                saved.insert(index, bookmark.id.clone());
            }
        }

        debug!(
            events = events.len(),
            bookmarks = bookmarks.len(),
            matched = saved.len(),
            "Reconciled saved events"
        );
        self.saved = saved;
        Ok(())
    }

    /// Toggle the saved state of the event at a display index.
    ///
    /// Returns the new saved state. The remote call happens first and the
    /// cache is only mutated on success, so a failed call never changes the
    /// local view.
    pub async fn toggle(
        &mut self,
        store: &dyn CaseStore,
        user: &UserId,
        session_id: &str,
        index: usize,
        events: &[TimelineEvent],
    ) -> Result<bool, EngineError> {
        if let Some(bookmark_id) = self.saved.get(&index).cloned() {
            store
                .delete_bookmark(user, session_id, &bookmark_id)
                .await
                .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;

            self.saved.remove(&index);
            info!(index, %bookmark_id, "Bookmark removed");
            Ok(false)
        } else {
            let event = events.get(index).ok_or(EngineError::UnknownEvent(index))?;

            let bookmark = store
                .create_bookmark(user, session_id, event)
                .await
                .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;

            info!(index, bookmark_id = %bookmark.id, "Bookmark created");
            self.saved.insert(index, bookmark.id);
            Ok(true)
        }
    }
}
