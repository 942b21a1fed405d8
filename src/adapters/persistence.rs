//! File-backed case store.
//!
//! Sessions are persisted as JSON documents with an append-only JSONL turn
//! log beside them, scoped per identity:
//!
//! ```text
//! <root>/<user>/<session_id>/session.json
//! <root>/<user>/<session_id>/turns.jsonl
//! <root>/<user>/<session_id>/bookmarks.json
//! ```
//!
//! Turn resolution appends a second line for the same turn id; replaying the
//! log folds lines by id so the latest state wins while creation order is
//! preserved. Appends take an exclusive file lock so concurrent writers
//! cannot interleave partial lines.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use tokio::fs;
use uuid::Uuid;

use crate::domain::{Bookmark, EvidenceSession, TimelineEvent, Turn};

use super::{CaseStore, UserId};

/// JSON/JSONL case store rooted at a directory.
pub struct FileCaseStore {
    root: PathBuf,
}

impl FileCaseStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, user: &UserId, session_id: &str) -> PathBuf {
        self.root.join(user.as_str()).join(session_id)
    }

    fn session_path(&self, user: &UserId, session_id: &str) -> PathBuf {
        self.session_dir(user, session_id).join("session.json")
    }

    fn turns_path(&self, user: &UserId, session_id: &str) -> PathBuf {
        self.session_dir(user, session_id).join("turns.jsonl")
    }

    fn bookmarks_path(&self, user: &UserId, session_id: &str) -> PathBuf {
        self.session_dir(user, session_id).join("bookmarks.json")
    }

    async fn write_session_doc(&self, path: &Path, session: &EvidenceSession) -> Result<()> {
        let content =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write session: {}", path.display()))?;
        Ok(())
    }

    async fn read_bookmarks(&self, path: &Path) -> Result<Vec<Bookmark>> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read bookmarks: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse bookmarks JSON")
    }

    async fn write_bookmarks(&self, path: &Path, bookmarks: &[Bookmark]) -> Result<()> {
        let content =
            serde_json::to_string_pretty(bookmarks).context("Failed to serialize bookmarks")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write bookmarks: {}", path.display()))?;
        Ok(())
    }

    /// Fold a turn log into one entry per turn id, creation order preserved,
    /// latest appended state winning.
    fn fold_turns(lines: &str) -> Result<Vec<Turn>> {
        let mut turns: Vec<Turn> = Vec::new();
        let mut index_by_id: HashMap<Uuid, usize> = HashMap::new();

        for line in lines.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let turn: Turn = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse turn: {}", line))?;

            match index_by_id.get(&turn.id) {
                Some(&idx) => turns[idx] = turn,
                None => {
                    index_by_id.insert(turn.id, turns.len());
                    turns.push(turn);
                }
            }
        }

        Ok(turns)
    }
}

/// Append one line under an exclusive lock.
fn append_line_locked(path: &Path, line: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open turn log: {}", path.display()))?;

    file.lock_exclusive()
        .with_context(|| format!("Failed to lock turn log: {}", path.display()))?;
    let result = writeln!(file, "{}", line).context("Failed to append turn");
    let _ = fs2::FileExt::unlock(&file);
    result
}

#[async_trait]
impl CaseStore for FileCaseStore {
    async fn create_session(&self, user: &UserId, session: &EvidenceSession) -> Result<String> {
        let mut doc = session.clone();
        if doc.id.is_empty() {
            doc.id = Uuid::new_v4().to_string();
        }

        let dir = self.session_dir(user, &doc.id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;

        self.write_session_doc(&self.session_path(user, &doc.id), &doc)
            .await?;
        Ok(doc.id)
    }

    async fn save_session(&self, user: &UserId, session: &EvidenceSession) -> Result<()> {
        anyhow::ensure!(!session.id.is_empty(), "Cannot save an unpersisted session");

        let dir = self.session_dir(user, &session.id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;

        self.write_session_doc(&self.session_path(user, &session.id), session)
            .await
    }

    async fn load_session(&self, user: &UserId, session_id: &str) -> Result<EvidenceSession> {
        let path = self.session_path(user, session_id);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Session not found: {}", session_id))?;

        let mut session: EvidenceSession =
            serde_json::from_str(&content).context("Failed to parse session JSON")?;

        // The turn log is authoritative for the conversation
        session.conversation = self.list_turns(user, session_id).await?;
        Ok(session)
    }

    async fn list_sessions(&self, user: &UserId) -> Result<Vec<EvidenceSession>> {
        let user_dir = self.root.join(user.as_str());
        if !fs::try_exists(&user_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&user_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(session) = self.load_session(user, name).await {
                    sessions.push(session);
                }
            }
        }

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete_session(&self, user: &UserId, session_id: &str) -> Result<()> {
        let dir = self.session_dir(user, session_id);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            anyhow::bail!("Session not found: {}", session_id);
        }

        fs::remove_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to delete session: {}", session_id))
    }

    async fn append_turn(&self, user: &UserId, session_id: &str, turn: &Turn) -> Result<()> {
        let dir = self.session_dir(user, session_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;

        let line = serde_json::to_string(turn).context("Failed to serialize turn")?;
        append_line_locked(&self.turns_path(user, session_id), &line)
    }

    async fn list_turns(&self, user: &UserId, session_id: &str) -> Result<Vec<Turn>> {
        let path = self.turns_path(user, session_id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read turn log: {}", path.display()))?;
        Self::fold_turns(&content)
    }

    async fn create_bookmark(
        &self,
        user: &UserId,
        session_id: &str,
        event: &TimelineEvent,
    ) -> Result<Bookmark> {
        let dir = self.session_dir(user, session_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;

        let path = self.bookmarks_path(user, session_id);
        let mut bookmarks = self.read_bookmarks(&path).await?;

        let bookmark = Bookmark::from_event(Uuid::new_v4().to_string(), event);
        bookmarks.push(bookmark.clone());
        self.write_bookmarks(&path, &bookmarks).await?;

        Ok(bookmark)
    }

    async fn list_bookmarks(&self, user: &UserId, session_id: &str) -> Result<Vec<Bookmark>> {
        self.read_bookmarks(&self.bookmarks_path(user, session_id))
            .await
    }

    async fn delete_bookmark(
        &self,
        user: &UserId,
        session_id: &str,
        bookmark_id: &str,
    ) -> Result<()> {
        let path = self.bookmarks_path(user, session_id);
        let mut bookmarks = self.read_bookmarks(&path).await?;

        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != bookmark_id);
        if bookmarks.len() == before {
            anyhow::bail!("Bookmark not found: {}", bookmark_id);
        }

        self.write_bookmarks(&path, &bookmarks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_turns_latest_state_wins() {
        let mut pending = Turn::pending_assistant();
        let user_turn = Turn::user("question");

        let mut log = String::new();
        log.push_str(&serde_json::to_string(&user_turn).unwrap());
        log.push('\n');
        log.push_str(&serde_json::to_string(&pending).unwrap());
        log.push('\n');

        pending.resolve("answer", None);
        log.push_str(&serde_json::to_string(&pending).unwrap());
        log.push('\n');

        let turns = FileCaseStore::fold_turns(&log).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].id, user_turn.id);
        assert_eq!(turns[1].id, pending.id);
        assert!(!turns[1].is_pending());
        assert_eq!(turns[1].text, "answer");
    }

    #[test]
    fn test_fold_turns_skips_blank_lines() {
        let turn = Turn::user("q");
        let log = format!("\n{}\n\n", serde_json::to_string(&turn).unwrap());

        let turns = FileCaseStore::fold_turns(&log).unwrap();
        assert_eq!(turns.len(), 1);
    }
}
