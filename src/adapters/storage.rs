//! Content-addressed filesystem object store.
//!
//! Objects land at `<root>/<key>` where the key is the evidence fingerprint
//! plus a fixed extension, so identical content always maps to one stored
//! object and a repeat `put` is a no-op.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::ObjectStore;

/// Filesystem-backed object store.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, source: &Path) -> Result<String> {
        let dest = self.object_path(key);

        if fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(%key, "Object already durable, skipping write");
            return Ok(dest.display().to_string());
        }

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create object store root: {}", self.root.display()))?;

        // Write through a temp name so a crashed copy never leaves a
        // half-written object at the content-addressed key.
        let staging = self.root.join(format!(".{}.partial", key));
        fs::copy(source, &staging)
            .await
            .with_context(|| format!("Failed to stage object from {}", source.display()))?;
        fs::rename(&staging, &dest)
            .await
            .with_context(|| format!("Failed to commit object: {}", dest.display()))?;

        info!(%key, source = %source.display(), "Evidence stored");
        Ok(dest.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_idempotent_repeat() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"evidence bytes").await.unwrap();

        let store = FsObjectStore::new(dir.path().join("objects"));
        let reference = store.put("abc123.mp4", &source).await.unwrap();
        assert!(reference.ends_with("abc123.mp4"));

        // Mutate the source; a repeat put must not rewrite the object
        tokio::fs::write(&source, b"different bytes").await.unwrap();
        let second = store.put("abc123.mp4", &source).await.unwrap();
        assert_eq!(second, reference);

        let stored = tokio::fs::read(dir.path().join("objects/abc123.mp4"))
            .await
            .unwrap();
        assert_eq!(stored, b"evidence bytes");
    }

    #[tokio::test]
    async fn test_put_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path().join("objects"));

        let result = store
            .put("abc.mp4", &dir.path().join("missing.mp4"))
            .await;
        assert!(result.is_err());
    }
}
