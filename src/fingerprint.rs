//! Streaming content fingerprinting.
//!
//! Evidence files can run to hundreds of megabytes, so the digest is fed in
//! fixed-size chunks rather than materializing the file in memory. Each
//! chunk read is an await point, keeping the dispatch layer responsive, and
//! fractional progress is reported after every chunk. Identical bytes always
//! yield identical digests regardless of file name, which is what makes the
//! storage key content-addressed.

use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Default read size per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Errors from fingerprinting.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("failed to read evidence file: {0}")]
    Read(#[from] std::io::Error),
}

/// Incremental SHA-256 fingerprinter for evidence files.
///
/// Each call to [`digest_file`](Self::digest_file) starts a fresh digest
/// accumulator; a generator can be reused across files.
#[derive(Debug, Clone)]
pub struct FingerprintGenerator {
    chunk_size: usize,
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintGenerator {
    /// Create a generator with the default chunk size.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a generator with a custom chunk size (minimum 4 KiB).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(4096),
        }
    }

    /// Stream a file through SHA-256, reporting fractional progress in
    /// `[0, 1]` after each chunk, and return the lowercase hex digest.
    ///
    /// A read failure surfaces as [`FingerprintError::Read`]; no partial
    /// digest is ever returned.
    pub async fn digest_file<F>(
        &self,
        path: &Path,
        mut on_progress: F,
    ) -> Result<String, FingerprintError>
    where
        F: FnMut(f64),
    {
        let mut file = File::open(path).await?;
        let total = file.metadata().await?.len();

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.chunk_size];
        let mut read_so_far: u64 = 0;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buf[..n]);
            read_so_far += n as u64;

            if total > 0 {
                on_progress((read_so_far as f64 / total as f64).min(1.0));
            }
        }

        // Zero-length files still complete with full progress
        on_progress(1.0);

        let digest = hex::encode(hasher.finalize());
        debug!(
            path = %path.display(),
            bytes = read_so_far,
            %digest,
            "Fingerprint computed"
        );

        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_same_bytes_same_digest() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.mp4", b"identical evidence bytes").await;
        let b = write_file(&dir, "renamed_copy.mp4", b"identical evidence bytes").await;

        let gen = FingerprintGenerator::new();
        let digest_a = gen.digest_file(&a, |_| {}).await.unwrap();
        let digest_b = gen.digest_file(&b, |_| {}).await.unwrap();

        assert_eq!(digest_a, digest_b);
        assert_eq!(digest_a.len(), 64);
        assert!(digest_a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_different_bytes_different_digest() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.mp4", b"first clip").await;
        let b = write_file(&dir, "b.mp4", b"second clip").await;

        let gen = FingerprintGenerator::new();
        let digest_a = gen.digest_file(&a, |_| {}).await.unwrap();
        let digest_b = gen.digest_file(&b, |_| {}).await.unwrap();

        assert_ne!(digest_a, digest_b);
    }

    #[tokio::test]
    async fn test_chunked_digest_matches_one_shot() {
        let dir = TempDir::new().unwrap();
        let contents: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let path = write_file(&dir, "large.mp4", &contents).await;

        let one_shot = {
            let mut hasher = Sha256::new();
            hasher.update(&contents);
            hex::encode(hasher.finalize())
        };

        let chunked = FingerprintGenerator::with_chunk_size(4096)
            .digest_file(&path, |_| {})
            .await
            .unwrap();

        assert_eq!(chunked, one_shot);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_completes() {
        let dir = TempDir::new().unwrap();
        let contents = vec![7u8; 64 * 1024];
        let path = write_file(&dir, "clip.mp4", &contents).await;

        let mut reports = Vec::new();
        FingerprintGenerator::with_chunk_size(4096)
            .digest_file(&path, |p| reports.push(p))
            .await
            .unwrap();

        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.mp4");

        let result = FingerprintGenerator::new().digest_file(&missing, |_| {}).await;
        assert!(matches!(result, Err(FingerprintError::Read(_))));
    }
}
