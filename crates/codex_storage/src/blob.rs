//! Content-addressed blob storage.

use crate::io::{read_optional, write_atomic};
use codex_core::{content_hash, content_ref, parse_content_ref};
use codex_error::{CodexResult, StorageError, StorageErrorKind};
use std::path::PathBuf;

/// Filesystem blob store for narrative payloads and artifact bodies.
///
/// Blobs live at `{root}/{hash[0:2]}/{hash[2:4]}/{hash}` and are addressed
/// by `sha256:<hash>` references. Identical bytes are stored once.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a blob store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> CodexResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash)
    }

    fn hash_of<'a>(&self, reference: &'a str) -> CodexResult<&'a str> {
        parse_content_ref(reference).ok_or_else(|| {
            StorageError::new(StorageErrorKind::InvalidReference(reference.to_string())).into()
        })
    }

    /// Store bytes and return their content reference.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn put(&self, data: &[u8]) -> CodexResult<String> {
        let hash = content_hash(data);
        let path = self.path_for(&hash);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(hash = %hash, "Blob already stored");
            return Ok(content_ref(&hash));
        }

        write_atomic(&path, data).await?;
        tracing::debug!(hash = %hash, path = %path.display(), "Stored blob");
        Ok(content_ref(&hash))
    }

    /// Read a blob, verifying its hash.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `HashMismatch` if the stored bytes were altered.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, reference: &str) -> CodexResult<Vec<u8>> {
        let hash = self.hash_of(reference)?;
        let path = self.path_for(hash);
        let data = read_optional(&path).await?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(reference.to_string()))
        })?;

        let actual = content_hash(&data);
        if actual != hash {
            return Err(StorageError::new(StorageErrorKind::HashMismatch {
                expected: hash.to_string(),
                actual,
            })
            .into());
        }
        Ok(data)
    }

    /// Whether a blob is stored.
    pub async fn contains(&self, reference: &str) -> CodexResult<bool> {
        let hash = self.hash_of(reference)?;
        Ok(tokio::fs::try_exists(self.path_for(hash))
            .await
            .unwrap_or(false))
    }
}
