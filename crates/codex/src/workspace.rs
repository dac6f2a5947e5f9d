//! A codex opened on a data directory.

use crate::CodexConfig;
use codex_core::ArtifactDraft;
use codex_engine::Codex;
use codex_error::{CodexResult, StorageError, StorageErrorKind};
use codex_storage::{BlobStore, DirectoryLock, FileSystemStore};
use std::path::Path;
use tracing::{debug, instrument};

/// The codex, its document store and its blob store, rooted at one
/// directory.
///
/// Commands mutate the in-memory [`Codex`] and then [`commit`](Self::commit)
/// it back to disk. The data directory stays locked from [`open`](Self::open)
/// until the workspace is dropped, so one session's commit never overwrites
/// another's.
#[derive(Debug)]
pub struct Workspace {
    codex: Codex,
    store: FileSystemStore,
    blobs: BlobStore,
    lock: DirectoryLock,
}

impl Workspace {
    /// Load the codex stored under the configured data directory, creating
    /// the directory on first use.
    ///
    /// # Errors
    ///
    /// `Locked` (a conflict) while another workspace holds the directory;
    /// storage errors from the backend; `ConfigError` for invalid thresholds.
    #[instrument(skip(config), fields(data_dir = %config.data_dir().display()))]
    pub async fn open(config: &CodexConfig) -> CodexResult<Self> {
        let root = config.data_dir();
        let lock = DirectoryLock::acquire(root)?;
        let store = FileSystemStore::new(root)?;
        let blobs = BlobStore::new(root.join("blobs"))?;
        let codex = Codex::load(&store, config.thresholds()?).await?;
        Ok(Self {
            codex,
            store,
            blobs,
            lock,
        })
    }

    /// The loaded codex.
    pub fn codex(&self) -> &Codex {
        &self.codex
    }

    /// The blob store.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store narrative text and return its payload reference.
    pub async fn store_payload(&self, text: &str) -> CodexResult<String> {
        self.blobs.put(text.as_bytes()).await
    }

    /// Read an artifact file into a draft named after the file stem, storing
    /// its body in the blob store.
    ///
    /// # Errors
    ///
    /// `FileRead` if the file cannot be read or has no usable name.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn artifact_from_file(&self, path: &Path) -> CodexResult<ArtifactDraft> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: no usable file name",
                    path.display()
                )))
            })?;
        let content = tokio::fs::read(path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        let reference = self.blobs.put(&content).await?;
        debug!(name, reference = %reference, "Stored artifact body");
        Ok(ArtifactDraft::new(name, content))
    }

    /// Persist the codex.
    pub async fn commit(&self) -> CodexResult<()> {
        self.codex.save(&self.store).await?;
        debug!(lock = %self.lock.path().display(), "Committed workspace");
        Ok(())
    }
}
