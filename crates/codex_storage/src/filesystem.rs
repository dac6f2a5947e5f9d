//! Filesystem-based store.

use crate::CodexStore;
use crate::io::{read_json, write_json};
use codex_core::slugify;
use codex_error::{CodexResult, StorageError, StorageErrorKind};
use codex_log::StoryLog;
use codex_registry::{ConvergenceEvent, RegistryDocument};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Filesystem store.
///
/// Layout under the root: `stories/<story id>.json`, `registry.json` and
/// `events.json`. Documents are written to a temp file and renamed into
/// place.
#[derive(Debug)]
pub struct FileSystemStore {
    root: PathBuf,
    events_lock: Mutex<()>,
}

impl FileSystemStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> CodexResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("stories")).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::debug!(path = %root.display(), "Opened filesystem store");
        Ok(Self {
            root,
            events_lock: Mutex::new(()),
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn story_path(&self, story_id: &str) -> CodexResult<PathBuf> {
        if story_id.is_empty() || slugify(story_id) != story_id {
            return Err(StorageError::new(StorageErrorKind::InvalidReference(format!(
                "story id '{}' is not a valid file name",
                story_id
            )))
            .into());
        }
        Ok(self
            .root
            .join("stories")
            .join(format!("{}.json", story_id)))
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    fn events_path(&self) -> PathBuf {
        self.root.join("events.json")
    }
}

#[async_trait::async_trait]
impl CodexStore for FileSystemStore {
    #[tracing::instrument(skip(self, log), fields(story = %log.story.id(), checkpoints = log.checkpoints.len()))]
    async fn save_story(&self, log: &StoryLog) -> CodexResult<()> {
        let path = self.story_path(log.story.id())?;
        write_json(&path, log).await?;
        tracing::debug!(path = %path.display(), "Saved story log");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load_story(&self, story_id: &str) -> CodexResult<StoryLog> {
        let path = self.story_path(story_id)?;
        read_json(&path).await?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(path.display().to_string())).into()
        })
    }

    async fn list_stories(&self) -> CodexResult<Vec<String>> {
        let dir = self.root.join("stories");
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
        })?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    #[tracing::instrument(skip(self, document), fields(entries = document.entries.len(), records = document.records.len()))]
    async fn save_registry(&self, document: &RegistryDocument) -> CodexResult<()> {
        write_json(&self.registry_path(), document).await?;
        tracing::debug!("Saved registry");
        Ok(())
    }

    async fn load_registry(&self) -> CodexResult<Option<RegistryDocument>> {
        read_json(&self.registry_path()).await
    }

    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append_events(&self, events: &[ConvergenceEvent]) -> CodexResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let _guard = self.events_lock.lock().await;
        let path = self.events_path();
        let mut recorded: Vec<ConvergenceEvent> = read_json(&path).await?.unwrap_or_default();
        recorded.extend_from_slice(events);
        write_json(&path, &recorded).await?;
        tracing::info!(total = recorded.len(), "Recorded convergence events");
        Ok(())
    }

    async fn load_events(&self) -> CodexResult<Vec<ConvergenceEvent>> {
        Ok(read_json(&self.events_path()).await?.unwrap_or_default())
    }
}
