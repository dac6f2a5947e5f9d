//! In-memory store for tests.

use crate::CodexStore;
use codex_error::{CodexResult, StorageError, StorageErrorKind};
use codex_log::StoryLog;
use codex_registry::{ConvergenceEvent, RegistryDocument};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store.
///
/// All data is lost when the store is dropped. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    stories: Arc<RwLock<BTreeMap<String, StoryLog>>>,
    registry: Arc<RwLock<Option<RegistryDocument>>>,
    events: Arc<RwLock<Vec<ConvergenceEvent>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CodexStore for MemoryStore {
    async fn save_story(&self, log: &StoryLog) -> CodexResult<()> {
        self.stories
            .write()
            .await
            .insert(log.story.id().clone(), log.clone());
        Ok(())
    }

    async fn load_story(&self, story_id: &str) -> CodexResult<StoryLog> {
        self.stories
            .read()
            .await
            .get(story_id)
            .cloned()
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::NotFound(format!("story {}", story_id))).into()
            })
    }

    async fn list_stories(&self) -> CodexResult<Vec<String>> {
        Ok(self.stories.read().await.keys().cloned().collect())
    }

    async fn save_registry(&self, document: &RegistryDocument) -> CodexResult<()> {
        *self.registry.write().await = Some(document.clone());
        Ok(())
    }

    async fn load_registry(&self) -> CodexResult<Option<RegistryDocument>> {
        Ok(self.registry.read().await.clone())
    }

    async fn append_events(&self, events: &[ConvergenceEvent]) -> CodexResult<()> {
        self.events.write().await.extend_from_slice(events);
        Ok(())
    }

    async fn load_events(&self) -> CodexResult<Vec<ConvergenceEvent>> {
        Ok(self.events.read().await.clone())
    }
}
