//! Storage trait definition.

use codex_error::CodexResult;
use codex_log::StoryLog;
use codex_registry::{ConvergenceEvent, RegistryDocument};

/// Trait for pluggable persistence backends.
///
/// Every write replaces the whole document atomically, so a reader never
/// sees a partially written story or registry.
#[async_trait::async_trait]
pub trait CodexStore: Send + Sync {
    /// Persist one story's log, replacing any previous version.
    async fn save_story(&self, log: &StoryLog) -> CodexResult<()>;

    /// Load one story's log.
    ///
    /// # Errors
    ///
    /// `NotFound` storage error if the story was never saved.
    async fn load_story(&self, story_id: &str) -> CodexResult<StoryLog>;

    /// Ids of every saved story, sorted.
    async fn list_stories(&self) -> CodexResult<Vec<String>>;

    /// Persist the registry document.
    async fn save_registry(&self, document: &RegistryDocument) -> CodexResult<()>;

    /// Load the registry document, `None` if none was saved yet.
    async fn load_registry(&self) -> CodexResult<Option<RegistryDocument>>;

    /// Append convergence events to the recorded list.
    async fn append_events(&self, events: &[ConvergenceEvent]) -> CodexResult<()>;

    /// Every recorded event, oldest first.
    async fn load_events(&self) -> CodexResult<Vec<ConvergenceEvent>>;
}
