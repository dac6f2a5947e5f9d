//! Loading and saving a codex through a [`CodexStore`].

use crate::Codex;
use codex_core::Thresholds;
use codex_error::CodexResult;
use codex_log::{CheckpointLog, DecisionIndex};
use codex_registry::Registry;
use codex_storage::CodexStore;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

impl Codex {
    /// Rebuild a codex from a store.
    ///
    /// Stories are reloaded with their decision markers, the registry is
    /// replayed from its records, and thresholds named by recorded events
    /// stay crossed. Loading fires no events.
    ///
    /// # Errors
    ///
    /// Storage errors from the backend; `InvariantError` for a stored
    /// checkpoint that does not hash to its id.
    #[instrument(skip_all)]
    pub async fn load(store: &dyn CodexStore, thresholds: Thresholds) -> CodexResult<Self> {
        let mut logs = Vec::new();
        let mut markers = BTreeMap::new();
        for story_id in store.list_stories().await? {
            let log = store.load_story(&story_id).await?;
            markers.extend(
                log.decisions
                    .iter()
                    .map(|(id, decision)| (id.clone(), decision.clone())),
            );
            logs.push(log);
        }
        let stories = logs.len();
        let log = CheckpointLog::from_story_logs(logs)?;

        let records = store
            .load_registry()
            .await?
            .map(|document| document.records)
            .unwrap_or_default();
        let events = store.load_events().await?;
        let registry = Registry::restore(thresholds, records, events)?;

        info!(
            stories,
            markers = markers.len(),
            artifacts = registry.total()?,
            "Loaded codex"
        );
        Ok(Self::from_parts(
            log,
            DecisionIndex::from_markers(markers),
            registry,
        ))
    }

    /// Write every story, the registry document and any events the store has
    /// not recorded yet.
    ///
    /// # Errors
    ///
    /// Storage errors from the backend.
    #[instrument(skip_all)]
    pub async fn save(&self, store: &dyn CodexStore) -> CodexResult<()> {
        let stories = self.log.stories()?;
        for story in &stories {
            let mut log = self.log.story_log(story.id())?;
            log.decisions = self.decisions.markers_for(story)?;
            store.save_story(&log).await?;
        }
        store.save_registry(&self.registry.document()?).await?;

        let recorded = store.load_events().await?.len();
        let events = self.registry.events()?;
        match events.get(recorded..) {
            Some(fresh) if !fresh.is_empty() => {
                store.append_events(fresh).await?;
                debug!(count = fresh.len(), "Recorded convergence events");
            }
            _ => {}
        }
        info!(stories = stories.len(), "Saved codex");
        Ok(())
    }
}
