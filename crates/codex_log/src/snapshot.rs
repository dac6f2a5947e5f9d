//! Persistable per-story view of the log.

use codex_core::{Checkpoint, CheckpointId, DecisionPoint, Story};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything needed to rebuild one story: its pointers, every checkpoint it
/// knows (ancestors first) and the decision markers on those checkpoints.
///
/// Checkpoints shared between stories appear in each story's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLog {
    /// Story pointers and known set
    pub story: Story,
    /// Known checkpoints ordered by sequence
    pub checkpoints: Vec<Checkpoint>,
    /// Decision markers on known checkpoints
    #[serde(default)]
    pub decisions: BTreeMap<CheckpointId, DecisionPoint>,
}
