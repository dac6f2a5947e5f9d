//! Immutable checkpoint nodes.

use crate::{ArtifactId, CheckpointId, hash_fields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable recorded turn in the checkpoint DAG.
///
/// The id is a hash over the parent, the payload reference and the ordered
/// artifact ids, so identical continuations of the same parent share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Checkpoint {
    /// Content-derived id
    id: CheckpointId,
    /// Story that first recorded this node
    story_id: String,
    /// Parent node, `None` for a story root
    parent: Option<CheckpointId>,
    /// Ordinal along the first-parent chain (root is 0)
    sequence: u64,
    /// Opaque narrative payload handle
    payload_ref: String,
    /// Artifacts introduced at this checkpoint, in order
    artifacts: Vec<ArtifactId>,
    /// Checkpoint this node was canonised from, if any
    #[serde(default)]
    origin: Option<CheckpointId>,
    /// Wall-clock creation time
    created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Compute the id a checkpoint with these contents would have.
    ///
    /// Roots hash `root:<story id>` in the parent slot so unrelated stories
    /// never share a root.
    ///
    /// ```
    /// use codex_core::Checkpoint;
    ///
    /// let a = Checkpoint::compute_id("noir", None, "sha256:00", &[]);
    /// let b = Checkpoint::compute_id("western", None, "sha256:00", &[]);
    /// assert_ne!(a, b);
    /// ```
    pub fn compute_id(
        story_id: &str,
        parent: Option<&CheckpointId>,
        payload_ref: &str,
        artifacts: &[ArtifactId],
    ) -> CheckpointId {
        let parent_slot = match parent {
            Some(parent) => format!("parent:{}", parent),
            None => format!("root:{}", story_id),
        };
        let fields = ["checkpoint", parent_slot.as_str(), payload_ref]
            .into_iter()
            .chain(artifacts.iter().map(ArtifactId::as_str));
        CheckpointId::new(hash_fields(fields))
    }

    /// Build a checkpoint, computing its id.
    pub fn new(
        story_id: impl Into<String>,
        parent: Option<CheckpointId>,
        sequence: u64,
        payload_ref: impl Into<String>,
        artifacts: Vec<ArtifactId>,
        origin: Option<CheckpointId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let story_id = story_id.into();
        let payload_ref = payload_ref.into();
        let id = Self::compute_id(&story_id, parent.as_ref(), &payload_ref, &artifacts);
        Self {
            id,
            story_id,
            parent,
            sequence,
            payload_ref,
            artifacts,
            origin,
            created_at,
        }
    }

    /// Whether this is a story root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The id this checkpoint's lineage is tracked by across canonisation.
    pub fn lineage_id(&self) -> &CheckpointId {
        self.origin.as_ref().unwrap_or(&self.id)
    }
}
