//! Per-turn input and output.

use codex_core::{ArtifactDraft, CheckpointId, DecisionPoint};
use codex_registry::{Assignment, ConvergenceEvent, VariantRename};
use serde::{Deserialize, Serialize};

/// What the narrative generator produced for one turn.
///
/// ```
/// use codex_core::ArtifactDraft;
/// use codex_engine::Turn;
///
/// let turn = Turn::builder()
///     .payload_ref("sha256:abc")
///     .artifacts(vec![ArtifactDraft::new("decoder", "decode(x)")])
///     .build()
///     .unwrap();
/// assert_eq!(turn.artifacts().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct Turn {
    /// Opaque payload handle for the narrative text
    payload_ref: String,
    /// Artifacts introduced this turn
    #[builder(default)]
    artifacts: Vec<ArtifactDraft>,
    /// Decision point to mark on the new checkpoint
    #[builder(default)]
    decision: Option<DecisionPoint>,
    /// Checkpoint the turn continues; the branch must still point at it.
    /// Makes a retried turn resolve to the checkpoint it already created.
    #[builder(default)]
    parent: Option<CheckpointId>,
}

impl Turn {
    /// A turn with no artifacts and no decision.
    pub fn new(payload_ref: impl Into<String>) -> Self {
        Self {
            payload_ref: payload_ref.into(),
            artifacts: Vec::new(),
            decision: None,
            parent: None,
        }
    }

    /// Creates a new turn builder.
    pub fn builder() -> TurnBuilder {
        TurnBuilder::default()
    }

    /// Add an artifact.
    pub fn with_artifact(mut self, draft: ArtifactDraft) -> Self {
        self.artifacts.push(draft);
        self
    }

    /// Continue from a known checkpoint instead of whatever the branch head
    /// is when the turn is recorded.
    pub fn with_parent(mut self, parent: CheckpointId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Mark the resulting checkpoint as a decision point.
    pub fn with_decision(mut self, prompt: impl Into<String>, options: Vec<String>) -> Self {
        self.decision = Some(DecisionPoint::new(prompt, options));
        self
    }
}

/// What recording a turn did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Story the turn was recorded in
    pub story_id: String,
    /// Branch that was advanced
    pub branch: String,
    /// Resulting checkpoint
    pub checkpoint: CheckpointId,
    /// False when an identical continuation already existed
    pub created: bool,
    /// Ordinal of the checkpoint along its chain
    pub sequence: u64,
    /// Registry resolution for each artifact, in turn order
    pub assignments: Vec<Assignment>,
    /// Variants renamed as a side effect of ingestion
    pub renamed: Vec<VariantRename>,
    /// Convergence events fired by this turn
    pub events: Vec<ConvergenceEvent>,
    /// Decision point marked on the checkpoint
    pub decision: Option<DecisionPoint>,
}
