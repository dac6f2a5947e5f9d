//! The Codex service and the per-turn pipeline.

use crate::{Turn, TurnReport};
use codex_core::{
    ArtifactDraft, BranchRef, Checkpoint, CheckpointId, Classifier, DecisionPoint,
    KeywordClassifier, PreparedArtifact, Story, Thresholds, session_story_id, story_tag,
};
use codex_error::{CodexResult, LogError, LogErrorKind, RegistryError, RegistryErrorKind};
use codex_log::{CheckpointLog, DecisionIndex, ForkPoints};
use codex_registry::{ConvergenceStatus, Registry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One checkpoint of a restored chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoredCheckpoint {
    /// The checkpoint
    pub checkpoint: Checkpoint,
    /// Decision marker, if the checkpoint is a fork origin
    pub decision: Option<DecisionPoint>,
    /// Registry variant names of the artifacts this story introduced here
    pub variants: Vec<String>,
}

/// Checkpoint log, decision index and registry behind one service.
///
/// Every method takes `&self`; the components do their own locking, so a
/// `Codex` can be shared across sessions behind an `Arc`.
pub struct Codex {
    pub(crate) log: CheckpointLog,
    pub(crate) decisions: DecisionIndex,
    pub(crate) registry: Registry,
    pub(crate) classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Codex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codex")
            .field("log", &self.log)
            .field("decisions", &self.decisions)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Codex {
    /// Empty codex with the default keyword classifier.
    pub fn new(thresholds: Thresholds) -> Self {
        Self::from_parts(
            CheckpointLog::new(),
            DecisionIndex::new(),
            Registry::new(thresholds),
        )
    }

    pub(crate) fn from_parts(
        log: CheckpointLog,
        decisions: DecisionIndex,
        registry: Registry,
    ) -> Self {
        Self {
            log,
            decisions,
            registry,
            classifier: Arc::new(KeywordClassifier::default()),
        }
    }

    /// Replace the category classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The checkpoint log.
    pub fn log(&self) -> &CheckpointLog {
        &self.log
    }

    /// The decision point index.
    pub fn decisions(&self) -> &DecisionIndex {
        &self.decisions
    }

    /// The artifact registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start a story. Without an id, one is derived from the genre and the
    /// current time.
    ///
    /// # Errors
    ///
    /// `StoryExists` if the id is taken; `InvalidInput` if it is not a slug.
    pub fn new_story(&self, story_id: Option<&str>, genre: &str) -> CodexResult<Story> {
        let story_id = match story_id {
            Some(id) => id.to_string(),
            None => session_story_id(genre, chrono::Utc::now()),
        };
        self.log.create_story(&story_id, genre)
    }

    /// Record one turn on a branch.
    ///
    /// Artifacts are validated before anything is appended, so a malformed
    /// artifact leaves both the log and the registry untouched. A turn that
    /// names its parent can be retried safely: the checkpoint resolves to the
    /// existing id and the registry treats the records as already counted.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` for a malformed or duplicated artifact;
    /// `BranchNotFound` for an unknown branch; `BranchMoved` when the turn
    /// names a parent the branch no longer points at; `AlreadyMarked` if the
    /// checkpoint carries a different decision marker.
    #[instrument(skip(self, turn), fields(artifacts = turn.artifacts().len()))]
    pub fn continue_story(
        &self,
        story_id: &str,
        branch: &str,
        turn: Turn,
    ) -> CodexResult<TurnReport> {
        let story = self.log.story(story_id)?;
        let prepared = self.prepare(turn.artifacts())?;
        let ids = prepared.iter().map(|p| p.id().clone()).collect();

        let appended = match turn.parent() {
            Some(parent) => {
                self.log
                    .append_after(story_id, branch, parent, turn.payload_ref(), ids)?
            }
            None => self
                .log
                .append_to_branch(story_id, branch, turn.payload_ref(), ids)?,
        };
        let created = appended.is_new();
        let checkpoint = self.log.checkpoint(appended.id())?;

        let records = prepared
            .into_iter()
            .map(|p| {
                let tag = story_tag(story.genre(), *p.category());
                p.attach(story_id, checkpoint.id().clone(), tag)
                    .at_sequence(*checkpoint.sequence())
            })
            .collect();
        let batch = self.registry.ingest_batch(records)?;

        let decision = match turn.decision() {
            Some(decision) => Some(self.mark_once(checkpoint.id(), decision)?),
            None => None,
        };

        info!(
            checkpoint = %checkpoint.id().short(),
            created,
            canonical = batch.canonical_count(),
            variants = batch.variant_count(),
            events = batch.events.len(),
            "Recorded turn"
        );
        Ok(TurnReport {
            story_id: story_id.to_string(),
            branch: branch.to_string(),
            checkpoint: checkpoint.id().clone(),
            created,
            sequence: *checkpoint.sequence(),
            assignments: batch.assignments,
            renamed: batch.renamed,
            events: batch.events,
            decision,
        })
    }

    fn prepare(&self, drafts: &[ArtifactDraft]) -> CodexResult<Vec<PreparedArtifact>> {
        let mut slugs = BTreeSet::new();
        drafts
            .iter()
            .map(|draft| -> CodexResult<PreparedArtifact> {
                let prepared = draft.prepare(self.classifier.as_ref())?;
                if !slugs.insert(prepared.slug().clone()) {
                    return Err(RegistryError::new(RegistryErrorKind::InvalidArtifact(format!(
                        "artifact name '{}' appears twice in one turn",
                        prepared.slug()
                    )))
                    .into());
                }
                Ok(prepared)
            })
            .collect()
    }

    fn mark_once(
        &self,
        checkpoint: &CheckpointId,
        decision: &DecisionPoint,
    ) -> CodexResult<DecisionPoint> {
        if let Some(existing) = self.decisions.decision(checkpoint)?
            && existing == *decision
        {
            debug!(checkpoint = %checkpoint.short(), "Decision already marked");
            return Ok(existing);
        }
        self.decisions.mark(
            &self.log,
            checkpoint,
            decision.prompt(),
            decision.options().clone(),
        )
    }

    /// Name a new branch. `from` defaults to the story head.
    ///
    /// # Errors
    ///
    /// `BranchNameTaken` for a taken name; `InvalidInput` when the story has
    /// no checkpoints yet.
    pub fn branch(
        &self,
        story_id: &str,
        name: &str,
        from: Option<&CheckpointId>,
    ) -> CodexResult<BranchRef> {
        let from = match from {
            Some(from) => from.clone(),
            None => self.story_head(story_id)?,
        };
        self.log.branch(story_id, &from, name)
    }

    fn story_head(&self, story_id: &str) -> CodexResult<CheckpointId> {
        self.log.story(story_id)?.head().clone().ok_or_else(|| {
            LogError::new(LogErrorKind::InvalidInput(format!(
                "story '{story_id}' has no checkpoints to branch from"
            )))
            .into()
        })
    }

    /// Start a new story from a checkpoint of an existing one.
    pub fn fork(
        &self,
        source_story: &str,
        from: &CheckpointId,
        new_story_id: &str,
        genre: Option<&str>,
    ) -> CodexResult<Story> {
        self.log.fork(source_story, from, new_story_id, genre)
    }

    /// Resolve a full checkpoint id or an unambiguous prefix of one among the
    /// checkpoints a story knows.
    ///
    /// # Errors
    ///
    /// `CheckpointNotFound` when nothing matches; `InvalidInput` when the
    /// prefix matches several checkpoints.
    pub fn resolve_checkpoint(&self, story_id: &str, prefix: &str) -> CodexResult<CheckpointId> {
        let story = self.log.story(story_id)?;
        let mut matches = story
            .known()
            .iter()
            .filter(|id| id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) if !prefix.is_empty() => Ok(id.clone()),
            (Some(_), _) => Err(LogError::new(LogErrorKind::InvalidInput(format!(
                "checkpoint prefix '{prefix}' is ambiguous"
            )))
            .into()),
            (None, _) => {
                Err(LogError::new(LogErrorKind::CheckpointNotFound(prefix.to_string())).into())
            }
        }
    }

    /// Ancestor chain of a checkpoint with decision markers and the registry
    /// variants of the artifacts introduced along it. Read-only.
    ///
    /// # Errors
    ///
    /// `CheckpointNotFound` if the story does not know the checkpoint.
    #[instrument(skip(self), fields(story = %story_id, checkpoint = %checkpoint.short()))]
    pub fn restore(
        &self,
        story_id: &str,
        checkpoint: &CheckpointId,
    ) -> CodexResult<Vec<RestoredCheckpoint>> {
        let chain = self.log.restore(story_id, checkpoint)?;
        let snapshot = self.registry.snapshot()?;
        let mut variants: BTreeMap<&CheckpointId, Vec<String>> = BTreeMap::new();
        for record in snapshot.records() {
            if record.story_id() != story_id {
                continue;
            }
            if let Some(variant) = snapshot.variant_of(&record.key()) {
                variants
                    .entry(record.checkpoint_id())
                    .or_default()
                    .push(variant.clone());
            }
        }

        chain
            .iter()
            .map(|checkpoint| -> CodexResult<RestoredCheckpoint> {
                Ok(RestoredCheckpoint {
                    decision: self.decisions.decision(checkpoint.id())?,
                    variants: variants.get(checkpoint.id()).cloned().unwrap_or_default(),
                    checkpoint: checkpoint.clone(),
                })
            })
            .collect()
    }

    /// Mark a checkpoint as a decision point.
    pub fn mark(
        &self,
        checkpoint: &CheckpointId,
        prompt: &str,
        options: Vec<String>,
    ) -> CodexResult<DecisionPoint> {
        self.decisions.mark(&self.log, checkpoint, prompt, options)
    }

    /// Marked checkpoints, optionally restricted to those a story can reach.
    pub fn forks(&self, story_id: Option<&str>) -> CodexResult<ForkPoints> {
        match story_id {
            Some(story_id) => self.decisions.list_forkable_in(&self.log.story(story_id)?),
            None => self.decisions.list_forkable(),
        }
    }

    /// Head of a branch.
    pub fn head(&self, story_id: &str, branch: &str) -> CodexResult<CheckpointId> {
        self.log.head(story_id, branch)
    }

    /// Registry convergence status.
    pub fn status(&self) -> CodexResult<ConvergenceStatus> {
        self.registry.status()
    }
}
