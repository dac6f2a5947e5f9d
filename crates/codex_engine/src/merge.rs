//! Canonization: merging one branch's history and artifacts into another.

use crate::Codex;
use codex_core::{ArtifactRecord, BranchRef, Checkpoint, CheckpointId, story_tag};
use codex_error::{CodexResult, InvariantError, MergeError, MergeErrorKind};
use codex_registry::{ConvergenceEvent, VariantRename};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

/// What a merge did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Branch merged from
    pub source: BranchRef,
    /// Branch merged into
    pub target: BranchRef,
    /// Source checkpoints appended onto the target
    pub checkpoints_merged: usize,
    /// Newly counted artifacts that resolved to a canonical name
    pub artifacts_canonical: usize,
    /// Newly counted artifacts that resolved to a variant name
    pub artifacts_variant: usize,
    /// Convergence events fired by the merge, ascending
    pub threshold_events: Vec<ConvergenceEvent>,
    /// Variants renamed by the registry rebuild
    pub renamed: Vec<VariantRename>,
    /// Latest checkpoint both histories share
    pub fork_point: CheckpointId,
    /// Whether the fork point carries a decision marker
    pub fork_point_marked: bool,
    /// Ids of the checkpoints now on the target, in append order
    pub merged: Vec<CheckpointId>,
}

impl Codex {
    /// Merge a source branch into a target branch.
    ///
    /// Source checkpoints the target does not hold yet, either directly or as
    /// an earlier canonised copy, are re-appended in order onto the target
    /// head. Their artifacts are ingested as records of the target story in
    /// one registry transaction, so a bulk merge fires every threshold it
    /// crosses in ascending order. Running the same merge again is a no-op.
    ///
    /// # Errors
    ///
    /// `DivergentHistory` when the branches do not share a root;
    /// `BranchNotFound` for an unknown branch; `BranchMoved` when the target
    /// advanced while the merge was running.
    #[instrument(skip(self), fields(source = %source, target = %target))]
    pub fn merge(&self, source: &BranchRef, target: &BranchRef) -> CodexResult<MergeReport> {
        let source_head = self.log.head(source.story(), source.branch())?;
        let target_head = self.log.head(target.story(), target.branch())?;
        let source_chain = self.log.chain(&source_head)?;
        let target_chain = self.log.chain(&target_head)?;

        match (source_chain.first(), target_chain.first()) {
            (Some(a), Some(b)) if a.id() == b.id() => {}
            (Some(_), Some(_)) => {
                return Err(MergeError::new(MergeErrorKind::DivergentHistory {
                    source: source.to_string(),
                    target: target.to_string(),
                })
                .into());
            }
            _ => return Err(InvariantError::new("branch head with an empty chain").into()),
        }

        let target_ids: BTreeSet<&CheckpointId> = target_chain.iter().map(Checkpoint::id).collect();
        let present: BTreeSet<&CheckpointId> = target_chain
            .iter()
            .flat_map(|c| [c.id(), c.lineage_id()])
            .collect();
        let fork_point = source_chain
            .iter()
            .rev()
            .find(|c| target_ids.contains(c.id()))
            .map(|c| c.id().clone())
            .ok_or_else(|| InvariantError::new("shared root missing from target chain"))?;
        let fork_point_marked = self.decisions.is_marked(&fork_point)?;

        let missing: Vec<Checkpoint> = source_chain
            .iter()
            .filter(|c| !present.contains(c.id()) && !present.contains(c.lineage_id()))
            .cloned()
            .collect();
        if missing.is_empty() {
            debug!(fork_point = %fork_point.short(), "Target already holds the source history");
            return Ok(MergeReport {
                source: source.clone(),
                target: target.clone(),
                checkpoints_merged: 0,
                artifacts_canonical: 0,
                artifacts_variant: 0,
                threshold_events: Vec::new(),
                renamed: Vec::new(),
                fork_point,
                fork_point_marked,
                merged: Vec::new(),
            });
        }

        let appended = self.log.graft(target, &target_head, &missing)?;
        let merged: Vec<CheckpointId> = appended.into_iter().map(|a| a.into_id()).collect();

        let genre = self.log.story(target.story())?.genre().clone();
        let records = self.carried_records(&missing, &merged, target.story(), &genre)?;
        let batch = self.registry.ingest_batch(records)?;

        info!(
            checkpoints = merged.len(),
            canonical = batch.canonical_count(),
            variants = batch.variant_count(),
            events = batch.events.len(),
            fork_point = %fork_point.short(),
            "Merged branch"
        );
        Ok(MergeReport {
            source: source.clone(),
            target: target.clone(),
            checkpoints_merged: missing.len(),
            artifacts_canonical: batch.canonical_count(),
            artifacts_variant: batch.variant_count(),
            threshold_events: batch.events,
            renamed: batch.renamed,
            fork_point,
            fork_point_marked,
            merged,
        })
    }

    /// Records introduced at the source checkpoints, re-attached to their
    /// copies on the target story.
    fn carried_records(
        &self,
        sources: &[Checkpoint],
        copies: &[CheckpointId],
        target_story: &str,
        target_genre: &str,
    ) -> CodexResult<Vec<ArtifactRecord>> {
        let snapshot = self.registry.snapshot()?;
        let wanted: BTreeSet<&CheckpointId> = sources.iter().map(Checkpoint::id).collect();

        // first record per (checkpoint, slug) in key order
        let mut introduced: BTreeMap<&CheckpointId, BTreeMap<&str, &ArtifactRecord>> =
            BTreeMap::new();
        for record in snapshot.records() {
            if wanted.contains(record.checkpoint_id()) {
                introduced
                    .entry(record.checkpoint_id())
                    .or_default()
                    .entry(record.slug().as_str())
                    .or_insert(record);
            }
        }

        let mut records = Vec::new();
        for (source, copy) in sources.iter().zip(copies) {
            let Some(by_slug) = introduced.get(source.id()) else {
                continue;
            };
            let sequence = *self.log.checkpoint(copy)?.sequence();
            for record in by_slug.values() {
                if !source.artifacts().contains(record.id()) {
                    continue;
                }
                let tag = story_tag(target_genre, *record.category());
                records.push(
                    record
                        .reattach(target_story, copy.clone(), tag)
                        .at_sequence(sequence),
                );
            }
        }
        Ok(records)
    }
}
