//! Results of ingestion.

use crate::ConvergenceEvent;
use codex_core::RecordKey;
use serde::{Deserialize, Serialize};

/// Where one ingested record resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Record identity
    pub key: RecordKey,
    /// Registry entry id
    pub entry_id: String,
    /// Assigned variant name
    pub variant: String,
    /// One-based version of the record's content within the variant
    pub version: usize,
    /// Whether the record was new (false for an idempotent re-ingest)
    pub counted: bool,
}

impl Assignment {
    /// Whether the record resolved to its entry's canonical name.
    pub fn is_canonical(&self) -> bool {
        self.variant == self.entry_id
    }
}

/// A previously assigned variant name that changed because an earlier-sorting
/// record arrived later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRename {
    /// Record whose variant changed
    pub key: RecordKey,
    /// Old variant name
    pub from: String,
    /// New variant name
    pub to: String,
}

/// Result of ingesting a batch under one critical section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One assignment per input record, in input order
    pub assignments: Vec<Assignment>,
    /// Variant renames caused by a rebuild
    pub renamed: Vec<VariantRename>,
    /// Threshold events fired by this batch, ascending
    pub events: Vec<ConvergenceEvent>,
}

impl BatchOutcome {
    /// Number of newly counted records that resolved to a canonical name.
    pub fn canonical_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.counted && a.is_canonical())
            .count()
    }

    /// Number of newly counted records that resolved to a non-canonical variant.
    pub fn variant_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.counted && !a.is_canonical())
            .count()
    }
}

/// Result of ingesting one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Registry entry id
    pub entry_id: String,
    /// Assigned variant name
    pub variant: String,
    /// One-based version of the record's content within the variant
    pub version: usize,
    /// Whether the record was new
    pub counted: bool,
    /// Variant renames caused by a rebuild
    pub renamed: Vec<VariantRename>,
    /// Threshold events fired by this ingestion
    pub events: Vec<ConvergenceEvent>,
}

impl IngestOutcome {
    pub(crate) fn from_batch(batch: BatchOutcome) -> Option<Self> {
        let BatchOutcome {
            assignments,
            renamed,
            events,
        } = batch;
        let assignment = assignments.into_iter().next()?;
        Some(Self {
            entry_id: assignment.entry_id,
            variant: assignment.variant,
            version: assignment.version,
            counted: assignment.counted,
            renamed,
            events,
        })
    }
}
