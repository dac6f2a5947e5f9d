//! The shared registry service.

use crate::state::RegistryState;
use crate::{
    ArtifactFilter, Assignment, BatchOutcome, ConvergenceEngine, ConvergenceEvent,
    ConvergenceStatus, EntryMatches, IngestOutcome, RegistryEntry, RegistrySnapshot, Resonance,
    ThresholdState, VariantRename,
};
use codex_core::{
    ArtifactRecord, Category, RecordKey, Thresholds, parse_content_ref, read_lock, slugify,
    write_lock,
};
use codex_error::{CodexResult, InvariantError, RegistryError, RegistryErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument};

#[derive(Debug)]
struct Inner {
    state: Arc<RegistryState>,
    convergence: ConvergenceEngine,
}

/// Persisted form of the registry: entries keyed by canonical name, the
/// content hash index, and the ingested records the entries derive from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Entries by id
    pub entries: BTreeMap<String, RegistryEntry>,
    /// Variant name to entry id
    pub variants: BTreeMap<String, String>,
    /// Content hash to entry id
    pub content_hashes: BTreeMap<String, String>,
    /// Ingested records in key order
    pub records: Vec<ArtifactRecord>,
}

/// The global artifact registry.
///
/// Every ingestion runs inside one write critical section covering the name
/// index, the counters and the convergence engine. Readers work on
/// snapshots.
#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Empty registry.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: Arc::new(RegistryState::default()),
                convergence: ConvergenceEngine::new(thresholds),
            }),
        }
    }

    /// Rebuild a registry by replaying persisted records.
    ///
    /// Thresholds named by `events` stay crossed; replay itself fires nothing.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` for a malformed record; `ConflictingReingest` when
    /// two records share a key but not a content hash.
    pub fn restore(
        thresholds: Thresholds,
        records: Vec<ArtifactRecord>,
        events: Vec<ConvergenceEvent>,
    ) -> CodexResult<Self> {
        let mut unique: BTreeMap<RecordKey, ArtifactRecord> = BTreeMap::new();
        for record in records {
            validate(&record)?;
            check_reingest(unique.get(&record.key()), &record)?;
            unique.insert(record.key(), record);
        }
        let state = RegistryState::replay(unique.into_values());
        debug!(
            records = state.total(),
            entries = state.entries.len(),
            events = events.len(),
            "Restored registry"
        );
        Ok(Self {
            inner: RwLock::new(Inner {
                state: Arc::new(state),
                convergence: ConvergenceEngine::with_history(thresholds, events),
            }),
        })
    }

    /// Ingest one record.
    ///
    /// Returns the entry id and variant name the record resolved to, plus
    /// any renames and threshold events the ingestion caused.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` for malformed input, which is not counted.
    #[instrument(skip(self, record), fields(story = %record.story_id(), name = %record.slug()))]
    pub fn ingest(&self, record: ArtifactRecord) -> CodexResult<IngestOutcome> {
        let batch = self.ingest_batch(vec![record])?;
        IngestOutcome::from_batch(batch).ok_or_else(|| {
            InvariantError::new("single-record batch produced no assignment").into()
        })
    }

    /// Ingest many records in one critical section, evaluating convergence
    /// once at the end.
    ///
    /// The batch is validated up front; a malformed record rejects the whole
    /// batch.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` or `ConflictingReingest`.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub fn ingest_batch(&self, records: Vec<ArtifactRecord>) -> CodexResult<BatchOutcome> {
        for record in &records {
            validate(record)?;
        }

        let mut guard = write_lock(&self.inner, "registry")?;
        let Inner { state, convergence } = &mut *guard;

        let mut fresh: BTreeMap<RecordKey, ArtifactRecord> = BTreeMap::new();
        let mut input_keys = Vec::with_capacity(records.len());
        for record in records {
            let key = record.key();
            let known = state.records.get(&key).or_else(|| fresh.get(&key));
            if known.is_none() {
                fresh.insert(key.clone(), record);
            } else {
                check_reingest(known, &record)?;
            }
            input_keys.push(key);
        }

        if fresh.is_empty() {
            debug!("Every record was already ingested");
            return Ok(BatchOutcome {
                assignments: assignments(state, &input_keys, &BTreeSet::new())?,
                renamed: Vec::new(),
                events: Vec::new(),
            });
        }

        let total_before = state.total();
        let fresh_keys: Vec<RecordKey> = fresh.keys().cloned().collect();
        let rebuild = match (fresh_keys.first(), state.last_key()) {
            (Some(first), Some(last)) => first < last,
            _ => false,
        };
        let previous = rebuild.then(|| state.assignments.clone());

        let current = Arc::make_mut(state);
        if rebuild {
            let all: Vec<ArtifactRecord> = current
                .records
                .values()
                .cloned()
                .chain(fresh.into_values())
                .collect();
            *current = RegistryState::replay(all);
        } else {
            for record in fresh.into_values() {
                current.apply(record);
            }
        }

        let renamed = previous
            .map(|previous| renames(&previous, &current.assignments))
            .unwrap_or_default();
        for rename in &renamed {
            info!(from = %rename.from, to = %rename.to, "Variant renamed by rebuild");
        }

        let snapshot: &RegistryState = current;
        let total = snapshot.total();
        let events = convergence.observe(total, |threshold| {
            // the record that brought the count to `threshold`, in key order
            let index = threshold.saturating_sub(total_before + 1) as usize;
            fresh_keys
                .get(index.min(fresh_keys.len() - 1))
                .and_then(|key| snapshot.assignments.get(key))
                .and_then(|variant| snapshot.variants.get(variant))
                .cloned()
                .unwrap_or_default()
        });

        let counted: BTreeSet<RecordKey> = fresh_keys.iter().cloned().collect();
        let assignments = assignments(snapshot, &input_keys, &counted)?;
        info!(
            new = counted.len(),
            total,
            rebuilt = rebuild,
            events = events.len(),
            "Ingested artifacts"
        );
        Ok(BatchOutcome {
            assignments,
            renamed,
            events,
        })
    }

    fn snapshot_state(&self) -> CodexResult<Arc<RegistryState>> {
        Ok(Arc::clone(&read_lock(&self.inner, "registry")?.state))
    }

    /// Immutable view of the current state.
    pub fn snapshot(&self) -> CodexResult<RegistrySnapshot> {
        Ok(RegistrySnapshot {
            state: self.snapshot_state()?,
        })
    }

    /// Resolve a canonical or variant name to its entry.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if no variant has that name.
    pub fn lookup(&self, name: &str) -> CodexResult<RegistryEntry> {
        self.snapshot()?.lookup(name)
    }

    /// Lazy case-insensitive substring search over canonical and variant names.
    pub fn search(&self, term: &str) -> CodexResult<EntryMatches> {
        Ok(self.snapshot()?.search(term))
    }

    /// Lazy filtered listing.
    pub fn find(&self, filter: ArtifactFilter) -> CodexResult<EntryMatches> {
        Ok(self.snapshot()?.find(filter))
    }

    /// Total number of ingested records.
    pub fn total(&self) -> CodexResult<u64> {
        Ok(self.snapshot_state()?.total())
    }

    /// Records per category.
    pub fn category_counts(&self) -> CodexResult<BTreeMap<Category, u64>> {
        Ok(self.snapshot()?.category_counts())
    }

    /// Categories with at least one record.
    pub fn categories_in_use(&self) -> CodexResult<BTreeSet<Category>> {
        Ok(self.snapshot()?.categories_in_use())
    }

    /// Entries compatible with an artifact name.
    pub fn resonances(&self, name: &str) -> CodexResult<Vec<Resonance>> {
        Ok(self.snapshot()?.resonances(name))
    }

    /// Every ingested record, in key order.
    pub fn records(&self) -> CodexResult<Vec<ArtifactRecord>> {
        Ok(self.snapshot()?.records().cloned().collect())
    }

    /// Recorded threshold events, oldest first.
    pub fn events(&self) -> CodexResult<Vec<ConvergenceEvent>> {
        Ok(read_lock(&self.inner, "registry")?
            .convergence
            .events()
            .to_vec())
    }

    /// State of a configured threshold.
    pub fn state_of(&self, threshold: u64) -> CodexResult<Option<ThresholdState>> {
        let inner = read_lock(&self.inner, "registry")?;
        Ok(inner.convergence.state_of(threshold, inner.state.total()))
    }

    /// Progress towards the next threshold.
    pub fn status(&self) -> CodexResult<ConvergenceStatus> {
        let inner = read_lock(&self.inner, "registry")?;
        Ok(inner.convergence.status(inner.state.total()))
    }

    /// Persistable form of the current state.
    pub fn document(&self) -> CodexResult<RegistryDocument> {
        let state = self.snapshot_state()?;
        Ok(RegistryDocument {
            entries: state.entries.clone(),
            variants: state.variants.clone(),
            content_hashes: state.hashes.clone(),
            records: state.records.values().cloned().collect(),
        })
    }
}

fn validate(record: &ArtifactRecord) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::new(RegistryErrorKind::InvalidArtifact(reason));
    if record.slug().is_empty() || slugify(record.slug()) != *record.slug() {
        return Err(invalid(format!(
            "artifact name '{}' is empty or not normalised",
            record.name()
        )));
    }
    if record.story_id().is_empty() {
        return Err(invalid(format!(
            "artifact '{}' has no origin story",
            record.slug()
        )));
    }
    if parse_content_ref(record.content_ref()) != Some(record.content_hash().as_str()) {
        return Err(invalid(format!(
            "artifact '{}' has a content reference that does not match its hash",
            record.slug()
        )));
    }
    Ok(())
}

fn check_reingest(known: Option<&ArtifactRecord>, record: &ArtifactRecord) -> Result<(), RegistryError> {
    match known {
        Some(known) if known.content_hash() != record.content_hash() => {
            Err(RegistryError::new(RegistryErrorKind::ConflictingReingest {
                story: record.story_id().clone(),
                checkpoint: record.checkpoint_id().to_string(),
                name: record.slug().clone(),
            }))
        }
        _ => Ok(()),
    }
}

fn assignments(
    state: &RegistryState,
    keys: &[RecordKey],
    counted: &BTreeSet<RecordKey>,
) -> CodexResult<Vec<Assignment>> {
    let mut seen = BTreeSet::new();
    keys.iter()
        .map(|key| -> CodexResult<Assignment> {
            let variant = state.assignments.get(key).ok_or_else(|| {
                InvariantError::new(format!("record {:?} has no variant after ingestion", key))
            })?;
            let entry_id = state.variants.get(variant).ok_or_else(|| {
                InvariantError::new(format!("variant '{}' has no entry", variant))
            })?;
            let version = state
                .records
                .get(key)
                .zip(state.entries.get(entry_id))
                .and_then(|(record, entry)| entry.version_number(variant, record.content_hash()))
                .ok_or_else(|| {
                    InvariantError::new(format!("record {:?} has no version in '{}'", key, variant))
                })?;
            Ok(Assignment {
                key: key.clone(),
                entry_id: entry_id.clone(),
                variant: variant.clone(),
                version,
                counted: counted.contains(key) && seen.insert(key.clone()),
            })
        })
        .collect()
}

fn renames(
    previous: &BTreeMap<RecordKey, String>,
    current: &BTreeMap<RecordKey, String>,
) -> Vec<VariantRename> {
    previous
        .iter()
        .filter_map(|(key, from)| {
            let to = current.get(key)?;
            (to != from).then(|| VariantRename {
                key: key.clone(),
                from: from.clone(),
                to: to.clone(),
            })
        })
        .collect()
}
