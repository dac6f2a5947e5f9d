//! Registry state and the sequential resolution algorithm.

use crate::{
    ArtifactFilter, ArtifactVersion, Contributor, EntryMatches, RegistryEntry, Resonance,
    resonance,
};
use codex_core::{ArtifactRecord, Category, RecordKey, slugify};
use codex_error::{CodexResult, RegistryError, RegistryErrorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Full registry state. Always equal to replaying `records` in key order.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryState {
    pub(crate) records: BTreeMap<RecordKey, ArtifactRecord>,
    pub(crate) assignments: BTreeMap<RecordKey, String>,
    pub(crate) entries: BTreeMap<String, RegistryEntry>,
    /// Variant name to entry id.
    pub(crate) variants: BTreeMap<String, String>,
    /// Content hash to entry id.
    pub(crate) hashes: BTreeMap<String, String>,
    /// `(story id, slug)` to the variant that story's artifact of that name
    /// resolved to first. Later content under the same name becomes a version.
    pub(crate) authored: BTreeMap<(String, String), String>,
    pub(crate) category_counts: BTreeMap<Category, u64>,
}

impl RegistryState {
    /// Build state by applying records in ascending key order.
    pub(crate) fn replay(records: impl IntoIterator<Item = ArtifactRecord>) -> Self {
        let ordered: BTreeMap<RecordKey, ArtifactRecord> = records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        let mut state = Self::default();
        for record in ordered.into_values() {
            state.apply(record);
        }
        state
    }

    pub(crate) fn last_key(&self) -> Option<&RecordKey> {
        self.records.keys().next_back()
    }

    pub(crate) fn total(&self) -> u64 {
        self.records.len() as u64
    }

    /// Resolve one record and fold it into the state.
    ///
    /// Callers guarantee the record's key sorts after every known key.
    pub(crate) fn apply(&mut self, record: ArtifactRecord) -> (String, String) {
        let tag = effective_tag(&record);
        let slug = record.slug().clone();
        let hash = record.content_hash().clone();

        let (entry_id, variant) = match self.hashes.get(&hash) {
            Some(entry_id) => {
                let entry_id = entry_id.clone();
                let variant = self.rediscovered_name(&entry_id, &record, &tag);
                (entry_id, variant)
            }
            None => match self.revision_of(&record) {
                Some(found) => found,
                None => match self.variants.get(&slug) {
                    None => (slug.clone(), slug.clone()),
                    Some(entry_id) => (entry_id.clone(), self.suffixed(&slug, &tag)),
                },
            },
        };

        let category = *record.category();
        self.entries
            .entry(entry_id.clone())
            .or_insert_with(|| RegistryEntry::new(&entry_id, category))
            .add(&variant, ArtifactVersion::of(&record), Contributor::of(&record));
        self.variants.insert(variant.clone(), entry_id.clone());
        self.authored
            .entry((record.story_id().clone(), slug))
            .or_insert_with(|| variant.clone());
        self.hashes.entry(hash).or_insert_with(|| entry_id.clone());
        *self.category_counts.entry(category).or_default() += 1;

        let key = record.key();
        self.assignments.insert(key.clone(), variant.clone());
        self.records.insert(key, record);
        (entry_id, variant)
    }

    /// Variant for byte-identical content already known to `entry_id`.
    fn rediscovered_name(&self, entry_id: &str, record: &ArtifactRecord, tag: &str) -> String {
        let slug = record.slug();
        if let Some(entry) = self.entries.get(entry_id) {
            let hash = record.content_hash();
            let own = entry.variants_with_hash(hash).find(|variant| {
                entry.contributors_of(variant).is_some_and(|contributors| {
                    contributors
                        .iter()
                        .any(|c| &c.story_id == record.story_id())
                })
            });
            if let Some(variant) = own {
                return variant.clone();
            }
            if let Some((owner, variant)) = self.revision_of(record)
                && owner == entry_id
            {
                return variant;
            }
            if entry.variants_with_hash(hash).any(|variant| variant == slug) {
                return slug.clone();
            }
        }
        if !self.variants.contains_key(slug) {
            return slug.clone();
        }
        self.suffixed(slug, tag)
    }

    /// `(entry id, variant)` this story already authored under the record's
    /// name.
    fn revision_of(&self, record: &ArtifactRecord) -> Option<(String, String)> {
        let variant = self
            .authored
            .get(&(record.story_id().clone(), record.slug().clone()))?;
        let entry_id = self.variants.get(variant)?;
        Some((entry_id.clone(), variant.clone()))
    }

    /// First free name of `<slug>_<tag>`, `<slug>_<tag>_2`, `<slug>_<tag>_3`, ...
    fn suffixed(&self, slug: &str, tag: &str) -> String {
        let base = format!("{}_{}", slug, tag);
        if !self.variants.contains_key(&base) {
            return base;
        }
        let mut n: u64 = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.variants.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub(crate) fn entry_for_variant(&self, variant: &str) -> Option<&RegistryEntry> {
        self.variants
            .get(variant)
            .and_then(|entry_id| self.entries.get(entry_id))
    }
}

fn effective_tag(record: &ArtifactRecord) -> String {
    let tag = slugify(record.story_tag());
    if tag.is_empty() {
        record.category().as_str().to_string()
    } else {
        tag
    }
}

/// Immutable view of the registry at one point in time.
///
/// Snapshots are cheap to take and never observe later ingestion.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub(crate) state: Arc<RegistryState>,
}

impl RegistrySnapshot {
    /// Resolve a canonical or variant name (slugged first) to its entry.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if no variant has that name.
    pub fn lookup(&self, name: &str) -> CodexResult<RegistryEntry> {
        self.state
            .entry_for_variant(&slugify(name))
            .cloned()
            .ok_or_else(|| {
                RegistryError::new(RegistryErrorKind::EntryNotFound(name.to_string())).into()
            })
    }

    /// Entry by id.
    pub fn entry(&self, entry_id: &str) -> Option<&RegistryEntry> {
        self.state.entries.get(entry_id)
    }

    /// Every entry, ordered by id.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.state.entries.values()
    }

    /// Entries with a canonical or variant name containing `term`,
    /// case-insensitively.
    pub fn search(&self, term: &str) -> EntryMatches {
        self.find(ArtifactFilter::default().with_text(term.to_string()))
    }

    /// Entries matching a filter.
    pub fn find(&self, filter: ArtifactFilter) -> EntryMatches {
        EntryMatches::new(Arc::clone(&self.state), filter)
    }

    /// Total number of ingested records.
    pub fn total(&self) -> u64 {
        self.state.total()
    }

    /// Records per category.
    pub fn category_counts(&self) -> BTreeMap<Category, u64> {
        self.state.category_counts.clone()
    }

    /// Categories with at least one record.
    pub fn categories_in_use(&self) -> BTreeSet<Category> {
        self.state
            .category_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(category, _)| *category)
            .collect()
    }

    /// Every ingested record in key order.
    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.state.records.values()
    }

    /// Variant assigned to a record.
    pub fn variant_of(&self, key: &RecordKey) -> Option<&String> {
        self.state.assignments.get(key)
    }

    /// Entries compatible with an artifact name.
    pub fn resonances(&self, name: &str) -> Vec<Resonance> {
        resonance::find(&self.state, name)
    }
}
