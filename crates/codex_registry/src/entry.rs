//! Registry entries.

use codex_core::{ArtifactRecord, Category, CheckpointId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A `(story, checkpoint)` pair that contributed a record to a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Contributor {
    /// Contributing story
    pub story_id: String,
    /// Checkpoint that introduced the record
    pub checkpoint_id: CheckpointId,
}

impl Contributor {
    /// Contributor of a record.
    pub fn of(record: &ArtifactRecord) -> Self {
        Self {
            story_id: record.story_id().clone(),
            checkpoint_id: record.checkpoint_id().clone(),
        }
    }
}

/// One revision of a variant's content.
///
/// Versions order by the position of their introducing checkpoint, so a
/// story's revisions read in the order they were written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactVersion {
    /// Position of the introducing checkpoint in its story
    pub sequence: u64,
    /// Checkpoint that first introduced this content under the variant
    pub checkpoint_id: CheckpointId,
    /// Story that introduced it
    pub story_id: String,
    /// Hex SHA-256 of the content
    pub content_hash: String,
}

impl ArtifactVersion {
    /// Version introduced by a record.
    pub fn of(record: &ArtifactRecord) -> Self {
        Self {
            sequence: *record.sequence(),
            checkpoint_id: record.checkpoint_id().clone(),
            story_id: record.story_id().clone(),
            content_hash: record.content_hash().clone(),
        }
    }
}

/// Global deduplicated identity for one or more artifact records.
///
/// The entry id is its canonical name. Variant names are unique across the
/// whole registry. A variant holds one or more versions; each distinct
/// content hash appears once, at its earliest introduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RegistryEntry {
    /// Entry id (equal to the canonical name)
    id: String,
    /// Name of the first variant
    canonical_name: String,
    /// Category of the canonical variant
    category: Category,
    /// Variant names in order of assignment
    variants: Vec<String>,
    /// Contributors per variant
    contributors: BTreeMap<String, BTreeSet<Contributor>>,
    /// Version history per variant, oldest first
    versions: BTreeMap<String, Vec<ArtifactVersion>>,
    /// Every content hash in the entry
    content_hashes: BTreeSet<String>,
}

impl RegistryEntry {
    pub(crate) fn new(name: &str, category: Category) -> Self {
        Self {
            id: name.to_string(),
            canonical_name: name.to_string(),
            category,
            variants: Vec::new(),
            contributors: BTreeMap::new(),
            versions: BTreeMap::new(),
            content_hashes: BTreeSet::new(),
        }
    }

    pub(crate) fn add(&mut self, variant: &str, version: ArtifactVersion, contributor: Contributor) {
        if !self.versions.contains_key(variant) {
            self.variants.push(variant.to_string());
        }
        self.content_hashes.insert(version.content_hash.clone());
        let history = self.versions.entry(variant.to_string()).or_default();
        match history
            .iter()
            .position(|known| known.content_hash == version.content_hash)
        {
            Some(index) if history[index] <= version => {}
            Some(index) => {
                history[index] = version;
                history.sort();
            }
            None => {
                history.push(version);
                history.sort();
            }
        }
        self.contributors
            .entry(variant.to_string())
            .or_default()
            .insert(contributor);
    }

    /// Variants holding `hash` in any version.
    pub fn variants_with_hash<'a>(&'a self, hash: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.variants.iter().filter(move |variant| {
            self.versions
                .get(*variant)
                .is_some_and(|history| history.iter().any(|v| v.content_hash == hash))
        })
    }

    /// Content hash of a variant's latest version.
    pub fn hash_of(&self, variant: &str) -> Option<&String> {
        self.versions
            .get(variant)
            .and_then(|history| history.last())
            .map(|version| &version.content_hash)
    }

    /// Version history of a variant, oldest first.
    pub fn versions_of(&self, variant: &str) -> Option<&[ArtifactVersion]> {
        self.versions.get(variant).map(Vec::as_slice)
    }

    /// One-based version number of `hash` within a variant.
    pub fn version_number(&self, variant: &str, hash: &str) -> Option<usize> {
        self.versions
            .get(variant)?
            .iter()
            .position(|version| version.content_hash == hash)
            .map(|index| index + 1)
    }

    /// Contributors of a variant.
    pub fn contributors_of(&self, variant: &str) -> Option<&BTreeSet<Contributor>> {
        self.contributors.get(variant)
    }

    /// Whether a story contributed to any variant.
    pub fn has_story(&self, story_id: &str) -> bool {
        self.contributors
            .values()
            .flatten()
            .any(|contributor| contributor.story_id == story_id)
    }

    /// Distinct contributing stories, ordered.
    pub fn stories(&self) -> BTreeSet<String> {
        self.contributors
            .values()
            .flatten()
            .map(|contributor| contributor.story_id.clone())
            .collect()
    }
}
