//! Lazy registry queries.

use crate::RegistryEntry;
use crate::state::RegistryState;
use codex_core::{Category, slugify};
use std::ops::Bound;
use std::sync::Arc;

/// Criteria for [`crate::RegistrySnapshot::find`]. Unset fields match
/// everything.
///
/// ```
/// use codex_core::Category;
/// use codex_registry::ArtifactFilter;
///
/// let filter = ArtifactFilter::default()
///     .with_category(Category::Crypto)
///     .with_text("decoder".to_string());
/// assert_eq!(*filter.category(), Some(Category::Crypto));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct ArtifactFilter {
    /// Entry category
    category: Option<Category>,
    /// Contributing story
    story: Option<String>,
    /// Case-insensitive substring of the canonical or any variant name
    text: Option<String>,
}

impl ArtifactFilter {
    fn needles(&self) -> Vec<String> {
        let Some(text) = &self.text else {
            return Vec::new();
        };
        let lower = text.to_lowercase();
        let slug = slugify(text);
        let mut needles = vec![lower];
        if !slug.is_empty() && !needles.contains(&slug) {
            needles.push(slug);
        }
        needles
    }
}

/// Lazy, finite, restartable sequence of matching entries in id order.
///
/// Iterates a snapshot of the registry taken when the query was made.
#[derive(Debug, Clone)]
pub struct EntryMatches {
    state: Arc<RegistryState>,
    filter: ArtifactFilter,
    needles: Vec<String>,
    cursor: Option<String>,
}

impl EntryMatches {
    pub(crate) fn new(state: Arc<RegistryState>, filter: ArtifactFilter) -> Self {
        let needles = filter.needles();
        Self {
            state,
            filter,
            needles,
            cursor: None,
        }
    }

    /// Rewind to the first match.
    pub fn restart(&mut self) {
        self.cursor = None;
    }

    fn admits(&self, entry: &RegistryEntry) -> bool {
        if let Some(category) = &self.filter.category
            && entry.category() != category
        {
            return false;
        }
        if let Some(story) = &self.filter.story
            && !entry.has_story(story)
        {
            return false;
        }
        if self.filter.text.is_none() {
            return true;
        }
        std::iter::once(entry.canonical_name())
            .chain(entry.variants().iter())
            .any(|name| {
                self.needles
                    .iter()
                    .any(|needle| name.contains(needle.as_str()))
            })
    }
}

impl Iterator for EntryMatches {
    type Item = RegistryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let lower = match &self.cursor {
            Some(cursor) => Bound::Excluded(cursor.clone()),
            None => Bound::Unbounded,
        };
        let found = self
            .state
            .entries
            .range((lower, Bound::Unbounded))
            .map(|(_, entry)| entry)
            .find(|entry| self.admits(entry))
            .cloned();
        if let Some(entry) = &found {
            self.cursor = Some(entry.id().clone());
        }
        found
    }
}
