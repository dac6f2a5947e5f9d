//! Artifact drafts and records.

use crate::{
    ArtifactId, Category, CheckpointId, Classifier, content_hash, content_ref, hash_fields,
    slugify,
};
use codex_error::{RegistryError, RegistryErrorKind};
use serde::{Deserialize, Serialize};

/// An artifact as supplied by the narrative generator for one turn.
///
/// # Examples
///
/// ```
/// use codex_core::{ArtifactDraft, Category};
///
/// let draft = ArtifactDraft::builder()
///     .name("Signal Decoder")
///     .content(b"fn decode() {}".to_vec())
///     .category_hint(Some(Category::Crypto))
///     .build()
///     .unwrap();
/// assert_eq!(draft.name(), "Signal Decoder");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ArtifactDraft {
    /// Name as authored
    name: String,
    /// Raw content bytes (opaque)
    content: Vec<u8>,
    /// Category supplied by the generator, overrides classification
    #[builder(default)]
    #[serde(default)]
    category_hint: Option<Category>,
}

impl ArtifactDraft {
    /// Create a draft without a category hint.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            category_hint: None,
        }
    }

    /// Creates a new draft builder.
    pub fn builder() -> ArtifactDraftBuilder {
        ArtifactDraftBuilder::default()
    }

    /// Set the category hint.
    pub fn with_category_hint(mut self, category: Category) -> Self {
        self.category_hint = Some(category);
        self
    }

    /// Validate, slug, hash and classify the draft.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` when the name has no usable characters or the
    /// content is empty or whitespace only.
    pub fn prepare(&self, classifier: &dyn Classifier) -> Result<PreparedArtifact, RegistryError> {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            return Err(RegistryError::new(RegistryErrorKind::InvalidArtifact(
                format!("artifact name '{}' has no usable characters", self.name),
            )));
        }
        if self.content.iter().all(u8::is_ascii_whitespace) {
            return Err(RegistryError::new(RegistryErrorKind::InvalidArtifact(
                format!("artifact '{}' has no classifiable content", self.name),
            )));
        }
        let hash = content_hash(&self.content);
        let category = self
            .category_hint
            .unwrap_or_else(|| classifier.classify(&self.content));
        Ok(PreparedArtifact {
            id: PreparedArtifact::compute_id(&slug, &hash),
            name: self.name.clone(),
            slug,
            category,
            content_ref: content_ref(&hash),
            content_hash: hash,
        })
    }
}

/// A validated artifact that is not yet attached to a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PreparedArtifact {
    /// Id over (slug, content hash)
    id: ArtifactId,
    /// Name as authored
    name: String,
    /// Normalised name
    slug: String,
    /// Classified or hinted category
    category: Category,
    /// Hex SHA-256 of the content
    content_hash: String,
    /// `sha256:<hash>` reference to the stored body
    content_ref: String,
}

impl PreparedArtifact {
    /// Artifact id for a slug and content hash.
    pub fn compute_id(slug: &str, content_hash: &str) -> ArtifactId {
        ArtifactId::new(hash_fields(["artifact", slug, content_hash]))
    }

    /// Attach the artifact to the checkpoint that introduced it.
    pub fn attach(
        self,
        story_id: impl Into<String>,
        checkpoint_id: CheckpointId,
        story_tag: impl Into<String>,
    ) -> ArtifactRecord {
        ArtifactRecord {
            id: self.id,
            name: self.name,
            slug: self.slug,
            story_id: story_id.into(),
            checkpoint_id,
            story_tag: story_tag.into(),
            category: self.category,
            content_hash: self.content_hash,
            content_ref: self.content_ref,
            sequence: 0,
        }
    }
}

/// Identity of an ingested record: `(story id, checkpoint id, slug)`.
///
/// Registry resolution is defined over records in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Origin story
    pub story_id: String,
    /// Introducing checkpoint
    pub checkpoint_id: CheckpointId,
    /// Normalised name
    pub slug: String,
}

/// A named unit of content introduced at a checkpoint, owned by its story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ArtifactRecord {
    /// Id over (slug, content hash)
    id: ArtifactId,
    /// Name as authored
    name: String,
    /// Normalised name
    slug: String,
    /// Origin story
    story_id: String,
    /// Introducing checkpoint
    checkpoint_id: CheckpointId,
    /// Suffix tag for colliding names
    story_tag: String,
    /// Category bucket
    category: Category,
    /// Hex SHA-256 of the content
    content_hash: String,
    /// `sha256:<hash>` reference to the stored body
    content_ref: String,
    /// Position of the introducing checkpoint in its story's history
    #[serde(default)]
    sequence: u64,
}

impl ArtifactRecord {
    /// Record the position of the introducing checkpoint. Versions of a
    /// variant are ordered by it.
    pub fn at_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// The same content introduced at another checkpoint, e.g. when a
    /// checkpoint is canonised into another line of history.
    pub fn reattach(
        &self,
        story_id: impl Into<String>,
        checkpoint_id: CheckpointId,
        story_tag: impl Into<String>,
    ) -> ArtifactRecord {
        ArtifactRecord {
            story_id: story_id.into(),
            checkpoint_id,
            story_tag: story_tag.into(),
            ..self.clone()
        }
    }

    /// Key this record is ordered and deduplicated by.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            story_id: self.story_id.clone(),
            checkpoint_id: self.checkpoint_id.clone(),
            slug: self.slug.clone(),
        }
    }
}
