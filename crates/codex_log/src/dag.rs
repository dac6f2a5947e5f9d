//! Append-only checkpoint DAG shared by all stories.

use crate::StoryLog;
use chrono::Utc;
use codex_core::{
    ArtifactId, BranchRef, Checkpoint, CheckpointId, MAIN_BRANCH, Story, lock_mutex, read_lock,
    slugify, write_lock,
};
use codex_error::{CodexResult, InvariantError, LogError, LogErrorKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, instrument};

/// Outcome of an append.
///
/// Re-submitting an identical continuation is not an error: the existing
/// checkpoint id is returned as [`Appended::Existing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Appended {
    /// A new checkpoint node was created
    New(CheckpointId),
    /// An identical continuation of the same parent already existed
    Existing(CheckpointId),
}

impl Appended {
    /// The checkpoint id, new or existing.
    pub fn id(&self) -> &CheckpointId {
        match self {
            Appended::New(id) | Appended::Existing(id) => id,
        }
    }

    /// Consume into the checkpoint id.
    pub fn into_id(self) -> CheckpointId {
        match self {
            Appended::New(id) | Appended::Existing(id) => id,
        }
    }

    /// Whether a node was created.
    pub fn is_new(&self) -> bool {
        matches!(self, Appended::New(_))
    }
}

/// Node storage with parent pointers and a separate child index.
#[derive(Debug, Default)]
struct Arena {
    nodes: HashMap<CheckpointId, Checkpoint>,
    children: BTreeMap<CheckpointId, BTreeSet<CheckpointId>>,
}

impl Arena {
    fn get(&self, id: &CheckpointId) -> CodexResult<&Checkpoint> {
        self.nodes.get(id).ok_or_else(|| {
            LogError::new(LogErrorKind::CheckpointNotFound(id.to_string())).into()
        })
    }

    /// First-parent chain from the root to `id`, inclusive.
    fn chain(&self, id: &CheckpointId) -> CodexResult<Vec<Checkpoint>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let node = self.get(&current)?;
            cursor = node.parent().clone();
            chain.push(node.clone());
            if chain.len() > self.nodes.len() {
                return Err(InvariantError::new(format!(
                    "cycle detected in ancestry of checkpoint {}",
                    id
                ))
                .into());
            }
        }
        chain.reverse();
        Ok(chain)
    }

    fn insert(&mut self, checkpoint: Checkpoint) -> CodexResult<Appended> {
        let id = checkpoint.id().clone();
        if let Some(existing) = self.nodes.get(&id) {
            if existing.parent() != checkpoint.parent() {
                return Err(InvariantError::new(format!(
                    "checkpoint id {} collides with a node that has a different parent",
                    id
                ))
                .into());
            }
            return Ok(Appended::Existing(id));
        }
        if let Some(parent) = checkpoint.parent() {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(id.clone());
        }
        self.nodes.insert(id.clone(), checkpoint);
        Ok(Appended::New(id))
    }
}

/// The checkpoint log for every story.
///
/// Mutations of one story are serialised by that story's mutex; the shared
/// node arena is guarded by a read-write lock. Lock order is story table,
/// then story, then arena.
#[derive(Debug, Default)]
pub struct CheckpointLog {
    arena: RwLock<Arena>,
    stories: RwLock<BTreeMap<String, Arc<Mutex<Story>>>>,
}

impl CheckpointLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted story logs.
    ///
    /// Nodes shared between stories are inserted once. Every node is checked
    /// against its content hash.
    ///
    /// # Errors
    ///
    /// `InvariantError` if a stored node does not hash to its id or collides
    /// with a node that has a different parent; `StoryExists` if two logs
    /// carry the same story id.
    pub fn from_story_logs(logs: impl IntoIterator<Item = StoryLog>) -> CodexResult<Self> {
        let mut arena = Arena::default();
        let mut stories = BTreeMap::new();
        let mut nodes = Vec::new();
        for log in logs {
            let story_id = log.story.id().clone();
            if stories.contains_key(&story_id) {
                return Err(LogError::new(LogErrorKind::StoryExists(story_id)).into());
            }
            nodes.extend(log.checkpoints);
            stories.insert(story_id, Arc::new(Mutex::new(log.story)));
        }
        nodes.sort_by(|a, b| a.sequence().cmp(b.sequence()).then_with(|| a.id().cmp(b.id())));
        for node in nodes {
            let expected = Checkpoint::compute_id(
                node.story_id(),
                node.parent().as_ref(),
                node.payload_ref(),
                node.artifacts(),
            );
            if &expected != node.id() {
                return Err(InvariantError::new(format!(
                    "stored checkpoint {} does not match its content hash",
                    node.id()
                ))
                .into());
            }
            arena.insert(node)?;
        }
        debug!(
            stories = stories.len(),
            checkpoints = arena.nodes.len(),
            "Rebuilt checkpoint log"
        );
        Ok(Self {
            arena: RwLock::new(arena),
            stories: RwLock::new(stories),
        })
    }

    fn story_handle(&self, story_id: &str) -> CodexResult<Arc<Mutex<Story>>> {
        let stories = read_lock(&self.stories, "story table")?;
        stories.get(story_id).cloned().ok_or_else(|| {
            LogError::new(LogErrorKind::StoryNotFound(story_id.to_string())).into()
        })
    }

    /// Create a new, empty story.
    ///
    /// # Errors
    ///
    /// `StoryExists` if the id is taken; `InvalidInput` if the id is not a slug.
    #[instrument(skip(self), fields(story = %story_id))]
    pub fn create_story(&self, story_id: &str, genre: &str) -> CodexResult<Story> {
        validate_story_id(story_id)?;
        let mut stories = write_lock(&self.stories, "story table")?;
        if stories.contains_key(story_id) {
            return Err(LogError::new(LogErrorKind::StoryExists(story_id.to_string())).into());
        }
        let story = Story::new(story_id, genre, Utc::now());
        stories.insert(story_id.to_string(), Arc::new(Mutex::new(story.clone())));
        info!(genre, "Created story");
        Ok(story)
    }

    /// Append a checkpoint to a story.
    ///
    /// `parent = None` starts the story and is only legal while the story has
    /// no checkpoints. The story head moves to the result; branch pointers do
    /// not.
    ///
    /// # Errors
    ///
    /// `UnknownParent` if the parent is not part of the story's history;
    /// `MissingParent` if the story already has a root.
    #[instrument(skip(self, payload_ref, artifacts), fields(story = %story_id, artifacts = artifacts.len()))]
    pub fn append(
        &self,
        story_id: &str,
        parent: Option<&CheckpointId>,
        payload_ref: &str,
        artifacts: Vec<ArtifactId>,
    ) -> CodexResult<Appended> {
        let handle = self.story_handle(story_id)?;
        let mut story = lock_mutex(&handle, "story")?;
        self.extend(&mut story, parent.cloned(), payload_ref, artifacts, None)
    }

    /// Append onto the head of a named branch and advance the branch.
    ///
    /// The first append to an empty story may target `main`, which creates
    /// the root.
    ///
    /// # Errors
    ///
    /// `BranchNotFound` if the branch does not exist.
    #[instrument(skip(self, payload_ref, artifacts), fields(story = %story_id, artifacts = artifacts.len()))]
    pub fn append_to_branch(
        &self,
        story_id: &str,
        branch: &str,
        payload_ref: &str,
        artifacts: Vec<ArtifactId>,
    ) -> CodexResult<Appended> {
        let handle = self.story_handle(story_id)?;
        let mut story = lock_mutex(&handle, "story")?;
        let parent = branch_parent(&story, branch)?;
        let appended = self.extend(&mut story, parent, payload_ref, artifacts, None)?;
        story.set_branch(branch, appended.id().clone());
        Ok(appended)
    }

    /// Append onto a branch only if it still points at `parent`.
    ///
    /// When the branch already points at the checkpoint this call would
    /// create, the call is a retry and returns the existing id.
    ///
    /// # Errors
    ///
    /// `BranchMoved` if the branch points elsewhere; `BranchNotFound` if the
    /// story has no such branch.
    #[instrument(skip(self, payload_ref, artifacts), fields(story = %story_id, parent = %parent.short()))]
    pub fn append_after(
        &self,
        story_id: &str,
        branch: &str,
        parent: &CheckpointId,
        payload_ref: &str,
        artifacts: Vec<ArtifactId>,
    ) -> CodexResult<Appended> {
        let handle = self.story_handle(story_id)?;
        let mut story = lock_mutex(&handle, "story")?;
        let head = story.branch(branch).cloned().ok_or_else(|| {
            LogError::new(LogErrorKind::BranchNotFound {
                story: story_id.to_string(),
                branch: branch.to_string(),
            })
        })?;
        let expected = Checkpoint::compute_id(story.id(), Some(parent), payload_ref, &artifacts);
        if head == expected {
            debug!(checkpoint = %expected.short(), "Branch already holds this continuation");
            story.set_head(expected.clone());
            return Ok(Appended::Existing(expected));
        }
        if head != *parent {
            return Err(LogError::new(LogErrorKind::BranchMoved {
                story: story_id.to_string(),
                branch: branch.to_string(),
            })
            .into());
        }
        let appended = self.extend(&mut story, Some(head), payload_ref, artifacts, None)?;
        story.set_branch(branch, appended.id().clone());
        Ok(appended)
    }

    /// Re-append checkpoints from another line of history onto a branch.
    ///
    /// Each copy records the lineage id of the checkpoint it came from. When
    /// a source checkpoint already continues the branch head, the copy hashes
    /// to the source id and the branch simply fast-forwards.
    ///
    /// # Errors
    ///
    /// `BranchMoved` if the branch no longer points at `expected_head`.
    #[instrument(skip(self, sources), fields(target = %target, count = sources.len()))]
    pub fn graft(
        &self,
        target: &BranchRef,
        expected_head: &CheckpointId,
        sources: &[Checkpoint],
    ) -> CodexResult<Vec<Appended>> {
        let handle = self.story_handle(target.story())?;
        let mut story = lock_mutex(&handle, "story")?;
        match story.branch(target.branch()) {
            Some(head) if head == expected_head => {}
            Some(_) => {
                return Err(LogError::new(LogErrorKind::BranchMoved {
                    story: target.story().clone(),
                    branch: target.branch().clone(),
                })
                .into());
            }
            None => {
                return Err(LogError::new(LogErrorKind::BranchNotFound {
                    story: target.story().clone(),
                    branch: target.branch().clone(),
                })
                .into());
            }
        }

        let mut appended = Vec::with_capacity(sources.len());
        let mut parent = expected_head.clone();
        for source in sources {
            let next = self.extend(
                &mut story,
                Some(parent),
                source.payload_ref(),
                source.artifacts().clone(),
                Some(source.lineage_id().clone()),
            )?;
            parent = next.id().clone();
            appended.push(next);
        }
        story.set_branch(target.branch(), parent);
        info!(grafted = appended.len(), "Grafted checkpoints");
        Ok(appended)
    }

    fn extend(
        &self,
        story: &mut Story,
        parent: Option<CheckpointId>,
        payload_ref: &str,
        artifacts: Vec<ArtifactId>,
        origin: Option<CheckpointId>,
    ) -> CodexResult<Appended> {
        let mut arena = write_lock(&self.arena, "checkpoint arena")?;
        let sequence = match &parent {
            Some(parent) => {
                if !story.knows(parent) {
                    return Err(LogError::new(LogErrorKind::UnknownParent {
                        story: story.id().clone(),
                        parent: parent.to_string(),
                    })
                    .into());
                }
                arena.get(parent)?.sequence() + 1
            }
            None if !story.is_empty() => {
                let root = Checkpoint::compute_id(story.id(), None, payload_ref, &artifacts);
                if story.knows(&root) {
                    debug!(checkpoint = %root.short(), "Root already recorded");
                    story.set_head(root.clone());
                    return Ok(Appended::Existing(root));
                }
                return Err(LogError::new(LogErrorKind::MissingParent(story.id().clone())).into());
            }
            None => 0,
        };

        let checkpoint = Checkpoint::new(
            story.id(),
            parent,
            sequence,
            payload_ref,
            artifacts,
            origin,
            Utc::now(),
        );
        let appended = arena.insert(checkpoint)?;
        drop(arena);

        let id = appended.id().clone();
        if story.is_empty() {
            story.set_branch(MAIN_BRANCH, id.clone());
        }
        story.learn(id.clone());
        story.set_head(id.clone());
        match &appended {
            Appended::New(_) => info!(checkpoint = %id.short(), sequence, "Appended checkpoint"),
            Appended::Existing(_) => {
                debug!(checkpoint = %id.short(), "Identical continuation already recorded")
            }
        }
        Ok(appended)
    }

    /// Create a named branch pointing at a checkpoint the story knows.
    ///
    /// # Errors
    ///
    /// `BranchNameTaken` if the name exists; `CheckpointNotFound` if the
    /// checkpoint is not part of the story's history.
    #[instrument(skip(self), fields(story = %story_id, from = %from.short()))]
    pub fn branch(&self, story_id: &str, from: &CheckpointId, name: &str) -> CodexResult<BranchRef> {
        validate_branch_name(name)?;
        let handle = self.story_handle(story_id)?;
        let mut story = lock_mutex(&handle, "story")?;
        if !story.knows(from) {
            return Err(LogError::new(LogErrorKind::CheckpointNotFound(from.to_string())).into());
        }
        if story.branch(name).is_some() {
            return Err(LogError::new(LogErrorKind::BranchNameTaken {
                story: story_id.to_string(),
                branch: name.to_string(),
            })
            .into());
        }
        story.set_branch(name, from.clone());
        info!(branch = name, "Created branch");
        Ok(BranchRef::new(story_id, name))
    }

    /// Start a new story from a checkpoint of an existing one.
    ///
    /// The new story shares the ancestor chain; its `main` branch and head
    /// point at `from`. `genre` defaults to the source story's genre.
    ///
    /// # Errors
    ///
    /// `StoryExists` for a taken id; `CheckpointNotFound` if the source story
    /// does not know `from`.
    #[instrument(skip(self, genre), fields(source = %source_story, from = %from.short(), story = %new_story_id))]
    pub fn fork(
        &self,
        source_story: &str,
        from: &CheckpointId,
        new_story_id: &str,
        genre: Option<&str>,
    ) -> CodexResult<Story> {
        validate_story_id(new_story_id)?;
        let genre = {
            let handle = self.story_handle(source_story)?;
            let source = lock_mutex(&handle, "story")?;
            if !source.knows(from) {
                return Err(
                    LogError::new(LogErrorKind::CheckpointNotFound(from.to_string())).into(),
                );
            }
            genre.map(str::to_string).unwrap_or_else(|| source.genre().clone())
        };
        let chain = read_lock(&self.arena, "checkpoint arena")?.chain(from)?;

        let mut story = Story::new(new_story_id, genre, Utc::now());
        for checkpoint in &chain {
            story.learn(checkpoint.id().clone());
        }
        story.set_head(from.clone());
        story.set_branch(MAIN_BRANCH, from.clone());

        let mut stories = write_lock(&self.stories, "story table")?;
        if stories.contains_key(new_story_id) {
            return Err(LogError::new(LogErrorKind::StoryExists(new_story_id.to_string())).into());
        }
        stories.insert(new_story_id.to_string(), Arc::new(Mutex::new(story.clone())));
        info!(shared = chain.len(), "Forked story");
        Ok(story)
    }

    /// Ancestor chain from the root to `checkpoint`, read-only.
    ///
    /// # Errors
    ///
    /// `CheckpointNotFound` if the story does not know the checkpoint.
    #[instrument(skip(self), fields(story = %story_id, checkpoint = %checkpoint.short()))]
    pub fn restore(&self, story_id: &str, checkpoint: &CheckpointId) -> CodexResult<Vec<Checkpoint>> {
        {
            let handle = self.story_handle(story_id)?;
            let story = lock_mutex(&handle, "story")?;
            if !story.knows(checkpoint) {
                return Err(
                    LogError::new(LogErrorKind::CheckpointNotFound(checkpoint.to_string())).into(),
                );
            }
        }
        read_lock(&self.arena, "checkpoint arena")?.chain(checkpoint)
    }

    /// Checkpoint a branch points at.
    ///
    /// # Errors
    ///
    /// `BranchNotFound` if the story has no such branch.
    pub fn head(&self, story_id: &str, branch: &str) -> CodexResult<CheckpointId> {
        let handle = self.story_handle(story_id)?;
        let story = lock_mutex(&handle, "story")?;
        story.branch(branch).cloned().ok_or_else(|| {
            LogError::new(LogErrorKind::BranchNotFound {
                story: story_id.to_string(),
                branch: branch.to_string(),
            })
            .into()
        })
    }

    /// Snapshot of a story.
    pub fn story(&self, story_id: &str) -> CodexResult<Story> {
        let handle = self.story_handle(story_id)?;
        let story = lock_mutex(&handle, "story")?;
        Ok(story.clone())
    }

    /// Snapshots of every story, ordered by id.
    pub fn stories(&self) -> CodexResult<Vec<Story>> {
        let handles: Vec<_> = read_lock(&self.stories, "story table")?
            .values()
            .cloned()
            .collect();
        handles
            .iter()
            .map(|handle| -> CodexResult<Story> { Ok(lock_mutex(handle, "story")?.clone()) })
            .collect()
    }

    /// Branch pointers of a story.
    pub fn branches(&self, story_id: &str) -> CodexResult<BTreeMap<String, CheckpointId>> {
        Ok(self.story(story_id)?.branches().clone())
    }

    /// A checkpoint by id.
    pub fn checkpoint(&self, id: &CheckpointId) -> CodexResult<Checkpoint> {
        read_lock(&self.arena, "checkpoint arena")?.get(id).cloned()
    }

    /// Whether the arena holds a checkpoint.
    pub fn contains(&self, id: &CheckpointId) -> CodexResult<bool> {
        Ok(read_lock(&self.arena, "checkpoint arena")?.nodes.contains_key(id))
    }

    /// Direct children of a checkpoint across all stories, ordered by id.
    pub fn children(&self, id: &CheckpointId) -> CodexResult<Vec<CheckpointId>> {
        let arena = read_lock(&self.arena, "checkpoint arena")?;
        arena.get(id)?;
        Ok(arena
            .children
            .get(id)
            .map(|children| children.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// First-parent chain from the root to `id`, regardless of story.
    pub fn chain(&self, id: &CheckpointId) -> CodexResult<Vec<Checkpoint>> {
        read_lock(&self.arena, "checkpoint arena")?.chain(id)
    }

    /// Persistable view of one story, without decision markers.
    pub fn story_log(&self, story_id: &str) -> CodexResult<StoryLog> {
        let story = self.story(story_id)?;
        let arena = read_lock(&self.arena, "checkpoint arena")?;
        let mut checkpoints = story
            .known()
            .iter()
            .map(|id| arena.get(id).cloned())
            .collect::<CodexResult<Vec<_>>>()?;
        checkpoints.sort_by(|a, b| a.sequence().cmp(b.sequence()).then_with(|| a.id().cmp(b.id())));
        Ok(StoryLog {
            story,
            checkpoints,
            decisions: BTreeMap::new(),
        })
    }
}

fn branch_parent(story: &Story, branch: &str) -> CodexResult<Option<CheckpointId>> {
    match story.branch(branch) {
        Some(head) => Ok(Some(head.clone())),
        None if story.is_empty() && branch == MAIN_BRANCH => Ok(None),
        None => Err(LogError::new(LogErrorKind::BranchNotFound {
            story: story.id().clone(),
            branch: branch.to_string(),
        })
        .into()),
    }
}

fn validate_story_id(story_id: &str) -> CodexResult<()> {
    if story_id.is_empty() || slugify(story_id) != story_id {
        return Err(LogError::new(LogErrorKind::InvalidInput(format!(
            "story id '{}' must be a non-empty slug of [a-z0-9_]",
            story_id
        )))
        .into());
    }
    Ok(())
}

fn validate_branch_name(name: &str) -> CodexResult<()> {
    if name.trim().is_empty() || name.contains(':') || name.chars().any(char::is_whitespace) {
        return Err(LogError::new(LogErrorKind::InvalidInput(format!(
            "branch name '{}' must be non-empty without whitespace or ':'",
            name
        )))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_root_is_rejected() {
        let log = CheckpointLog::new();
        log.create_story("noir", "noir").unwrap();
        log.append("noir", None, "sha256:one", vec![]).unwrap();
        let err = log.append("noir", None, "sha256:two", vec![]).unwrap_err();
        assert_eq!(err.class(), codex_error::ErrorClass::InvalidInput);
    }

    #[test]
    fn child_index_tracks_siblings() {
        let log = CheckpointLog::new();
        log.create_story("noir", "noir").unwrap();
        let root = log.append("noir", None, "sha256:root", vec![]).unwrap().into_id();
        let a = log.append("noir", Some(&root), "sha256:a", vec![]).unwrap().into_id();
        let b = log.append("noir", Some(&root), "sha256:b", vec![]).unwrap().into_id();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(log.children(&root).unwrap(), expected);
    }

    #[test]
    fn story_ids_must_be_slugs() {
        let log = CheckpointLog::new();
        assert!(log.create_story("Neo Noir", "noir").is_err());
        assert!(log.create_story("", "noir").is_err());
    }
}
