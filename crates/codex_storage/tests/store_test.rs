//! Tests for the filesystem and in-memory stores.

use chrono::Utc;
use codex_core::{ArtifactDraft, CheckpointId, KeywordClassifier, Thresholds};
use codex_error::ErrorClass;
use codex_log::CheckpointLog;
use codex_registry::{ConvergenceEvent, Registry};
use codex_storage::{BlobStore, CodexStore, DirectoryLock, FileSystemStore, MemoryStore};
use tempfile::TempDir;

fn sample_log() -> CheckpointLog {
    let log = CheckpointLog::new();
    log.create_story("noir_01", "noir").unwrap();
    log.append_to_branch("noir_01", "main", "sha256:intro", vec![])
        .unwrap();
    log.append_to_branch("noir_01", "main", "sha256:turn", vec![])
        .unwrap();
    log
}

fn sample_registry() -> Registry {
    let registry = Registry::new(Thresholds::default());
    let record = ArtifactDraft::new("scanner", "scan ports")
        .prepare(&KeywordClassifier::default())
        .unwrap()
        .attach("noir_01", CheckpointId::from("c1"), "noir");
    registry.ingest(record).unwrap();
    registry
}

async fn exercise_store(store: &dyn CodexStore) {
    let log = sample_log();
    let story_log = log.story_log("noir_01").unwrap();

    store.save_story(&story_log).await.unwrap();
    assert_eq!(store.load_story("noir_01").await.unwrap(), story_log);
    assert_eq!(store.list_stories().await.unwrap(), vec!["noir_01".to_string()]);

    let err = store.load_story("ghost").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Storage);

    assert!(store.load_registry().await.unwrap().is_none());
    let document = sample_registry().document().unwrap();
    store.save_registry(&document).await.unwrap();
    assert_eq!(store.load_registry().await.unwrap(), Some(document));

    assert!(store.load_events().await.unwrap().is_empty());
    let first = ConvergenceEvent::new(10, 10, Utc::now(), "scanner");
    let second = ConvergenceEvent::new(25, 30, Utc::now(), "decoder");
    store.append_events(&[first.clone()]).await.unwrap();
    store.append_events(&[second.clone()]).await.unwrap();
    assert_eq!(store.load_events().await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn filesystem_store_round_trips_documents() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(temp_dir.path()).unwrap();
    exercise_store(&store).await;

    assert!(temp_dir.path().join("stories/noir_01.json").exists());
    assert!(temp_dir.path().join("registry.json").exists());
    assert!(temp_dir.path().join("events.json").exists());
}

#[tokio::test]
async fn memory_store_round_trips_documents() {
    let store = MemoryStore::new();
    exercise_store(&store).await;
}

#[tokio::test]
async fn filesystem_store_rejects_path_like_story_ids() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(temp_dir.path()).unwrap();
    assert!(store.load_story("../escape").await.is_err());
}

#[tokio::test]
async fn saved_logs_rebuild_the_checkpoint_log() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(temp_dir.path()).unwrap();
    let log = sample_log();
    store
        .save_story(&log.story_log("noir_01").unwrap())
        .await
        .unwrap();

    let mut logs = Vec::new();
    for id in store.list_stories().await.unwrap() {
        logs.push(store.load_story(&id).await.unwrap());
    }
    let rebuilt = CheckpointLog::from_story_logs(logs).unwrap();
    assert_eq!(
        rebuilt.head("noir_01", "main").unwrap(),
        log.head("noir_01", "main").unwrap()
    );
}

#[tokio::test]
async fn blobs_are_deduplicated_and_verified() {
    let temp_dir = TempDir::new().unwrap();
    let blobs = BlobStore::new(temp_dir.path().join("blobs")).unwrap();

    let first = blobs.put(b"The rain never stops.").await.unwrap();
    let second = blobs.put(b"The rain never stops.").await.unwrap();
    assert_eq!(first, second);
    assert!(first.starts_with("sha256:"));
    assert!(blobs.contains(&first).await.unwrap());
    assert_eq!(blobs.get(&first).await.unwrap(), b"The rain never stops.");

    let hash = first.trim_start_matches("sha256:");
    let path = temp_dir
        .path()
        .join("blobs")
        .join(&hash[0..2])
        .join(&hash[2..4])
        .join(hash);
    std::fs::write(&path, b"tampered").unwrap();
    let err = blobs.get(&first).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Storage);
}

#[tokio::test]
async fn malformed_blob_references_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let blobs = BlobStore::new(temp_dir.path()).unwrap();
    assert!(blobs.get("blob:42").await.is_err());
    assert!(blobs.contains("sha256:short").await.is_err());
}

#[test]
fn data_directory_admits_one_session_at_a_time() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("data");

    let held = DirectoryLock::acquire(&root).unwrap();
    assert!(held.path().ends_with(DirectoryLock::FILE_NAME));

    let err = DirectoryLock::acquire(&root).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(err.to_string().contains("in use by another session"));

    drop(held);
    let again = DirectoryLock::acquire(&root).unwrap();
    assert!(again.path().exists());
}
