use codex_core::{ArtifactId, BranchRef, CheckpointId};
use codex_error::{CodexError, CodexErrorKind, ErrorClass, LogErrorKind};
use codex_log::{Appended, CheckpointLog, StoryLog};
use std::sync::Arc;

fn log_kind(err: &CodexError) -> &LogErrorKind {
    match err.kind() {
        CodexErrorKind::Log(e) => &e.kind,
        other => panic!("expected a log error, got {other}"),
    }
}

fn story_with_root(log: &CheckpointLog, story: &str) -> CheckpointId {
    log.create_story(story, "noir").unwrap();
    log.append(story, None, "sha256:intro", vec![]).unwrap().into_id()
}

#[test]
fn identical_appends_yield_one_checkpoint() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    let artifacts = vec![ArtifactId::from("a1")];

    let first = log
        .append("noir", Some(&root), "sha256:turn", artifacts.clone())
        .unwrap();
    let second = log
        .append("noir", Some(&root), "sha256:turn", artifacts)
        .unwrap();

    assert!(first.is_new());
    assert_eq!(second, Appended::Existing(first.id().clone()));
    assert_eq!(log.children(&root).unwrap().len(), 1);
}

#[test]
fn root_retry_is_idempotent() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    let retry = log.append("noir", None, "sha256:intro", vec![]).unwrap();
    assert_eq!(retry, Appended::Existing(root));
}

#[test]
fn unknown_parent_is_rejected() {
    let log = CheckpointLog::new();
    story_with_root(&log, "noir");
    let western_root = story_with_root(&log, "western");

    let err = log
        .append("noir", Some(&western_root), "sha256:turn", vec![])
        .unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::UnknownParent { .. }));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn unrelated_stories_have_distinct_roots() {
    let log = CheckpointLog::new();
    let noir = story_with_root(&log, "noir");
    let western = story_with_root(&log, "western");
    assert_ne!(noir, western);
}

#[test]
fn creating_a_story_twice_conflicts() {
    let log = CheckpointLog::new();
    log.create_story("noir", "noir").unwrap();
    let err = log.create_story("noir", "noir").unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::StoryExists(_)));
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[test]
fn branches_extend_independently() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    assert_eq!(log.head("noir", "main").unwrap(), root);

    let main_1 = log
        .append_to_branch("noir", "main", "sha256:main1", vec![])
        .unwrap()
        .into_id();
    let alt = log.branch("noir", &root, "alt").unwrap();
    assert_eq!(alt, BranchRef::new("noir", "alt"));

    let alt_1 = log
        .append_to_branch("noir", "alt", "sha256:alt1", vec![])
        .unwrap()
        .into_id();

    assert_eq!(log.head("noir", "main").unwrap(), main_1);
    assert_eq!(log.head("noir", "alt").unwrap(), alt_1);
    assert_eq!(log.checkpoint(&alt_1).unwrap().parent().as_ref(), Some(&root));
    assert_eq!(*log.checkpoint(&alt_1).unwrap().sequence(), 1);
    assert_eq!(log.story("noir").unwrap().head().as_ref(), Some(&alt_1));
}

#[test]
fn branch_name_taken_conflicts() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    log.branch("noir", &root, "alt").unwrap();
    let err = log.branch("noir", &root, "alt").unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::BranchNameTaken { .. }));
}

#[test]
fn append_after_is_a_compare_and_swap() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");

    let first = log
        .append_after("noir", "main", &root, "sha256:turn", vec![])
        .unwrap();
    assert!(first.is_new());

    // the same call again is a retry of the stored continuation
    let retry = log
        .append_after("noir", "main", &root, "sha256:turn", vec![])
        .unwrap();
    assert_eq!(retry, Appended::Existing(first.id().clone()));

    // a different continuation of a stale parent is rejected
    let err = log
        .append_after("noir", "main", &root, "sha256:other", vec![])
        .unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::BranchMoved { .. }));
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(log.head("noir", "main").unwrap(), *first.id());
}

#[test]
fn appending_to_a_missing_branch_fails() {
    let log = CheckpointLog::new();
    story_with_root(&log, "noir");
    let err = log
        .append_to_branch("noir", "nowhere", "sha256:x", vec![])
        .unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::BranchNotFound { .. }));
}

#[test]
fn first_branch_append_creates_the_root() {
    let log = CheckpointLog::new();
    log.create_story("noir", "noir").unwrap();
    let root = log
        .append_to_branch("noir", "main", "sha256:intro", vec![])
        .unwrap()
        .into_id();
    assert!(log.checkpoint(&root).unwrap().is_root());
    assert_eq!(log.head("noir", "main").unwrap(), root);
}

#[test]
fn restore_returns_the_chain_from_root() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    let one = log
        .append_to_branch("noir", "main", "sha256:one", vec![])
        .unwrap()
        .into_id();
    let two = log
        .append_to_branch("noir", "main", "sha256:two", vec![])
        .unwrap()
        .into_id();

    let chain: Vec<_> = log
        .restore("noir", &two)
        .unwrap()
        .iter()
        .map(|c| c.id().clone())
        .collect();
    assert_eq!(chain, vec![root, one, two]);

    let err = log
        .restore("noir", &CheckpointId::from("missing"))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn fork_shares_history_without_copying() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    let one = log
        .append_to_branch("noir", "main", "sha256:one", vec![])
        .unwrap()
        .into_id();
    log.append_to_branch("noir", "main", "sha256:two", vec![])
        .unwrap();

    let fork = log.fork("noir", &one, "noir_alt", None).unwrap();
    assert_eq!(fork.genre(), "noir");
    assert!(fork.knows(&root));
    assert!(fork.knows(&one));
    assert_eq!(fork.known().len(), 2);
    assert_eq!(log.head("noir_alt", "main").unwrap(), one);

    let continued = log
        .append_to_branch("noir_alt", "main", "sha256:alt", vec![])
        .unwrap()
        .into_id();
    assert_eq!(log.children(&one).unwrap().len(), 2);
    assert!(!log.story("noir").unwrap().knows(&continued));
}

#[test]
fn graft_fast_forwards_and_reparents() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    log.branch("noir", &root, "alt").unwrap();
    let alt_1 = log
        .append_to_branch("noir", "alt", "sha256:alt1", vec![])
        .unwrap()
        .into_id();
    let source = log.checkpoint(&alt_1).unwrap();

    // main still points at the root, so the copy is the same node
    let target = BranchRef::main("noir");
    let grafted = log.graft(&target, &root, &[source.clone()]).unwrap();
    assert_eq!(grafted, vec![Appended::Existing(alt_1.clone())]);
    assert_eq!(log.head("noir", "main").unwrap(), alt_1);

    // a stale head is refused
    let err = log.graft(&target, &root, &[source]).unwrap_err();
    assert!(matches!(log_kind(&err), LogErrorKind::BranchMoved { .. }));
}

#[test]
fn graft_records_lineage_on_reparented_copies() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    log.branch("noir", &root, "alt").unwrap();
    let alt_1 = log
        .append_to_branch("noir", "alt", "sha256:alt1", vec![])
        .unwrap()
        .into_id();
    let main_1 = log
        .append_to_branch("noir", "main", "sha256:main1", vec![])
        .unwrap()
        .into_id();

    let source = log.checkpoint(&alt_1).unwrap();
    let grafted = log
        .graft(&BranchRef::main("noir"), &main_1, &[source])
        .unwrap();
    let copy = log.checkpoint(grafted[0].id()).unwrap();
    assert_ne!(copy.id(), &alt_1);
    assert_eq!(copy.parent().as_ref(), Some(&main_1));
    assert_eq!(copy.origin().as_ref(), Some(&alt_1));
    assert_eq!(copy.lineage_id(), &alt_1);
}

#[test]
fn story_logs_rebuild_the_same_log() {
    let log = CheckpointLog::new();
    let root = story_with_root(&log, "noir");
    let one = log
        .append_to_branch("noir", "main", "sha256:one", vec![ArtifactId::from("a")])
        .unwrap()
        .into_id();
    log.fork("noir", &root, "noir_alt", Some("noir")).unwrap();

    let logs: Vec<StoryLog> = ["noir", "noir_alt"]
        .iter()
        .map(|id| log.story_log(id).unwrap())
        .collect();
    let json = serde_json::to_string(&logs).unwrap();
    let decoded: Vec<StoryLog> = serde_json::from_str(&json).unwrap();

    let rebuilt = CheckpointLog::from_story_logs(decoded).unwrap();
    assert_eq!(rebuilt.head("noir", "main").unwrap(), one);
    assert_eq!(rebuilt.children(&root).unwrap(), vec![one]);
    assert_eq!(rebuilt.stories().unwrap().len(), 2);
}

#[test]
fn tampered_story_log_is_an_invariant_violation() {
    let log = CheckpointLog::new();
    story_with_root(&log, "noir");
    let mut story_log = log.story_log("noir").unwrap();
    let json = serde_json::to_string(&story_log.checkpoints[0])
        .unwrap()
        .replace("sha256:intro", "sha256:forged");
    story_log.checkpoints[0] = serde_json::from_str(&json).unwrap();

    let err = CheckpointLog::from_story_logs([story_log]).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Invariant);
}

#[test]
fn concurrent_appends_to_one_story_are_serialised() {
    let log = Arc::new(CheckpointLog::new());
    story_with_root(&log, "noir");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let log = Arc::clone(&log);
            std::thread::spawn(move || {
                log.append_to_branch("noir", "main", &format!("sha256:turn{i}"), vec![])
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let head = log.head("noir", "main").unwrap();
    let chain = log.restore("noir", &head).unwrap();
    assert_eq!(chain.len(), 9);
    for (i, checkpoint) in chain.iter().enumerate() {
        assert_eq!(*checkpoint.sequence(), i as u64);
    }
}
