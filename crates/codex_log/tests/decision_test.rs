use codex_core::CheckpointId;
use codex_error::ErrorClass;
use codex_log::{CheckpointLog, DecisionIndex};

fn options() -> Vec<String> {
    vec!["trust her".to_string(), "walk away".to_string()]
}

#[test]
fn marking_twice_conflicts() {
    let log = CheckpointLog::new();
    log.create_story("noir", "noir").unwrap();
    let root = log.append("noir", None, "sha256:intro", vec![]).unwrap().into_id();

    let index = DecisionIndex::new();
    index.mark(&log, &root, "Trust her?", options()).unwrap();
    let err = index.mark(&log, &root, "Again?", options()).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(
        index.decision(&root).unwrap().unwrap().prompt(),
        "Trust her?"
    );
}

#[test]
fn marking_requires_a_known_checkpoint_and_options() {
    let log = CheckpointLog::new();
    log.create_story("noir", "noir").unwrap();
    let root = log.append("noir", None, "sha256:intro", vec![]).unwrap().into_id();
    let index = DecisionIndex::new();

    let err = index
        .mark(&log, &CheckpointId::from("missing"), "?", options())
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);

    let err = index.mark(&log, &root, "?", vec![]).unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidInput);

    let err = index
        .mark(&log, &root, "?", vec!["ok".into(), " ".into()])
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidInput);
    assert!(!index.is_marked(&root).unwrap());
}

#[test]
fn listings_are_sorted_scoped_snapshots() {
    let log = CheckpointLog::new();
    log.create_story("noir", "noir").unwrap();
    log.create_story("western", "western").unwrap();
    let noir_root = log.append("noir", None, "sha256:a", vec![]).unwrap().into_id();
    let noir_next = log
        .append("noir", Some(&noir_root), "sha256:b", vec![])
        .unwrap()
        .into_id();
    let western_root = log.append("western", None, "sha256:c", vec![]).unwrap().into_id();

    let index = DecisionIndex::new();
    index.mark(&log, &noir_root, "?", options()).unwrap();
    index.mark(&log, &western_root, "?", options()).unwrap();

    let everything = index.list_forkable().unwrap();
    let ids: Vec<_> = everything.clone().collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 2);

    // marks made after the listing do not show up in it
    index.mark(&log, &noir_next, "?", options()).unwrap();
    assert_eq!(everything.count(), 2);

    let noir = log.story("noir").unwrap();
    let mut scoped: Vec<_> = index.list_forkable_in(&noir).unwrap().collect();
    scoped.sort();
    let mut expected = vec![noir_root, noir_next];
    expected.sort();
    assert_eq!(scoped, expected);
    assert_eq!(index.markers_for(&noir).unwrap().len(), 2);
}
