//! Tests for the turn pipeline.

use codex_core::{ArtifactDraft, Thresholds};
use codex_engine::{Codex, Turn};
use codex_error::ErrorClass;

fn codex_with_stories(stories: &[(&str, &str)]) -> Codex {
    let codex = Codex::new(Thresholds::default());
    for (id, genre) in stories {
        codex.new_story(Some(id), genre).unwrap();
    }
    codex
}

#[test]
fn colliding_names_across_stories_resolve_to_variants() {
    let codex = codex_with_stories(&[("a", "cyber"), ("b", "noir"), ("c", "western")]);

    let a = codex
        .continue_story(
            "a",
            "main",
            Turn::new("sha256:a0").with_artifact(ArtifactDraft::new("scanner", "scan the ports")),
        )
        .unwrap();
    let b = codex
        .continue_story(
            "b",
            "main",
            Turn::new("sha256:b0").with_artifact(ArtifactDraft::new("scanner", "scan the alley")),
        )
        .unwrap();
    let c = codex
        .continue_story(
            "c",
            "main",
            Turn::new("sha256:c0")
                .with_artifact(ArtifactDraft::new("Signal Decoder", "scan the ports")),
        )
        .unwrap();

    assert_eq!(a.assignments[0].variant, "scanner");
    assert_eq!(b.assignments[0].variant, "scanner_noir");
    assert_eq!(c.assignments[0].entry_id, "scanner");
    assert_eq!(c.assignments[0].variant, "signal_decoder");

    let entry = codex.registry().lookup("signal_decoder").unwrap();
    assert_eq!(entry.id(), "scanner");
    assert_eq!(entry.variants().len(), 3);
    assert_eq!(codex.registry().total().unwrap(), 3);
}

#[test]
fn malformed_artifact_leaves_history_untouched() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let turn = Turn::new("sha256:intro")
        .with_artifact(ArtifactDraft::new("scanner", "scan"))
        .with_artifact(ArtifactDraft::new("blank", "   "));

    let err = codex.continue_story("noir", "main", turn).unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidInput);
    assert!(codex.log().story("noir").unwrap().is_empty());
    assert_eq!(codex.registry().total().unwrap(), 0);
}

#[test]
fn unknown_story_and_branch_are_not_found() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    codex
        .continue_story("noir", "main", Turn::new("sha256:intro"))
        .unwrap();

    let err = codex
        .continue_story("ghost", "main", Turn::new("sha256:x"))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);

    let err = codex
        .continue_story("noir", "side", Turn::new("sha256:x"))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn branches_continue_independently() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let root = codex
        .continue_story("noir", "main", Turn::new("sha256:intro"))
        .unwrap();
    codex.branch("noir", "alt", None).unwrap();

    let main = codex
        .continue_story("noir", "main", Turn::new("sha256:left"))
        .unwrap();
    let alt = codex
        .continue_story("noir", "alt", Turn::new("sha256:right"))
        .unwrap();

    assert_ne!(main.checkpoint, alt.checkpoint);
    assert_eq!(main.sequence, 1);
    assert_eq!(alt.sequence, 1);
    assert_eq!(
        codex.log().children(&root.checkpoint).unwrap().len(),
        2
    );

    let err = codex.branch("noir", "alt", None).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[test]
fn restore_reports_decisions_and_variants() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let first = codex
        .continue_story(
            "noir",
            "main",
            Turn::new("sha256:intro")
                .with_artifact(ArtifactDraft::new("decoder", "decode the cipher"))
                .with_decision("Which door?", vec!["left".into(), "right".into()]),
        )
        .unwrap();
    let second = codex
        .continue_story(
            "noir",
            "main",
            Turn::new("sha256:door").with_artifact(ArtifactDraft::new("scanner", "scan the room")),
        )
        .unwrap();
    codex
        .continue_story("noir", "main", Turn::new("sha256:later"))
        .unwrap();

    let restored = codex.restore("noir", &second.checkpoint).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].checkpoint.id(), &first.checkpoint);
    assert_eq!(
        restored[0].decision.as_ref().map(|d| d.options().len()),
        Some(2)
    );
    assert_eq!(restored[0].variants, vec!["decoder".to_string()]);
    assert!(restored[1].decision.is_none());
    assert_eq!(restored[1].variants, vec!["scanner".to_string()]);

    // restore is read-only
    assert_ne!(codex.head("noir", "main").unwrap(), second.checkpoint);
}

#[test]
fn forks_list_marked_checkpoints_per_story() {
    let codex = codex_with_stories(&[("noir", "noir"), ("other", "western")]);
    let root = codex
        .continue_story(
            "noir",
            "main",
            Turn::new("sha256:intro").with_decision("Trust her?", vec!["yes".into(), "no".into()]),
        )
        .unwrap();
    codex
        .continue_story("other", "main", Turn::new("sha256:saloon"))
        .unwrap();

    let forked = codex
        .fork("noir", &root.checkpoint, "noir_yes", None)
        .unwrap();
    assert_eq!(forked.genre(), "noir");

    let in_fork: Vec<_> = codex.forks(Some("noir_yes")).unwrap().collect();
    assert_eq!(in_fork, vec![root.checkpoint.clone()]);
    assert_eq!(codex.forks(Some("other")).unwrap().count(), 0);
    assert_eq!(codex.forks(None).unwrap().count(), 1);
}

#[test]
fn retried_turns_resolve_to_the_same_checkpoint() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let root = codex
        .continue_story("noir", "main", Turn::new("sha256:intro"))
        .unwrap();
    let turn = Turn::new("sha256:door")
        .with_parent(root.checkpoint.clone())
        .with_artifact(ArtifactDraft::new("lockpick", "pick the lock"));

    let first = codex.continue_story("noir", "main", turn.clone()).unwrap();
    let retry = codex.continue_story("noir", "main", turn).unwrap();
    assert_eq!(first.checkpoint, retry.checkpoint);
    assert_eq!(codex.registry().total().unwrap(), 1);

    // another author continuing from the same stale parent is told to refresh
    let stale = Turn::new("sha256:window").with_parent(root.checkpoint);
    let err = codex.continue_story("noir", "main", stale).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[test]
fn a_different_decision_on_retry_is_a_conflict() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let root = codex
        .continue_story("noir", "main", Turn::new("sha256:intro"))
        .unwrap();
    codex
        .continue_story(
            "noir",
            "main",
            Turn::new("sha256:door")
                .with_parent(root.checkpoint.clone())
                .with_decision("Trust her?", vec!["yes".into()]),
        )
        .unwrap();

    let err = codex
        .continue_story(
            "noir",
            "main",
            Turn::new("sha256:door")
                .with_parent(root.checkpoint)
                .with_decision("Run?", vec!["yes".into()]),
        )
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[test]
fn thresholds_fire_once_as_turns_accumulate() {
    let codex = codex_with_stories(&[("noir", "noir")]);
    let mut fired = Vec::new();
    for i in 0..10 {
        let turn = Turn::new(format!("sha256:turn{i}"))
            .with_artifact(ArtifactDraft::new(format!("tool {i}"), format!("scan sector {i}")));
        let report = codex.continue_story("noir", "main", turn).unwrap();
        fired.extend(report.events.iter().map(|e| *e.threshold()));
    }
    assert_eq!(fired, vec![10]);

    let status = codex.status().unwrap();
    assert_eq!(status.current_artifacts, 10);
    assert_eq!(status.next_threshold, Some(25));
}

#[test]
fn rewriting_an_artifact_adds_a_version() {
    let codex = codex_with_stories(&[("noir_01", "noir")]);
    let mut reports = Vec::new();
    for (i, body) in ["decode(v1)", "decode(v2)", "decode(v3)"].iter().enumerate() {
        let turn = Turn::new(format!("sha256:scene{i}"))
            .with_artifact(ArtifactDraft::new("decoder", *body));
        reports.push(codex.continue_story("noir_01", "main", turn).unwrap());
    }

    let resolved: Vec<(&str, usize)> = reports
        .iter()
        .map(|r| (r.assignments[0].variant.as_str(), r.assignments[0].version))
        .collect();
    assert_eq!(resolved, vec![("decoder", 1), ("decoder", 2), ("decoder", 3)]);

    let entry = codex.registry().lookup("decoder").unwrap();
    assert_eq!(entry.variants(), &vec!["decoder".to_string()]);
    let history: Vec<_> = entry
        .versions_of("decoder")
        .unwrap()
        .iter()
        .map(|v| v.checkpoint_id.clone())
        .collect();
    let checkpoints: Vec<_> = reports.iter().map(|r| r.checkpoint.clone()).collect();
    assert_eq!(history, checkpoints);
    assert_eq!(codex.registry().total().unwrap(), 3);
}
