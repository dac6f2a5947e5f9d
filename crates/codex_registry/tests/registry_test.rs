use codex_core::{ArtifactDraft, ArtifactRecord, Category, CheckpointId, KeywordClassifier, Thresholds};
use codex_error::ErrorClass;
use codex_registry::{ArtifactFilter, ConvergenceEvent, Registry, ThresholdState};
use std::sync::Arc;

fn record(story: &str, checkpoint: &str, name: &str, content: &str, tag: &str) -> ArtifactRecord {
    ArtifactDraft::new(name, content)
        .prepare(&KeywordClassifier::default())
        .unwrap()
        .attach(story, CheckpointId::from(checkpoint), tag)
}

fn filler(n: usize) -> Vec<ArtifactRecord> {
    (0..n)
        .map(|i| {
            record(
                &format!("story_{i:03}"),
                "c1",
                &format!("tool_{i:03}"),
                &format!("generate variant {i}"),
                "filler",
            )
        })
        .collect()
}

#[test]
fn colliding_names_become_tagged_variants() {
    let registry = Registry::new(Thresholds::default());
    let a = registry
        .ingest(record("story_a", "c1", "scanner", "scan ports", "cyberpunk"))
        .unwrap();
    let b = registry
        .ingest(record("story_b", "c1", "scanner", "scan alleys", "noir"))
        .unwrap();

    assert_eq!((a.entry_id.as_str(), a.variant.as_str()), ("scanner", "scanner"));
    assert_eq!((b.entry_id.as_str(), b.variant.as_str()), ("scanner", "scanner_noir"));
    assert_eq!(registry.total().unwrap(), 2);

    let entry = registry.lookup("scanner").unwrap();
    assert_eq!(entry.variants(), &vec!["scanner".to_string(), "scanner_noir".to_string()]);
    assert_eq!(*entry.category(), Category::Analysis);
    assert_eq!(entry.content_hashes().len(), 2);
}

#[test]
fn identical_content_under_a_new_name_joins_the_entry() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "scanner", "scan ports", "cyberpunk"))
        .unwrap();
    registry
        .ingest(record("story_b", "c1", "scanner", "scan alleys", "noir"))
        .unwrap();
    let c = registry
        .ingest(record("story_c", "c1", "signal_decoder", "scan ports", "western"))
        .unwrap();

    assert_eq!(c.entry_id, "scanner");
    assert_eq!(c.variant, "signal_decoder");
    let snapshot = registry.snapshot().unwrap();
    assert_eq!(snapshot.entries().count(), 1);

    let entry = registry.lookup("Signal Decoder").unwrap();
    assert_eq!(entry.id(), "scanner");
    assert_eq!(entry.hash_of("signal_decoder"), entry.hash_of("scanner"));
    assert_eq!(registry.total().unwrap(), 3);
}

#[test]
fn same_story_rediscovering_content_keeps_its_variant() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "scanner", "scan ports", "cyberpunk"))
        .unwrap();
    let again = registry
        .ingest(record("story_a", "c2", "port_probe", "scan ports", "cyberpunk"))
        .unwrap();
    assert_eq!(again.variant, "scanner");
    assert!(again.counted);
    assert_eq!(registry.total().unwrap(), 2);
}

#[test]
fn shared_tags_get_numeric_disambiguators() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "decoder", "decode a", "noir"))
        .unwrap();
    let b = registry
        .ingest(record("story_b", "c1", "decoder", "decode b", "noir"))
        .unwrap();
    let c = registry
        .ingest(record("story_c", "c1", "decoder", "decode c", "noir"))
        .unwrap();
    assert_eq!(b.variant, "decoder_noir");
    assert_eq!(c.variant, "decoder_noir_2");
}

#[test]
fn revisions_from_one_story_become_versions_of_its_variant() {
    // checkpoint ids sort against the order the revisions were written in
    let first = record("noir_01", "c9", "decoder", "decode v1", "noir").at_sequence(1);
    let second = record("noir_01", "c2", "decoder", "decode v2", "noir").at_sequence(2);
    let third = record("noir_01", "c5", "decoder", "decode v3", "noir").at_sequence(3);

    let registry = Registry::new(Thresholds::default());
    let mut versions = Vec::new();
    for r in [first.clone(), second.clone(), third.clone()] {
        let outcome = registry.ingest(r).unwrap();
        assert_eq!(outcome.variant, "decoder");
        assert!(outcome.counted);
        versions.push(outcome.version);
    }
    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(registry.total().unwrap(), 3);

    let entry = registry.lookup("decoder").unwrap();
    assert_eq!(entry.variants(), &vec!["decoder".to_string()]);
    let history: Vec<&str> = entry
        .versions_of("decoder")
        .unwrap()
        .iter()
        .map(|v| v.checkpoint_id.as_str())
        .collect();
    assert_eq!(history, vec!["c9", "c2", "c5"]);
    assert_eq!(entry.hash_of("decoder"), Some(third.content_hash()));
    assert_eq!(entry.version_number("decoder", first.content_hash()), Some(1));
    assert_eq!(entry.version_number("decoder", third.content_hash()), Some(3));

    // another story's decoder is still a collision
    let other = registry
        .ingest(record("western_01", "c1", "decoder", "decode smoke", "western"))
        .unwrap();
    assert_eq!(other.variant, "decoder_western");
    assert_eq!(other.version, 1);

    let backward = Registry::new(Thresholds::default());
    for r in [third, second, first] {
        assert_eq!(backward.ingest(r).unwrap().variant, "decoder");
    }
    backward
        .ingest(record("western_01", "c1", "decoder", "decode smoke", "western"))
        .unwrap();
    assert_eq!(backward.document().unwrap(), registry.document().unwrap());
}

#[test]
fn resolution_is_independent_of_arrival_order() {
    let a = record("story_a", "c1", "scanner", "scan ports", "cyberpunk");
    let b = record("story_b", "c1", "scanner", "scan alleys", "noir");
    let c = record("story_c", "c1", "scanner", "scan docks", "noir");

    let forward = Registry::new(Thresholds::default());
    for r in [a.clone(), b.clone(), c.clone()] {
        forward.ingest(r).unwrap();
    }

    let backward = Registry::new(Thresholds::default());
    backward.ingest(c).unwrap();
    let outcome = backward.ingest(b).unwrap();
    assert!(!outcome.renamed.is_empty());
    let outcome = backward.ingest(a).unwrap();
    assert_eq!(outcome.variant, "scanner");
    assert!(!outcome.renamed.is_empty());

    let forward_doc = forward.document().unwrap();
    let backward_doc = backward.document().unwrap();
    assert_eq!(forward_doc.entries, backward_doc.entries);
    assert_eq!(forward_doc.variants, backward_doc.variants);
    assert_eq!(forward_doc.content_hashes, backward_doc.content_hashes);
}

#[test]
fn reingesting_a_record_is_a_no_op() {
    let registry = Registry::new(Thresholds::default());
    let r = record("story_a", "c1", "scanner", "scan ports", "cyberpunk");
    assert!(registry.ingest(r.clone()).unwrap().counted);
    let again = registry.ingest(r).unwrap();
    assert!(!again.counted);
    assert_eq!(again.variant, "scanner");
    assert_eq!(registry.total().unwrap(), 1);
}

#[test]
fn same_key_with_different_content_is_rejected() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "scanner", "scan ports", "cyberpunk"))
        .unwrap();
    let err = registry
        .ingest(record("story_a", "c1", "scanner", "scan everything", "cyberpunk"))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidInput);
    assert_eq!(registry.total().unwrap(), 1);
}

#[test]
fn thresholds_fire_once_each_and_replay_identically() {
    let registry = Registry::new(Thresholds::default());
    let mut fired = Vec::new();
    for r in filler(26) {
        let outcome = registry.ingest(r).unwrap();
        fired.extend(outcome.events.iter().map(|e| (*e.threshold(), *e.total_at_crossing())));
    }
    assert_eq!(fired, vec![(10, 10), (25, 25)]);
    assert_eq!(registry.state_of(10).unwrap(), Some(ThresholdState::Above));
    assert_eq!(registry.state_of(50).unwrap(), Some(ThresholdState::Below));
    assert_eq!(registry.state_of(7).unwrap(), None);

    let replay = Registry::new(Thresholds::default());
    let mut replayed = Vec::new();
    for r in registry.records().unwrap() {
        replayed.extend(
            replay
                .ingest(r)
                .unwrap()
                .events
                .iter()
                .map(|e| (*e.threshold(), *e.total_at_crossing())),
        );
    }
    assert_eq!(replayed, fired);
}

#[test]
fn bulk_jump_fires_each_crossed_threshold_in_order() {
    let registry = Registry::new(Thresholds::default());
    let records = filler(30);
    let (first, rest) = records.split_at(8);
    registry.ingest_batch(first.to_vec()).unwrap();

    let outcome = registry.ingest_batch(rest.to_vec()).unwrap();
    let thresholds: Vec<u64> = outcome.events.iter().map(|e| *e.threshold()).collect();
    assert_eq!(thresholds, vec![10, 25]);
    assert!(outcome.events.iter().all(|e| *e.total_at_crossing() == 30));
    assert_eq!(outcome.events[0].trigger_entry(), "tool_009");

    let again = registry.ingest_batch(rest.to_vec()).unwrap();
    assert!(again.events.is_empty());
    assert!(again.assignments.iter().all(|a| !a.counted));
    assert_eq!(registry.events().unwrap().len(), 2);
}

#[test]
fn search_and_find_are_lazy_and_restartable() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "scanner", "scan ports", "cyberpunk"))
        .unwrap();
    registry
        .ingest(record("story_b", "c1", "signal decoder", "decode cipher", "noir"))
        .unwrap();
    registry
        .ingest(record("story_b", "c2", "net probe", "open socket http", "noir"))
        .unwrap();

    let mut hits = registry.search("SCAN").unwrap();
    assert_eq!(hits.next().map(|e| e.id().clone()), Some("scanner".to_string()));
    assert!(hits.next().is_none());
    hits.restart();
    assert_eq!(hits.count(), 1);

    let spaced: Vec<_> = registry.search("signal decoder").unwrap().collect();
    assert_eq!(spaced.len(), 1);

    let from_b: Vec<String> = registry
        .find(ArtifactFilter::default().with_story("story_b".to_string()))
        .unwrap()
        .map(|e| e.id().clone())
        .collect();
    assert_eq!(from_b, vec!["net_probe".to_string(), "signal_decoder".to_string()]);

    let crypto: Vec<_> = registry
        .find(ArtifactFilter::default().with_category(Category::Crypto))
        .unwrap()
        .collect();
    assert_eq!(crypto.len(), 1);
    assert_eq!(
        registry.categories_in_use().unwrap().into_iter().collect::<Vec<_>>(),
        vec![Category::Analysis, Category::Crypto, Category::Network]
    );
}

#[test]
fn lookup_of_unknown_name_is_not_found() {
    let registry = Registry::new(Thresholds::default());
    let err = registry.lookup("ghost").unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn status_reports_progress() {
    let registry = Registry::new(Thresholds::default());
    registry.ingest_batch(filler(12)).unwrap();
    let status = registry.status().unwrap();
    assert_eq!(status.current_artifacts, 12);
    assert_eq!(status.next_threshold, Some(25));
    assert!((status.progress_to_next - 12.0 / 25.0).abs() < 1e-9);
    assert!((status.pattern_completion - 12.0 / 144.0).abs() < 1e-9);
}

#[test]
fn resonances_use_the_keyword_pairs() {
    let registry = Registry::new(Thresholds::default());
    registry
        .ingest(record("story_a", "c1", "decoder", "decode cipher", "noir"))
        .unwrap();
    registry
        .ingest(record("story_b", "c1", "lantern", "render light", "western"))
        .unwrap();

    let resonances = registry.resonances("signal_encoder").unwrap();
    assert_eq!(resonances.len(), 1);
    assert_eq!(resonances[0].entry_id, "decoder");
    assert_eq!(resonances[0].resonance, "encoder <-> decoder");
    assert_eq!(resonances[0].stories, vec!["story_a".to_string()]);
}

#[test]
fn restore_keeps_crossed_thresholds() {
    let registry = Registry::new(Thresholds::default());
    registry.ingest_batch(filler(11)).unwrap();
    let records = registry.records().unwrap();
    let events = registry.events().unwrap();

    let json = serde_json::to_string(&(records, events)).unwrap();
    let (records, events): (Vec<ArtifactRecord>, Vec<ConvergenceEvent>) =
        serde_json::from_str(&json).unwrap();
    let restored = Registry::restore(Thresholds::default(), records, events).unwrap();

    assert_eq!(restored.document().unwrap(), registry.document().unwrap());
    let outcome = restored
        .ingest(record("story_zzz", "c1", "extra", "watch", "late"))
        .unwrap();
    assert!(outcome.events.is_empty());
    assert_eq!(restored.events().unwrap().len(), 1);
}

#[test]
fn concurrent_ingestion_matches_sequential_replay() {
    let records = filler(40);
    let registry = Arc::new(Registry::new(Thresholds::default()));
    let handles: Vec<_> = records
        .chunks(10)
        .map(|chunk| {
            let registry = Arc::clone(&registry);
            let chunk = chunk.to_vec();
            std::thread::spawn(move || {
                for r in chunk.into_iter().rev() {
                    registry.ingest(r).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sequential = Registry::new(Thresholds::default());
    sequential.ingest_batch(records).unwrap();
    assert_eq!(registry.document().unwrap(), sequential.document().unwrap());
    let thresholds: Vec<u64> = registry
        .events()
        .unwrap()
        .iter()
        .map(|e| *e.threshold())
        .collect();
    assert_eq!(thresholds, vec![10, 25]);
}
