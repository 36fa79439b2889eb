mod helpers;

use std::collections::BTreeMap;

use helpers::{open_log, test_options};
use mnemos::error::StoreError;
use mnemos::memory::{LogOptions, LogPaths, RecordLog};
use tempfile::TempDir;

#[test]
fn store_then_get_recent_returns_the_record() {
    let tmp = TempDir::new().unwrap();
    let log = open_log(tmp.path());

    let stored = log.store("EVENT", "hello", 0.5, None, None).unwrap();
    let recent = log.get_recent(1);

    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].category, "EVENT");
    assert_eq!(recent[0].content, "hello");
    assert_eq!(recent[0].relevance_score, 0.5);
    assert_eq!(recent[0].id, stored.id);
}

#[test]
fn records_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let mut ids = Vec::new();
    {
        let log = open_log(tmp.path());
        for i in 0..10 {
            let r = log
                .store("KNOWLEDGE", &format!("fact {i}"), i as f64, None, None)
                .unwrap();
            ids.push(r.id);
        }
        log.close().unwrap();
    }

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 10);
    for (i, id) in ids.iter().enumerate() {
        let record = log.get(id).unwrap().expect("record should survive restart");
        assert_eq!(record.content, format!("fact {i}"));
        assert!(record.verify_hash());
    }
}

#[test]
fn sidecar_alone_restores_records_after_drop() {
    let tmp = TempDir::new().unwrap();
    let stored: Vec<_> = {
        let log = open_log(tmp.path());
        let stored = (0..50)
            .map(|i| {
                let mut meta = BTreeMap::new();
                meta.insert("n".to_string(), i.to_string());
                let entity = (i % 3 == 0).then_some("ops");
                let category = if i % 2 == 0 { "EVENT" } else { "SKILL" };
                log.store(category, &format!("note {i}"), i as f64 / 10.0, entity, Some(meta))
                    .unwrap()
            })
            .collect();
        // Dropped without close().
        drop(log);
        stored
    };

    let log = RecordLog::open(
        LogPaths::in_dir(tmp.path()),
        LogOptions {
            repair_on_open: false,
            ..test_options()
        },
    )
    .unwrap();
    assert_eq!(log.record_count(), stored.len());
    for record in &stored {
        assert_eq!(log.get(&record.id).unwrap().as_ref(), Some(record));
    }
    assert_eq!(log.get_by_category("EVENT").len(), 25);
    assert_eq!(log.get_by_category("SKILL").len(), 25);
}

#[test]
fn awkward_text_round_trips_through_the_line_format() {
    let tmp = TempDir::new().unwrap();
    let content = "pipes | commas , equals = and\nnewlines\r\nplus ünïcödé 🦀";
    let mut meta = BTreeMap::new();
    meta.insert("k=ey|1".to_string(), "v,al\nue".to_string());
    meta.insert("empty".to_string(), String::new());

    let id = {
        let log = open_log(tmp.path());
        let r = log
            .store("CODE", content, -1.25e-3, Some("team|ops"), Some(meta.clone()))
            .unwrap();
        log.close().unwrap();
        r.id
    };

    let log = open_log(tmp.path());
    let record = log.get(&id).unwrap().unwrap();
    assert_eq!(record.content, content);
    assert_eq!(record.entity_name.as_deref(), Some("team|ops"));
    assert_eq!(record.metadata, meta);
    assert_eq!(record.relevance_score, -1.25e-3);
}

#[test]
fn category_index_matches_stored_categories() {
    let tmp = TempDir::new().unwrap();
    let log = open_log(tmp.path());
    let categories = ["EVENT", "CODE", "EVENT", "QUESTION", "EVENT", "CODE"];
    for (i, cat) in categories.iter().enumerate() {
        log.store(cat, &format!("item {i}"), 0.0, None, None).unwrap();
    }

    for cat in ["EVENT", "CODE", "QUESTION"] {
        let records = log.get_by_category(cat);
        let expected = categories.iter().filter(|c| **c == cat).count();
        assert_eq!(records.len(), expected, "{cat}");
        assert!(records.iter().all(|r| r.category == cat));
        assert_eq!(log.category_counts().get(cat), Some(&expected));
    }
    assert!(log.get_by_category("ANSWER").is_empty());

    // insertion order within a category
    let events: Vec<String> = log
        .get_by_category("EVENT")
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(events, vec!["item 0", "item 2", "item 4"]);
}

#[test]
fn queries_filter_on_the_right_fields() {
    let tmp = TempDir::new().unwrap();
    let log = open_log(tmp.path());
    log.store("EVENT", "Deployed v2.3 on Friday", 0.9, Some("ops"), None)
        .unwrap();
    log.store("KNOWLEDGE", "User prefers Rust over Go", 0.5, Some("alice"), None)
        .unwrap();
    log.store("ANSWER", "Run make deploy", 0.1, Some("ops"), None)
        .unwrap();

    let ops = log.get_by_entity("ops");
    assert_eq!(ops.len(), 2);
    assert!(log.get_by_entity("bob").is_empty());

    // content, category, and entity are all searched, case-insensitively
    assert_eq!(log.search("deploy").len(), 2);
    assert_eq!(log.search("knowledge").len(), 1);
    assert_eq!(log.search("ALICE").len(), 1);
    assert!(log.search("kubernetes").is_empty());

    // bounds are inclusive
    let mid = log.get_by_score_range(0.1, 0.5);
    assert_eq!(mid.len(), 2);
    assert!(log.get_by_score_range(0.95, 2.0).is_empty());
}

#[test]
fn recent_is_oldest_first_and_clamped() {
    let tmp = TempDir::new().unwrap();
    let log = open_log(tmp.path());
    for i in 0..5 {
        log.store("EVENT", &format!("e{i}"), 0.0, None, None).unwrap();
    }

    let last_two: Vec<String> = log.get_recent(2).into_iter().map(|r| r.content).collect();
    assert_eq!(last_two, vec!["e3", "e4"]);
    assert_eq!(log.get_recent(50).len(), 5);
    assert!(log.get_recent(0).is_empty());
}

#[test]
fn rejected_category_leaves_log_untouched() {
    let tmp = TempDir::new().unwrap();
    let log = open_log(tmp.path());
    log.store("EVENT", "kept", 0.0, None, None).unwrap();

    for bad in ["", "A|B", "A,B", "A=B", "A\nB"] {
        let err = log.store(bad, "dropped", 0.0, None, None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCategory(_)), "{bad:?}");
    }
    assert_eq!(log.record_count(), 1);
    assert!(log.search("dropped").is_empty());
}

#[test]
fn lifetime_total_survives_purge_and_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let log = open_log(tmp.path());
        for i in 0..4 {
            log.store("EVENT", &format!("e{i}"), 0.0, None, None).unwrap();
        }
        log.purge().unwrap();
        log.store("EVENT", "after purge", 0.0, None, None).unwrap();
        log.close().unwrap();
    }

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 1);
    assert_eq!(log.total_records_ever(), 5);
    assert_eq!(log.get_recent(5)[0].content, "after purge");
}
