mod helpers;

use std::fs::{self, OpenOptions};
use std::io::Write;

use helpers::{open_log, test_options};
use mnemos::memory::{LogOptions, LogPaths, RecordLog};
use tempfile::TempDir;

fn seed(dir: &std::path::Path, contents: &[&str]) -> Vec<String> {
    let log = open_log(dir);
    let ids = contents
        .iter()
        .map(|c| log.store("EVENT", c, 0.0, None, None).unwrap().id)
        .collect();
    log.close().unwrap();
    ids
}

#[test]
fn lost_sidecar_is_rebuilt_on_open() {
    let tmp = TempDir::new().unwrap();
    let ids = seed(tmp.path(), &["one", "two", "three"]);
    fs::remove_file(LogPaths::in_dir(tmp.path()).index).unwrap();

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 3);
    for id in &ids {
        assert!(log.get(id).unwrap().is_some());
    }
    assert_eq!(log.category_counts().get("EVENT"), Some(&3));
    assert!(LogPaths::in_dir(tmp.path()).index.exists());
}

#[test]
fn stale_sidecar_picks_up_the_log_tail() {
    let tmp = TempDir::new().unwrap();
    let paths = LogPaths::in_dir(tmp.path());
    seed(tmp.path(), &["a", "b"]);
    let stale = fs::read(&paths.index).unwrap();

    let later = seed(tmp.path(), &["c", "d"]);
    // Simulate a crash before the sidecar caught up.
    fs::write(&paths.index, stale).unwrap();

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 4);
    for id in &later {
        assert!(log.get(id).unwrap().is_some());
    }
    assert_eq!(log.total_records_ever(), 4);
}

#[test]
fn explicit_repair_when_startup_repair_is_off() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), &["x", "y", "z"]);
    let paths = LogPaths::in_dir(tmp.path());
    fs::remove_file(&paths.index).unwrap();

    let log = RecordLog::open(
        paths,
        LogOptions {
            repair_on_open: false,
            ..test_options()
        },
    )
    .unwrap();
    assert_eq!(log.record_count(), 0);

    let report = log.repair().unwrap();
    assert_eq!(report.previously_indexed, 0);
    assert_eq!(report.indexed, 3);
    assert_eq!(report.degraded_lines, 0);
    assert_eq!(log.record_count(), 3);
}

#[test]
fn unreadable_sidecar_falls_back_to_a_rescan() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), &["kept"]);
    fs::write(LogPaths::in_dir(tmp.path()).index, "not an index\n").unwrap();

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 1);
    assert_eq!(log.get_recent(1)[0].content, "kept");
}

#[test]
fn sidecar_offsets_past_the_log_trigger_a_rebuild() {
    let tmp = TempDir::new().unwrap();
    let paths = LogPaths::in_dir(tmp.path());
    seed(tmp.path(), &["first", "second"]);
    let text = fs::read_to_string(&paths.index).unwrap();
    let last_line = text.lines().last().unwrap().to_string();
    let (id, _) = last_line.split_once('|').unwrap();
    fs::write(&paths.index, text.replace(&last_line, &format!("{id}|999999"))).unwrap();

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 2);
    assert!(log.verify().is_healthy());
}

#[test]
fn sidecar_missing_a_category_entry_is_rebuilt() {
    let tmp = TempDir::new().unwrap();
    let paths = LogPaths::in_dir(tmp.path());
    let ids = seed(tmp.path(), &["listed", "unlisted"]);
    let text = fs::read_to_string(&paths.index).unwrap();
    let full = format!("EVENT|{},{}", ids[0], ids[1]);
    assert!(text.contains(&full));
    fs::write(&paths.index, text.replace(&full, &format!("EVENT|{}", ids[0]))).unwrap();

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 2);
    let events: Vec<String> = log
        .get_by_category("EVENT")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(events, ids);
}

#[test]
fn torn_log_tail_does_not_corrupt_the_next_append() {
    let tmp = TempDir::new().unwrap();
    let paths = LogPaths::in_dir(tmp.path());
    seed(tmp.path(), &["before crash"]);

    // A crash mid-append leaves a partial line with no newline.
    {
        let mut f = OpenOptions::new().append(true).open(&paths.log).unwrap();
        f.write_all(b"deadbeef0000|17000").unwrap();
    }

    let after_id = {
        let log = open_log(tmp.path());
        assert_eq!(log.record_count(), 1);
        let r = log.store("EVENT", "after crash", 0.0, None, None).unwrap();
        log.close().unwrap();
        r.id
    };

    let log = open_log(tmp.path());
    assert_eq!(log.record_count(), 2);
    assert_eq!(log.get(&after_id).unwrap().unwrap().content, "after crash");
    assert!(log.verify().is_healthy());

    let report = log.repair().unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(report.degraded_lines, 1);
}
