//! Tests for wait accumulation, categorization, and the journal

use super::*;
use chrono::Duration;
use std::path::Path;

fn raw(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

#[test]
fn test_first_snapshot_has_zero_deltas() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let snapshot = acc.record(
        raw(&[("LCK_M_S", 1000), ("WRITELOG", 500)]),
        &categories,
        false,
        Utc::now(),
    );

    assert!(snapshot
        .waits
        .values()
        .all(|s| s.delta_per_minute == 0.0));
    assert!(snapshot.summary.is_empty());
}

#[test]
fn test_per_minute_delta() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();
    acc.record(raw(&[("LCK_M_S", 1000)]), &categories, false, start);
    let snapshot = acc.record(
        raw(&[("LCK_M_S", 4000)]),
        &categories,
        false,
        start + Duration::seconds(60),
    );

    // 3000ms over 60s → 3000/60*60 = 3000 per minute
    let sample = &snapshot.waits["LCK_M_S"];
    assert!((sample.delta_per_minute - 3000.0).abs() < 1e-6);
    assert!((snapshot.summary["Lock"] - 3000.0).abs() < 1e-6);
}

#[test]
fn test_reset_zeroes_deltas_for_one_cycle() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();
    acc.record(raw(&[("WRITELOG", 100)]), &categories, false, start);

    let reset_snap = acc.record(
        raw(&[("WRITELOG", 9000)]),
        &categories,
        true,
        start + Duration::seconds(60),
    );
    assert_eq!(reset_snap.waits["WRITELOG"].delta_per_minute, 0.0);

    // resumes on the next cycle
    let resumed = acc.record(
        raw(&[("WRITELOG", 9600)]),
        &categories,
        false,
        start + Duration::seconds(120),
    );
    assert!((resumed.waits["WRITELOG"].delta_per_minute - 600.0).abs() < 1e-6);
}

#[test]
fn test_decreasing_value_never_negative() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();
    acc.record(raw(&[("CXPACKET", 5000)]), &categories, false, start);
    let snapshot = acc.record(
        raw(&[("CXPACKET", 100)]),
        &categories,
        false,
        start + Duration::seconds(60),
    );
    assert_eq!(snapshot.waits["CXPACKET"].delta_per_minute, 0.0);
}

#[test]
fn test_excluded_category_dropped_from_summary() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();
    acc.record(
        raw(&[("LAZYWRITER_SLEEP", 1000), ("LCK_M_X", 1000)]),
        &categories,
        false,
        start,
    );
    let snapshot = acc.record(
        raw(&[("LAZYWRITER_SLEEP", 7000), ("LCK_M_X", 2000)]),
        &categories,
        false,
        start + Duration::seconds(60),
    );

    // raw per-type delta is retained for the excluded type
    assert!(snapshot.waits["LAZYWRITER_SLEEP"].delta_per_minute > 0.0);
    // but it contributes nothing to the category summary
    assert!(!snapshot.summary.contains_key("Idle"));
    assert!(!snapshot.summary.contains_key("LAZYWRITER_SLEEP"));
    assert!(snapshot.summary.contains_key("Lock"));
}

#[test]
fn test_unmapped_type_is_own_category() {
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();
    acc.record(raw(&[("SOME_OBSCURE_WAIT", 100)]), &categories, false, start);
    let snapshot = acc.record(
        raw(&[("SOME_OBSCURE_WAIT", 700)]),
        &categories,
        false,
        start + Duration::seconds(60),
    );
    assert!(snapshot.summary.contains_key("SOME_OBSCURE_WAIT"));
}

#[test]
fn test_top_groups_tie_broken_alphabetically() {
    let make = |summary: &[(&str, f64)]| WaitSnapshot {
        server_key: "sql01".to_string(),
        captured_at: Utc::now(),
        waits: HashMap::new(),
        summary: summary
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
    };
    let snapshots = vec![
        make(&[("B", 200.0), ("A", 100.0), ("C", 100.0)]),
        make(&[("B", 100.0), ("A", 200.0)]),
    ];

    let groups = top_groups(&snapshots, 10);
    let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(groups[0].1, 300.0);
    assert_eq!(groups[1].1, 300.0);
    assert_eq!(groups[2].1, 100.0);

    let top_two = top_groups(&snapshots, 2);
    assert_eq!(top_two.len(), 2);
}

#[tokio::test]
async fn test_journal_append_and_replay() {
    let dir = tempfile::tempdir().unwrap();
    let journal = WaitJournal::new(dir.path(), "sql01");
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let start = Utc::now();

    let first = acc.record(raw(&[("WRITELOG", 100)]), &categories, false, start);
    let second = acc.record(
        raw(&[("WRITELOG", 700)]),
        &categories,
        false,
        start + Duration::seconds(60),
    );
    journal.append(&first).await.unwrap();
    journal.append(&second).await.unwrap();

    let replayed = journal.replay().await;
    assert_eq!(replayed.len(), 2);
    assert_eq!(replayed[0].captured_at, first.captured_at);
    assert!((replayed[1].waits["WRITELOG"].delta_per_minute - 600.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_journal_replay_skips_malformed_and_foreign_lines() {
    let dir = tempfile::tempdir().unwrap();
    let journal = WaitJournal::new(dir.path(), "sql01");
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let snapshot = acc.record(raw(&[("WRITELOG", 100)]), &categories, false, Utc::now());
    journal.append(&snapshot).await.unwrap();

    // corrupt the file with junk and a snapshot that belongs to another key
    let mut foreign = snapshot.clone();
    foreign.server_key = "other".to_string();
    let path = std::fs::read_dir(dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    content.push_str(&serde_json::to_string(&foreign).unwrap());
    content.push('\n');
    std::fs::write(&path, content).unwrap();

    let replayed = journal.replay().await;
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].server_key, "sql01");
}

#[tokio::test]
async fn test_journal_replay_missing_dir_is_empty() {
    let journal = WaitJournal::new(Path::new("/nonexistent/sqlfleet-test"), "sql01");
    assert!(journal.replay().await.is_empty());
}

#[tokio::test]
async fn test_purge_respects_retention() {
    let dir = tempfile::tempdir().unwrap();
    let journal = WaitJournal::new(dir.path(), "sql01");
    let mut acc = WaitAccumulator::new("sql01");
    let categories = CategoryMap::base();
    let snapshot = acc.record(raw(&[("WRITELOG", 100)]), &categories, false, Utc::now());
    journal.append(&snapshot).await.unwrap();

    // fresh file survives an 85-minute retention purge
    assert_eq!(journal::purge_old_files(dir.path(), 85).await, 0);
    // zero retention removes it
    assert_eq!(journal::purge_old_files(dir.path(), 0).await, 1);
    assert!(journal.replay().await.is_empty());
}

#[tokio::test]
async fn test_category_overrides_merge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waitmap.yaml");
    std::fs::write(
        &path,
        "categories:\n  MY_CUSTOM_WAIT: Custom\n  LCK_M_S: Blocking\n",
    )
    .unwrap();

    let table = CategoryMap::load(Some(&path)).await.unwrap();
    assert_eq!(table.resolve("MY_CUSTOM_WAIT"), Some("Custom"));
    assert_eq!(table.resolve("LCK_M_S"), Some("Blocking"));
    // untouched base mappings and exclusions survive the merge
    assert_eq!(table.resolve("WRITELOG"), Some("Log"));
    assert_eq!(table.resolve("LAZYWRITER_SLEEP"), None);
    assert!(table.is_excluded("Idle"));
}
