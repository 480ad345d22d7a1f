//! Dedup store durability tests

use chrono::{Duration, Utc};
use pairwatch::store::{DedupStore, SqliteDedupStore};
use tempfile::TempDir;

#[test]
fn test_sent_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("pairwatch.db");
    let seen = Utc::now() - Duration::minutes(3);

    {
        let mut store = SqliteDedupStore::open(&path).unwrap();
        store.record_seen("tokA", seen).unwrap();
        store.mark_sent("tokA", Utc::now()).unwrap();
        store.record_seen("tokB", seen).unwrap();
        store.close().unwrap();
    }

    let store = SqliteDedupStore::open(&path).unwrap();
    assert!(store.has_sent("tokA").unwrap());
    assert!(!store.has_sent("tokB").unwrap());
    assert_eq!(
        store.first_seen("tokB").unwrap().map(|t| t.timestamp_millis()),
        Some(seen.timestamp_millis())
    );
    assert_eq!(store.sent_count().unwrap(), 1);
}

#[test]
fn test_recent_lists_newest_first() {
    let dir = TempDir::new().unwrap();
    let mut store = SqliteDedupStore::open(dir.path().join("store.db")).unwrap();
    let now = Utc::now();

    store.mark_sent("old", now - Duration::minutes(10)).unwrap();
    store.mark_sent("new", now).unwrap();
    store.mark_sent("mid", now - Duration::minutes(5)).unwrap();
    store.record_seen("unsent", now).unwrap();

    let recent: Vec<String> = store
        .recent(2)
        .unwrap()
        .into_iter()
        .map(|r| r.address)
        .collect();
    assert_eq!(recent, vec!["new".to_string(), "mid".to_string()]);
}
