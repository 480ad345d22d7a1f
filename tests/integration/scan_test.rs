//! End-to-end scan cycle tests against fake feed and notifier

use async_trait::async_trait;
use chrono::Utc;
use pairwatch::config::Config;
use pairwatch::feed::{FeedError, PairSource};
use pairwatch::notify::{Notifier, NotifyError};
use pairwatch::scheduler::Scheduler;
use pairwatch::store::{DedupStore, SqliteDedupStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct SharedSource {
    pairs: Arc<Mutex<Vec<Value>>>,
}

impl SharedSource {
    fn set(&self, pairs: Vec<Value>) {
        *self.pairs.lock().unwrap() = pairs;
    }
}

#[async_trait]
impl PairSource for SharedSource {
    async fn fetch_pairs(&self) -> Result<Vec<Value>, FeedError> {
        Ok(self.pairs.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    down: Arc<AtomicBool>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(NotifyError::NotAcknowledged("Bad Gateway".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn config(max_posts: usize) -> Config {
    let mut config = Config::default();
    config.dispatch.max_posts_per_scan = max_posts;
    config.dispatch.send_spacing_ms = 0;
    config.scheduler.announce_startup = false;
    config
}

fn pair(address: &str, liquidity: f64) -> Value {
    json!({
        "chainId": "solana",
        "dexId": "pumpswap",
        "url": format!("https://dexscreener.com/solana/{address}"),
        "baseToken": { "address": address, "name": format!("Token {address}"), "symbol": "TKN" },
        "marketCap": "31000.5",
        "volume": { "h24": 45000 },
        "liquidity": { "usd": liquidity },
        "pairCreatedAt": Utc::now().timestamp_millis() - 3 * 60_000
    })
}

fn mentions(text: &str, address: &str) -> bool {
    text.contains(&format!("<code>{address}</code>"))
}

#[tokio::test]
async fn test_already_sent_address_is_not_resent() {
    let mut store = SqliteDedupStore::open_in_memory().unwrap();
    store.mark_sent("known", Utc::now()).unwrap();

    let source = SharedSource::default();
    source.set(vec![pair("known", 9_000.0)]);
    let notifier = RecordingNotifier::default();
    let mut scheduler = Scheduler::new(&config(3), source, store, notifier.clone());

    let result = scheduler.run_once().await.unwrap();
    assert_eq!(result.admitted, 1);
    assert_eq!(result.already_sent, 1);
    assert_eq!(result.dispatched, 0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_failed_send_is_retried_next_cycle() {
    let source = SharedSource::default();
    source.set(vec![pair("flaky", 9_000.0)]);
    let notifier = RecordingNotifier::default();
    notifier.down.store(true, Ordering::SeqCst);

    let mut scheduler = Scheduler::new(
        &config(3),
        source,
        SqliteDedupStore::open_in_memory().unwrap(),
        notifier.clone(),
    );

    let result = scheduler.run_once().await.unwrap();
    assert_eq!(result.failed, 1);
    assert!(!scheduler.store().has_sent("flaky").unwrap());

    notifier.down.store(false, Ordering::SeqCst);
    let result = scheduler.run_once().await.unwrap();
    assert_eq!(result.dispatched, 1);
    assert!(scheduler.store().has_sent("flaky").unwrap());
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_per_cycle_cap_holds_across_cycles() {
    let source = SharedSource::default();
    source.set((0..7).map(|i| pair(&format!("tok{i}"), 1_000.0 * f64::from(i + 1))).collect());
    let notifier = RecordingNotifier::default();
    let mut scheduler = Scheduler::new(
        &config(3),
        source,
        SqliteDedupStore::open_in_memory().unwrap(),
        notifier.clone(),
    );

    let mut per_cycle = Vec::new();
    for _ in 0..4 {
        let before = notifier.sent().len();
        let result = scheduler.run_once().await.unwrap();
        assert!(result.dispatched <= 3);
        per_cycle.push(notifier.sent().len() - before);
    }

    assert_eq!(per_cycle, vec![3, 3, 1, 0]);
    let sent = notifier.sent();
    assert!(mentions(&sent[0], "tok6"));
    assert!(mentions(&sent[6], "tok0"));
}

#[tokio::test]
async fn test_restart_does_not_resend() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pairwatch.db");
    let source = SharedSource::default();
    source.set(vec![pair("tokA", 5_000.0), pair("tokB", 4_000.0)]);
    let notifier = RecordingNotifier::default();

    {
        let store = SqliteDedupStore::open(&path).unwrap();
        let mut scheduler = Scheduler::new(&config(1), source.clone(), store, notifier.clone());
        let result = scheduler.run_once().await.unwrap();
        assert_eq!(result.dispatched, 1);
        assert_eq!(result.deferred, 1);
        scheduler.into_store().close().unwrap();
    }

    let store = SqliteDedupStore::open(&path).unwrap();
    let mut scheduler = Scheduler::new(&config(1), source, store, notifier.clone());
    let result = scheduler.run_once().await.unwrap();
    assert_eq!(result.already_sent, 1);
    assert_eq!(result.dispatched, 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(mentions(&sent[0], "tokA"));
    assert!(mentions(&sent[1], "tokB"));
}

#[tokio::test]
async fn test_alert_content() {
    let source = SharedSource::default();
    source.set(vec![pair("tokA", 12_500.0)]);
    let notifier = RecordingNotifier::default();
    let mut scheduler = Scheduler::new(
        &config(3),
        source,
        SqliteDedupStore::open_in_memory().unwrap(),
        notifier.clone(),
    );

    scheduler.run_once().await.unwrap();
    let text = &notifier.sent()[0];
    assert!(text.contains("Token tokA"));
    assert!(text.contains("Market Cap: $31.00K"));
    assert!(text.contains("Volume (24h): $45.00K"));
    assert!(text.contains("Liquidity: $12.50K"));
    assert!(text.contains("https://dexscreener.com/solana/tokA"));
}
