//! Fixed-interval scan loop

use super::{CycleError, ScanCycleResult, ScanState};
use crate::config::{Config, SchedulerConfig};
use crate::dispatch::{Candidate, Dispatcher};
use crate::feed::{PairSnapshot, PairSource};
use crate::notify::{startup_message, Notifier};
use crate::screen::{PairFilter, ScreenResult};
use crate::store::DedupStore;
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Runs scan cycles one at a time and owns the dedup store for its lifetime
pub struct Scheduler<F, S, N> {
    source: F,
    store: S,
    notifier: N,
    filter: PairFilter,
    dispatcher: Dispatcher,
    config: SchedulerConfig,
    state: ScanState,
    cycles: u64,
    storage_failure_streak: u32,
}

impl<F, S, N> Scheduler<F, S, N>
where
    F: PairSource,
    S: DedupStore,
    N: Notifier,
{
    /// Create a scheduler. The store should already be open.
    pub fn new(config: &Config, source: F, store: S, notifier: N) -> Self {
        Self {
            source,
            store,
            notifier,
            filter: PairFilter::new(config.filter.clone()),
            dispatcher: Dispatcher::new(&config.dispatch),
            config: config.scheduler.clone(),
            state: ScanState::Idle,
            cycles: 0,
            storage_failure_streak: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back for an orderly close
    pub fn into_store(self) -> S {
        self.store
    }

    /// Loop until `shutdown` turns true (or its sender is dropped).
    ///
    /// Shutdown is only observed between cycles, so a dispatch in progress
    /// always completes; a signal during the sleep wakes the loop early.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if self.config.announce_startup && !*shutdown.borrow() {
            self.announce().await;
        }

        loop {
            self.transition(ScanState::Idle);
            if *shutdown.borrow() {
                break;
            }

            let pause = self.step().await;

            self.transition(ScanState::Sleeping(pause));
            if *shutdown.borrow() {
                break;
            }

            if sleep_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }

        self.transition(ScanState::Stopped);
        tracing::info!(cycles = self.cycles, "Scan loop stopped");
    }

    /// Run one cycle and decide how long to sleep afterwards
    async fn step(&mut self) -> Duration {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.run_once()).catch_unwind().await;
        let outcome = outcome.unwrap_or_else(|panic| Err(CycleError::Panicked(panic_message(panic))));

        telemetry::increment(CounterMetric::Cycles, 1);
        telemetry::record_latency(LatencyMetric::Cycle, started.elapsed());

        let pause = match outcome {
            Ok(result) => {
                self.storage_failure_streak = 0;
                tracing::info!(
                    cycle = self.cycles,
                    fetched = result.fetched,
                    admitted = result.admitted,
                    dispatched = result.dispatched,
                    deferred = result.deferred,
                    failed = result.failed,
                    already_sent = result.already_sent,
                    malformed = result.malformed,
                    "Scan cycle complete"
                );
                self.config.scan_interval()
            }
            Err(CycleError::Fetch(e)) => {
                telemetry::increment(CounterMetric::FetchFailures, 1);
                tracing::warn!(cycle = self.cycles, error = %e, "Fetch failed, retrying next interval");
                self.config.scan_interval()
            }
            Err(CycleError::Storage(e)) => {
                self.storage_failure_streak += 1;
                telemetry::increment(CounterMetric::StorageFailures, 1);
                tracing::error!(
                    cycle = self.cycles,
                    streak = self.storage_failure_streak,
                    error = %e,
                    "Dedup store failed, cycle aborted"
                );
                if self.storage_failure_streak >= self.config.storage_failure_threshold {
                    self.config.backoff()
                } else {
                    self.config.scan_interval()
                }
            }
            Err(e @ CycleError::Panicked(_)) => {
                tracing::error!(cycle = self.cycles, error = %e, "Scan cycle failed unexpectedly");
                self.config.backoff()
            }
        };

        telemetry::set_gauge(
            GaugeMetric::ConsecutiveFailures,
            f64::from(self.storage_failure_streak),
        );
        telemetry::set_gauge(GaugeMetric::PendingMarks, self.dispatcher.pending_marks() as f64);

        pause
    }

    /// Fetch, evaluate and dispatch once
    pub async fn run_once(&mut self) -> Result<ScanCycleResult, CycleError> {
        self.cycles += 1;
        let now = Utc::now();

        self.transition(ScanState::Fetching);
        let fetch_started = Instant::now();
        let raw = self.source.fetch_pairs().await?;
        telemetry::record_latency(LatencyMetric::Fetch, fetch_started.elapsed());

        self.transition(ScanState::Evaluating);
        let (admitted, mut result) = self.evaluate(&raw, now);

        self.transition(ScanState::Dispatching);
        let report = self
            .dispatcher
            .dispatch(admitted, &mut self.store, &self.notifier, now)
            .await?;
        result.apply(&report);

        telemetry::increment(CounterMetric::Dispatched, report.delivered as u64);
        telemetry::increment(CounterMetric::DeliveryFailures, report.failed as u64);
        telemetry::increment(CounterMetric::Deferred, report.deferred as u64);

        Ok(result)
    }

    /// Fetch and evaluate without sending or touching the store
    pub async fn preview(&mut self) -> Result<(Vec<Candidate>, ScanCycleResult), CycleError> {
        self.transition(ScanState::Fetching);
        let raw = self.source.fetch_pairs().await?;

        self.transition(ScanState::Evaluating);
        let outcome = self.evaluate(&raw, Utc::now());

        self.transition(ScanState::Idle);
        Ok(outcome)
    }

    fn evaluate(&self, raw: &[Value], now: DateTime<Utc>) -> (Vec<Candidate>, ScanCycleResult) {
        let mut result = ScanCycleResult {
            fetched: raw.len(),
            ..Default::default()
        };
        let mut admitted = Vec::new();

        for (index, record) in raw.iter().enumerate() {
            let snapshot = match PairSnapshot::from_value(record) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    result.malformed += 1;
                    tracing::warn!(index, error = %e, "Skipping malformed pair record");
                    continue;
                }
            };

            match self.filter.apply(&snapshot, now) {
                ScreenResult::Admit(admission) => {
                    tracing::debug!(address = %snapshot.address, symbol = %snapshot.symbol, "Admitted");
                    admitted.push(Candidate {
                        snapshot,
                        admission,
                    });
                }
                ScreenResult::Reject(reason) => {
                    result.rejected += 1;
                    tracing::trace!(address = %snapshot.address, reason = %reason, "Rejected");
                }
            }
        }

        result.admitted = admitted.len();
        telemetry::increment(CounterMetric::CandidatesFetched, result.fetched as u64);
        telemetry::increment(CounterMetric::MalformedRecords, result.malformed as u64);
        telemetry::increment(CounterMetric::Admitted, result.admitted as u64);

        (admitted, result)
    }

    /// Best-effort startup message listing the active filters
    async fn announce(&self) {
        let text = startup_message(self.filter.config(), self.config.scan_interval_secs);
        match self.notifier.send(&text).await {
            Ok(()) => tracing::info!("Startup announcement sent"),
            Err(e) => tracing::warn!(error = %e, "Startup announcement failed"),
        }
    }

    fn transition(&mut self, next: ScanState) {
        if self.state != next {
            tracing::trace!(from = %self.state, to = %next, "Scheduler state");
            self.state = next;
        }
    }
}

/// Sleep for `pause`. Returns true as soon as shutdown is requested or the
/// sender is gone; updates that leave the flag false keep sleeping.
async fn sleep_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let wake = tokio::time::Instant::now() + pause;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(wake) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    tracing::warn!("Shutdown channel closed, stopping scan loop");
                    return true;
                }
                if *shutdown.borrow_and_update() {
                    return true;
                }
            }
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;
    use crate::notify::NotifyError;
    use crate::store::{SqliteDedupStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        pairs: Mutex<Vec<Value>>,
        fail: AtomicBool,
        panic: AtomicBool,
    }

    #[async_trait]
    impl PairSource for FakeSource {
        async fn fetch_pairs(&self) -> Result<Vec<Value>, FeedError> {
            if self.panic.load(Ordering::SeqCst) {
                panic!("feed exploded");
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Status {
                    url: "https://feed.test/search".to_string(),
                    status: reqwest::StatusCode::BAD_GATEWAY,
                });
            }
            Ok(self.pairs.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenStore;

    impl DedupStore for BrokenStore {
        fn has_sent(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::BadTimestamp(-1))
        }
        fn mark_sent(&mut self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::BadTimestamp(-1))
        }
        fn record_seen(&mut self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::BadTimestamp(-1))
        }
        fn first_seen(&self, _: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
            Err(StoreError::BadTimestamp(-1))
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.dispatch.send_spacing_ms = 0;
        config.scheduler.announce_startup = false;
        config.scheduler.storage_failure_threshold = 2;
        config
    }

    fn pair(address: &str, liquidity: f64) -> Value {
        json!({
            "chainId": "solana",
            "dexId": "raydium",
            "baseToken": { "address": address, "name": address, "symbol": address },
            "marketCap": 25000,
            "volume": { "h24": 30000 },
            "liquidity": { "usd": liquidity },
            "pairCreatedAt": Utc::now().timestamp_millis() - 5 * 60_000
        })
    }

    fn scheduler_with(
        pairs: Vec<Value>,
    ) -> Scheduler<FakeSource, SqliteDedupStore, FakeNotifier> {
        let source = FakeSource {
            pairs: Mutex::new(pairs),
            ..Default::default()
        };
        Scheduler::new(
            &config(),
            source,
            SqliteDedupStore::open_in_memory().unwrap(),
            FakeNotifier::default(),
        )
    }

    #[tokio::test]
    async fn test_cycle_counts() {
        let mut stale = pair("old", 5_000.0);
        stale["pairCreatedAt"] = json!(0);
        let mut scheduler = scheduler_with(vec![
            pair("a", 5_000.0),
            stale,
            json!({ "chainId": "solana" }),
            json!(42),
        ]);

        let result = scheduler.run_once().await.unwrap();
        assert_eq!(result.fetched, 4);
        assert_eq!(result.malformed, 2);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.admitted, 1);
        assert_eq!(result.dispatched, 1);
        assert_eq!(scheduler.state(), ScanState::Dispatching);
        assert!(scheduler.store().has_sent("a").unwrap());
    }

    #[tokio::test]
    async fn test_second_cycle_does_not_resend() {
        let mut scheduler = scheduler_with(vec![pair("a", 5_000.0)]);
        scheduler.run_once().await.unwrap();
        let result = scheduler.run_once().await.unwrap();

        assert_eq!(result.admitted, 1);
        assert_eq!(result.already_sent, 1);
        assert_eq!(result.dispatched, 0);
        assert_eq!(scheduler.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_creation_time_does_not_spoil_cycle() {
        let mut bad = pair("bad", 9_000.0);
        bad["pairCreatedAt"] = json!(-1e300);
        let mut scheduler = scheduler_with(vec![pair("good", 5_000.0), bad]);

        assert_eq!(scheduler.step().await, Duration::from_secs(10));
        assert!(scheduler.store().has_sent("good").unwrap());
        assert!(!scheduler.store().has_sent("bad").unwrap());
        assert_eq!(scheduler.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_preview_sends_nothing() {
        let mut scheduler = scheduler_with(vec![pair("a", 5_000.0)]);
        let (admitted, result) = scheduler.preview().await.unwrap();

        assert_eq!(admitted.len(), 1);
        assert_eq!(result.admitted, 1);
        assert!(scheduler.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(scheduler.store().first_seen("a").unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_normal_interval() {
        let mut scheduler = scheduler_with(vec![]);
        scheduler.source.fail.store(true, Ordering::SeqCst);

        assert!(matches!(scheduler.run_once().await, Err(CycleError::Fetch(_))));
        assert_eq!(scheduler.step().await, Duration::from_secs(10));
        assert_eq!(scheduler.step().await, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_panic_triggers_backoff() {
        let mut scheduler = scheduler_with(vec![]);
        scheduler.source.panic.store(true, Ordering::SeqCst);
        assert_eq!(scheduler.step().await, Duration::from_secs(30));

        scheduler.source.panic.store(false, Ordering::SeqCst);
        assert_eq!(scheduler.step().await, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_repeated_storage_failures_back_off() {
        let source = FakeSource {
            pairs: Mutex::new(vec![pair("a", 5_000.0)]),
            ..Default::default()
        };
        let mut scheduler = Scheduler::new(&config(), source, BrokenStore, FakeNotifier::default());

        assert!(matches!(scheduler.run_once().await, Err(CycleError::Storage(_))));
        assert!(scheduler.notifier.sent.lock().unwrap().is_empty());

        // threshold is 2
        assert_eq!(scheduler.step().await, Duration::from_secs(10));
        assert_eq!(scheduler.step().await, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start() {
        let mut scheduler = scheduler_with(vec![pair("a", 5_000.0)]);
        let (tx, rx) = watch::channel(true);

        scheduler.run(rx).await;
        drop(tx);

        assert_eq!(scheduler.cycles(), 0);
        assert_eq!(scheduler.state(), ScanState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_sleep() {
        let mut scheduler = scheduler_with(vec![pair("a", 5_000.0)]);
        let (tx, rx) = watch::channel(false);

        let stop = async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            tx.send(true).unwrap();
            tx
        };
        let (_, _tx) = tokio::join!(scheduler.run(rx), stop);

        // cycles at t=0s and t=10s, stop at t=15s while sleeping
        assert_eq!(scheduler.cycles(), 2);
        assert_eq!(scheduler.state(), ScanState::Stopped);
        assert_eq!(scheduler.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_update_keeps_sleeping() {
        let mut scheduler = scheduler_with(vec![]);
        let (tx, rx) = watch::channel(false);

        let signals = async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            tx.send(false).unwrap();
            tokio::time::sleep(Duration::from_secs(12)).await;
            tx.send(true).unwrap();
            tx
        };
        let _ = tokio::join!(scheduler.run(rx), signals);

        // cycles at t=0s and t=10s only; the t=3s update must not start one
        assert_eq!(scheduler.cycles(), 2);
        assert_eq!(scheduler.state(), ScanState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_announcement() {
        let mut config = config();
        config.scheduler.announce_startup = true;
        let mut scheduler = Scheduler::new(
            &config,
            FakeSource::default(),
            SqliteDedupStore::open_in_memory().unwrap(),
            FakeNotifier::default(),
        );
        let (tx, rx) = watch::channel(false);

        let stop = async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
            tx
        };
        let _ = tokio::join!(scheduler.run(rx), stop);

        let sent = scheduler.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Pair screener online"));
    }
}
