//! Scan scheduler states and cycle results

use crate::dispatch::DispatchReport;
use crate::feed::FeedError;
use crate::store::StoreError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Scheduler state. Cycles go Idle → Fetching → Evaluating → Dispatching →
/// Sleeping → Idle until a shutdown moves the scheduler to Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Fetching,
    Evaluating,
    Dispatching,
    Sleeping(Duration),
    Stopped,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Fetching => write!(f, "fetching"),
            ScanState::Evaluating => write!(f, "evaluating"),
            ScanState::Dispatching => write!(f, "dispatching"),
            ScanState::Sleeping(d) => write!(f, "sleeping({}s)", d.as_secs()),
            ScanState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why a cycle ended early
#[derive(Debug, Error)]
pub enum CycleError {
    /// Transient: retried after the normal interval
    #[error("fetch failed: {0}")]
    Fetch(#[from] FeedError),
    /// Cycle aborted; retried after the normal interval until failures repeat
    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),
    /// Unexpected failure; retried after the backoff interval
    #[error("cycle panicked: {0}")]
    Panicked(String),
}

/// Per-cycle counts for operator reporting. Never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanCycleResult {
    pub fetched: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub admitted: usize,
    pub already_sent: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub deferred: usize,
}

impl ScanCycleResult {
    pub(crate) fn apply(&mut self, report: &DispatchReport) {
        self.already_sent = report.already_sent;
        self.dispatched = report.delivered;
        self.failed = report.failed;
        self.deferred = report.deferred;
    }
}

impl fmt::Display for ScanCycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} admitted={} dispatched={} deferred={} failed={} already_sent={} malformed={}",
            self.fetched,
            self.admitted,
            self.dispatched,
            self.deferred,
            self.failed,
            self.already_sent,
            self.malformed
        )
    }
}
