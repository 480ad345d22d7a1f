//! Market-data feed module
//!
//! Polls DexScreener for candidate pairs and extracts snapshots from the raw
//! pair records.

mod dexscreener;
mod snapshot;

pub use dexscreener::{DexScreenerClient, DETAIL_BATCH_SIZE};
pub use snapshot::{coerce_f64, MalformedRecord, PairSnapshot, ValuationMetric};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Transient failure fetching candidates. The cycle ends early and is retried
/// at the normal interval.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Source of raw pair records for one scan cycle
#[async_trait]
pub trait PairSource: Send + Sync {
    /// Fetch the current candidate pairs. Records are returned unparsed so a
    /// single malformed record never fails the whole fetch.
    async fn fetch_pairs(&self) -> Result<Vec<Value>, FeedError>;
}
