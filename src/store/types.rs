//! Dedup store types

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Storage failures. A cycle that hits one is aborted; nothing is assumed
/// about the sent state of the address involved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create store directory {path:?}: {source}")]
    CreateDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("stored timestamp {0} is out of range")]
    BadTimestamp(i64),
}

/// Durable admission bookkeeping for one token address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionRecord {
    pub address: String,
    pub first_seen: DateTime<Utc>,
    /// Set once delivery has been confirmed
    pub sent_at: Option<DateTime<Utc>>,
}

impl AdmissionRecord {
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}
