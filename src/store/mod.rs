//! Dedup store module
//!
//! Durable record of which token addresses have already been alerted.

mod sqlite;
mod types;

pub use sqlite::SqliteDedupStore;
pub use types::{AdmissionRecord, StoreError};

use chrono::{DateTime, Utc};

/// Trait for dedup store implementations.
///
/// Single writer: only the scan scheduler holds a store, and it mutates it
/// synchronously within a cycle.
pub trait DedupStore: Send {
    /// Whether an alert for `address` has been confirmed delivered
    fn has_sent(&self, address: &str) -> Result<bool, StoreError>;

    /// Record confirmed delivery. A second call for the same address keeps the
    /// first timestamp.
    fn mark_sent(&mut self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Record the first time `address` was admitted. Later calls are ignored.
    fn record_seen(&mut self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// When `address` was first admitted, if ever
    fn first_seen(&self, address: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
}
