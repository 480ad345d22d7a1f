//! pairwatch: new-pair screener for DexScreener listings
//!
//! This library provides the core components for:
//! - Polling DexScreener for freshly listed pairs
//! - Screening snapshots against chain, venue, valuation, volume and age filters
//! - Durable exactly-once bookkeeping of alerted tokens in SQLite
//! - Rate-limited Telegram alert delivery
//! - A fixed-interval scan loop with backoff and graceful shutdown
//! - Logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod feed;
pub mod notify;
pub mod scheduler;
pub mod screen;
pub mod store;
pub mod telemetry;
