//! Scan scheduler module
//!
//! Ties fetch, evaluation and dispatch into one cycle and runs cycles on a
//! fixed interval with backoff and cooperative shutdown.

mod scanner;
mod state;

pub use scanner::Scheduler;
pub use state::{CycleError, ScanCycleResult, ScanState};
