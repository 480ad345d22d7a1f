//! Screening module
//!
//! Pure admission rules applied to each pair snapshot

mod filter;

pub use filter::{evaluate, Admission, PairFilter, RejectReason, ScreenResult};
