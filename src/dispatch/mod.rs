//! Dispatch module
//!
//! Rate-limited, exactly-once delivery of admitted candidates

mod dispatcher;

pub use dispatcher::{Candidate, DispatchReport, Dispatcher};
