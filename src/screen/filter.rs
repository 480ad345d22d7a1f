//! Admission filter chain

use crate::config::FilterConfig;
use crate::feed::{PairSnapshot, ValuationMetric};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Result of screening one snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenResult {
    /// Snapshot passed every rule
    Admit(Admission),
    /// Snapshot failed the first rule named by the reason
    Reject(RejectReason),
}

impl ScreenResult {
    pub fn is_admit(&self) -> bool {
        matches!(self, ScreenResult::Admit(_))
    }
}

/// Figures an admission was decided on, kept for alert formatting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Admission {
    pub metric: ValuationMetric,
    pub valuation: f64,
    pub volume_h24: f64,
    pub liquidity: f64,
    pub age_minutes: i64,
}

/// Reason for rejecting a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    /// Pair is listed on another chain
    WrongChain(String),
    /// Venue is not on the allow-list
    DisallowedVenue(String),
    /// Neither market cap nor fdv present
    NoCap,
    /// Valuation outside [min_cap, max_cap]
    CapOutOfRange { metric: ValuationMetric, value: f64 },
    /// 24h volume missing
    NoVolume,
    /// 24h volume below the floor
    VolumeTooLow(f64),
    /// Liquidity below the floor
    LiquidityTooLow(f64),
    /// Pair creation timestamp missing
    NoCreationTime,
    /// Pair older than the age bound, in minutes
    TooOld(i64),
}

impl RejectReason {
    /// Short name of the failed rule
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::WrongChain(_) => "wrong chain",
            RejectReason::DisallowedVenue(_) => "disallowed venue",
            RejectReason::NoCap => "no cap",
            RejectReason::CapOutOfRange { .. } => "cap out of range",
            RejectReason::NoVolume => "no volume",
            RejectReason::VolumeTooLow(_) => "volume too low",
            RejectReason::LiquidityTooLow(_) => "liquidity too low",
            RejectReason::NoCreationTime => "no creation time",
            RejectReason::TooOld(_) => "too old",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label();
        match self {
            RejectReason::WrongChain(chain) => write!(f, "{label} ({chain:?})"),
            RejectReason::DisallowedVenue(venue) => write!(f, "{label} ({venue:?})"),
            RejectReason::CapOutOfRange { metric, value } => {
                write!(f, "{label} ({metric} {value:.0})")
            }
            RejectReason::VolumeTooLow(v) | RejectReason::LiquidityTooLow(v) => {
                write!(f, "{label} ({v:.0})")
            }
            RejectReason::TooOld(minutes) => write!(f, "{label} ({minutes} min)"),
            RejectReason::NoCap | RejectReason::NoVolume | RejectReason::NoCreationTime => {
                write!(f, "{label}")
            }
        }
    }
}

/// Screen one snapshot. Rules run in order and stop at the first failure.
pub fn evaluate(snapshot: &PairSnapshot, config: &FilterConfig, now: DateTime<Utc>) -> ScreenResult {
    use RejectReason::*;

    if snapshot.chain_id != config.target_chain {
        return ScreenResult::Reject(WrongChain(snapshot.chain_id.clone()));
    }

    if !config.allows_venue(&snapshot.dex_id) {
        return ScreenResult::Reject(DisallowedVenue(snapshot.dex_id.clone()));
    }

    let Some((metric, valuation)) = snapshot.valuation() else {
        return ScreenResult::Reject(NoCap);
    };
    if valuation < config.min_cap || valuation > config.max_cap {
        return ScreenResult::Reject(CapOutOfRange {
            metric,
            value: valuation,
        });
    }

    let Some(volume_h24) = snapshot.volume_h24 else {
        return ScreenResult::Reject(NoVolume);
    };
    if volume_h24 < config.min_volume {
        return ScreenResult::Reject(VolumeTooLow(volume_h24));
    }

    let liquidity = snapshot.liquidity();
    if liquidity < config.min_liquidity {
        return ScreenResult::Reject(LiquidityTooLow(liquidity));
    }

    let Some(age_minutes) = snapshot.age_minutes(now) else {
        return ScreenResult::Reject(NoCreationTime);
    };
    if age_minutes > config.max_age_minutes {
        return ScreenResult::Reject(TooOld(age_minutes));
    }

    ScreenResult::Admit(Admission {
        metric,
        valuation,
        volume_h24,
        liquidity,
        age_minutes,
    })
}

/// Filter bound to one threshold configuration
pub struct PairFilter {
    config: FilterConfig,
}

impl PairFilter {
    /// Create a new pair filter with given configuration
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Apply all rules to a snapshot
    pub fn apply(&self, snapshot: &PairSnapshot, now: DateTime<Utc>) -> ScreenResult {
        evaluate(snapshot, &self.config, now)
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}
