//! Pair snapshots extracted from raw feed records

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A record that could not be turned into a snapshot
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no baseToken.address")]
    MissingAddress,
}

/// Which valuation figure an admission was judged on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMetric {
    MarketCap,
    /// Fully diluted valuation, used when market cap is absent
    Fdv,
}

impl fmt::Display for ValuationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuationMetric::MarketCap => write!(f, "market cap"),
            ValuationMetric::Fdv => write!(f, "fdv"),
        }
    }
}

/// One pair as seen in a single fetch. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSnapshot {
    /// Base token address, the dedup key
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub chain_id: String,
    pub dex_id: String,
    pub pair_address: Option<String>,
    pub url: Option<String>,
    pub market_cap: Option<f64>,
    pub fdv: Option<f64>,
    pub volume_h24: Option<f64>,
    pub liquidity_usd: Option<f64>,
    /// Milliseconds since epoch
    pub pair_created_at_ms: Option<i64>,
}

impl PairSnapshot {
    /// Extract a snapshot from a DexScreener pair object.
    ///
    /// Only the base token address is required. Numeric fields that are
    /// missing or fail to coerce are left as `None` and judged by the
    /// evaluator.
    pub fn from_value(raw: &Value) -> Result<Self, MalformedRecord> {
        if !raw.is_object() {
            return Err(MalformedRecord::NotAnObject);
        }

        let base = &raw["baseToken"];
        let address = base["address"]
            .as_str()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(MalformedRecord::MissingAddress)?
            .to_string();

        Ok(Self {
            address,
            name: text_or(&base["name"], "Unknown"),
            symbol: text_or(&base["symbol"], "Unknown"),
            chain_id: text_or(&raw["chainId"], ""),
            dex_id: text_or(&raw["dexId"], ""),
            pair_address: raw["pairAddress"].as_str().map(str::to_string),
            url: raw["url"].as_str().map(str::to_string),
            market_cap: coerce_f64(&raw["marketCap"]),
            fdv: coerce_f64(&raw["fdv"]),
            volume_h24: coerce_f64(&raw["volume"]["h24"]),
            liquidity_usd: coerce_f64(&raw["liquidity"]["usd"]),
            pair_created_at_ms: coerce_millis(&raw["pairCreatedAt"]),
        })
    }

    /// Market cap if present, otherwise fully diluted valuation
    pub fn valuation(&self) -> Option<(ValuationMetric, f64)> {
        self.market_cap
            .map(|v| (ValuationMetric::MarketCap, v))
            .or_else(|| self.fdv.map(|v| (ValuationMetric::Fdv, v)))
    }

    /// Liquidity in USD, 0 when absent
    pub fn liquidity(&self) -> f64 {
        self.liquidity_usd.unwrap_or(0.0)
    }

    /// Pair age in whole minutes, floored. `None` when the creation time is
    /// absent or too far from `now` to subtract.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let created = self.pair_created_at_ms?;
        now.timestamp_millis()
            .checked_sub(created)
            .map(|elapsed| elapsed.div_euclid(60_000))
    }
}

/// Coerce a JSON number or numeric string into a finite float
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerce an epoch-milliseconds field, rejecting values outside the
/// representable date range
fn coerce_millis(value: &Value) -> Option<i64> {
    let ms = coerce_f64(value)?;
    if ms < i64::MIN as f64 || ms >= i64::MAX as f64 {
        return None;
    }
    let ms = ms as i64;
    DateTime::from_timestamp_millis(ms).map(|_| ms)
}

fn text_or(value: &Value, fallback: &str) -> String {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
