//! DexScreener API client for candidate discovery
//!
//! Two discovery modes are supported:
//! - `search`: one `/latest/dex/search` query returning full pair records
//! - `seeded`: token addresses from `/token-profiles/latest/v1` and
//!   `/token-boosts/latest/v1`, then pair detail from `/tokens/v1/{chain}/...`
//!   in batches of at most 30 addresses

use super::{FeedError, PairSource};
use crate::config::{FeedConfig, FeedMode};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Endpoints that list recently promoted tokens
const SEED_PATHS: [&str; 2] = ["/token-profiles/latest/v1", "/token-boosts/latest/v1"];

/// Maximum addresses accepted by the `/tokens/v1` endpoint per request
pub const DETAIL_BATCH_SIZE: usize = 30;

/// Client for the DexScreener public API
pub struct DexScreenerClient {
    config: FeedConfig,
    chain: String,
    client: Client,
}

impl DexScreenerClient {
    /// Create a client for pairs on `chain`
    pub fn new(config: FeedConfig, chain: impl Into<String>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            chain: chain.into(),
            client,
        })
    }

    /// Fetch pairs matching the configured search query
    pub async fn search_pairs(&self) -> Result<Vec<Value>, FeedError> {
        let url = format!("{}/latest/dex/search", self.config.base_url);

        tracing::debug!(url = %url, query = %self.config.search_query, "Searching DexScreener pairs");

        let response = self
            .client
            .get(&url)
            .query(&[("q", self.config.search_query.as_str())])
            .send()
            .await?;
        let body = read_json(&url, response).await?;

        pairs_from_search(&url, body)
    }

    /// Fetch pairs for tokens seeded from the profile and boost listings
    pub async fn seeded_pairs(&self) -> Result<Vec<Value>, FeedError> {
        let seeds = self.fetch_seeds().await?;
        if seeds.is_empty() {
            tracing::debug!(chain = %self.chain, "No seed tokens on target chain");
            return Ok(vec![]);
        }

        let batches: Vec<&[String]> = seeds.chunks(DETAIL_BATCH_SIZE).collect();
        let total = batches.len();
        let mut results = Vec::with_capacity(total);

        for (i, batch) in batches.into_iter().enumerate() {
            let result = self.fetch_token_pairs(batch).await;
            if let Err(e) = &result {
                tracing::warn!(batch = i + 1, total, error = %e, "Pair detail batch failed");
            }
            results.push(result);
        }

        merge_detail_batches(results)
    }

    /// Collect unique token addresses on the target chain from the seed endpoints
    async fn fetch_seeds(&self) -> Result<Vec<String>, FeedError> {
        let mut results = Vec::with_capacity(SEED_PATHS.len());

        for path in SEED_PATHS {
            let url = format!("{}{}", self.config.base_url, path);
            let result = match self.client.get(&url).send().await {
                Ok(response) => read_json(&url, response).await,
                Err(e) => Err(e.into()),
            };
            match &result {
                Ok(_) => tracing::debug!(url = %url, "Fetched seed list"),
                Err(e) => tracing::warn!(url = %url, error = %e, "Seed endpoint failed"),
            }
            results.push(result);
        }

        merge_seed_lists(results, &self.chain)
    }

    /// Fetch every pair for up to [`DETAIL_BATCH_SIZE`] token addresses
    async fn fetch_token_pairs(&self, addresses: &[String]) -> Result<Vec<Value>, FeedError> {
        let url = format!(
            "{}/tokens/v1/{}/{}",
            self.config.base_url,
            self.chain,
            addresses.join(",")
        );

        let response = self.client.get(&url).send().await?;
        match read_json(&url, response).await? {
            Value::Array(pairs) => Ok(pairs),
            other => Err(FeedError::Decode {
                url,
                reason: format!("expected an array, got {}", json_kind(&other)),
            }),
        }
    }
}

#[async_trait]
impl PairSource for DexScreenerClient {
    async fn fetch_pairs(&self) -> Result<Vec<Value>, FeedError> {
        match self.config.mode {
            FeedMode::Search => self.search_pairs().await,
            FeedMode::Seeded => self.seeded_pairs().await,
        }
    }
}

async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, FeedError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            url: url.to_string(),
            status,
        });
    }
    Ok(response.json::<Value>().await?)
}

/// Pull the `pairs` array out of a search response. A missing or null
/// `pairs` key means no results.
fn pairs_from_search(url: &str, body: Value) -> Result<Vec<Value>, FeedError> {
    let mut map = match body {
        Value::Object(map) => map,
        other => {
            return Err(FeedError::Decode {
                url: url.to_string(),
                reason: format!("expected an object, got {}", json_kind(&other)),
            })
        }
    };

    match map.remove("pairs") {
        Some(Value::Array(pairs)) => Ok(pairs),
        None | Some(Value::Null) => Ok(vec![]),
        Some(other) => Err(FeedError::Decode {
            url: url.to_string(),
            reason: format!("`pairs` is {}", json_kind(&other)),
        }),
    }
}

/// Concatenate detail batches. Fails only when every batch failed.
fn merge_detail_batches(
    results: Vec<Result<Vec<Value>, FeedError>>,
) -> Result<Vec<Value>, FeedError> {
    let mut pairs = Vec::new();
    let mut last_err = None;
    let mut any_ok = false;

    for result in results {
        match result {
            Ok(mut batch) => {
                any_ok = true;
                pairs.append(&mut batch);
            }
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) if !any_ok => Err(e),
        _ => Ok(pairs),
    }
}

/// Unique addresses on `chain` across the seed listings, in listing order.
/// Fails only when every listing failed.
fn merge_seed_lists(
    results: Vec<Result<Value, FeedError>>,
    chain: &str,
) -> Result<Vec<String>, FeedError> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    let mut last_err = None;
    let mut any_ok = false;

    for result in results {
        match result {
            Ok(body) => {
                any_ok = true;
                seed_addresses(&body, chain, &mut seen, &mut seeds);
            }
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) if !any_ok => Err(e),
        _ => Ok(seeds),
    }
}

/// Append addresses on `chain` from a profile/boost listing, skipping repeats
fn seed_addresses(body: &Value, chain: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    let Some(items) = body.as_array() else {
        return;
    };

    for item in items {
        if item["chainId"].as_str() != Some(chain) {
            continue;
        }
        if let Some(address) = item["tokenAddress"].as_str().filter(|a| !a.is_empty()) {
            if seen.insert(address.to_string()) {
                out.push(address.to_string());
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
