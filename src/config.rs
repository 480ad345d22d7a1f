//! Configuration types for pairwatch

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `telegram.bot_token`
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable overriding `telegram.chat_id`
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Configuration errors. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// How candidate pairs are discovered
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Single search query returning full pair records
    #[default]
    Search,
    /// Seed token addresses from the latest profiles/boosts, then fetch pair detail
    Seeded,
}

/// Market-data feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    #[serde(default)]
    pub mode: FeedMode,
    /// Search term used in `search` mode
    #[serde(default = "default_search_query")]
    pub search_query: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_feed_url() -> String {
    "https://api.dexscreener.com".to_string()
}
fn default_search_query() -> String {
    "solana".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
            mode: FeedMode::Search,
            search_query: default_search_query(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Admission thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Chain every admitted pair must be listed on
    #[serde(default = "default_chain")]
    pub target_chain: String,
    /// Venues (dex ids) a pair may trade on
    #[serde(default = "default_venues")]
    pub allowed_venues: Vec<String>,
    /// Minimum valuation in USD (inclusive)
    #[serde(default = "default_min_cap")]
    pub min_cap: f64,
    /// Maximum valuation in USD (inclusive)
    #[serde(default = "default_max_cap")]
    pub max_cap: f64,
    /// Minimum 24h volume in USD
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,
    /// Minimum pool liquidity in USD
    #[serde(default)]
    pub min_liquidity: f64,
    /// Oldest pair age still admitted, in whole minutes
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: i64,
}

fn default_chain() -> String {
    "solana".to_string()
}
fn default_venues() -> Vec<String> {
    ["raydium", "pumpswap", "meteora", "orca"]
        .iter()
        .map(|v| v.to_string())
        .collect()
}
fn default_min_cap() -> f64 {
    20_000.0
}
fn default_max_cap() -> f64 {
    40_000.0
}
fn default_min_volume() -> f64 {
    20_000.0
}
fn default_max_age_minutes() -> i64 {
    20
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            target_chain: default_chain(),
            allowed_venues: default_venues(),
            min_cap: default_min_cap(),
            max_cap: default_max_cap(),
            min_volume: default_min_volume(),
            min_liquidity: 0.0,
            max_age_minutes: default_max_age_minutes(),
        }
    }
}

impl FilterConfig {
    /// Whether `venue` is on the allow-list (case-insensitive)
    pub fn allows_venue(&self, venue: &str) -> bool {
        self.allowed_venues
            .iter()
            .any(|v| v.eq_ignore_ascii_case(venue))
    }
}

/// Per-cycle dispatch limits
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_posts")]
    pub max_posts_per_scan: usize,
    /// Minimum gap between two sends in the same cycle
    #[serde(default = "default_send_spacing_ms")]
    pub send_spacing_ms: u64,
}

fn default_max_posts() -> usize {
    3
}
fn default_send_spacing_ms() -> u64 {
    1_500
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_posts_per_scan: default_max_posts(),
            send_spacing_ms: default_send_spacing_ms(),
        }
    }
}

impl DispatchConfig {
    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_ms)
    }
}

/// Scan loop timing
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Sleep used after an unexpected cycle failure
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
    /// Consecutive storage failures before switching to the backoff interval
    #[serde(default = "default_failure_threshold")]
    pub storage_failure_threshold: u32,
    /// Post a message listing the active filters when the loop starts
    #[serde(default = "default_true")]
    pub announce_startup: bool,
}

fn default_scan_interval() -> u64 {
    10
}
fn default_backoff() -> u64 {
    30
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            backoff_secs: default_backoff(),
            storage_failure_threshold: default_failure_threshold(),
            announce_startup: true,
        }
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Dedup store location
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/pairwatch.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Telegram destination and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
    #[serde(default)]
    pub bot_token: String,
    /// Numeric chat id or `@channel` handle
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_url(),
            bot_token: String::new(),
            chat_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override Telegram credentials from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(BOT_TOKEN_ENV).ok(),
            std::env::var(CHAT_ID_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, bot_token: Option<String>, chat_id: Option<String>) {
        if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(chat) = chat_id.filter(|c| !c.trim().is_empty()) {
            self.telegram.chat_id = chat;
        }
    }

    /// Check every setting the scan loop relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_screening()?;

        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.chat_id"));
        }
        Ok(())
    }

    /// Validation that does not need credentials (dry runs, `config` command)
    pub fn validate_screening(&self) -> Result<(), ConfigError> {
        let f = &self.filter;

        if f.target_chain.trim().is_empty() {
            return Err(ConfigError::Missing("filter.target_chain"));
        }
        if f.allowed_venues.is_empty() {
            return Err(ConfigError::Missing("filter.allowed_venues"));
        }
        for (field, value) in [
            ("filter.min_cap", f.min_cap),
            ("filter.max_cap", f.max_cap),
            ("filter.min_volume", f.min_volume),
            ("filter.min_liquidity", f.min_liquidity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, format!("must be a non-negative number, got {value}")));
            }
        }
        if f.min_cap > f.max_cap {
            return Err(invalid(
                "filter.min_cap",
                format!("{} is greater than max_cap {}", f.min_cap, f.max_cap),
            ));
        }
        if f.max_age_minutes < 0 {
            return Err(invalid("filter.max_age_minutes", "must not be negative".into()));
        }
        if self.dispatch.max_posts_per_scan == 0 {
            return Err(invalid("dispatch.max_posts_per_scan", "must be at least 1".into()));
        }
        if self.scheduler.scan_interval_secs == 0 {
            return Err(invalid("scheduler.scan_interval_secs", "must be at least 1".into()));
        }
        if self.feed.timeout_secs == 0 || self.telegram.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "request timeouts must be at least 1s".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
