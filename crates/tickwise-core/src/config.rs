//! Configuration driving extraction, normalization, and fetching.
//!
//! Every list the resolver consults (stop words, suffix priority, scoring weights)
//! lives here so deployments can tune it from a JSON file without code changes.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Interval, ValidationError};

/// Verbs stripped ahead of a ticker. Also part of the default stop words.
const COMMAND_WORDS: &[&str] = &[
    "add", "analyse", "analyze", "buy", "check", "find", "get", "give", "lookup", "monitor",
    "remove", "sell", "show", "tell", "track", "untrack", "update", "watch",
];

const STOP_WORDS: &[&str] = &[
    "hold",
    // generic finance nouns
    "analysis", "chart", "coin", "crypto", "details", "info", "market", "news", "portfolio",
    "price", "prices", "quote", "rate", "share", "shares", "signal", "stock", "stocks", "ticker",
    "trend", "value", "watchlist",
    // filler
    "a", "about", "an", "and", "are", "at", "current", "for", "how", "i", "in", "is", "latest",
    "me", "my", "now", "of", "on", "or", "please", "see", "the", "to", "today", "want", "what",
    "whats",
];

const RECOGNIZED_EXTRA: &[&str] = &[
    ".L", ".TO", ".V", ".DE", ".F", ".PA", ".AS", ".SW", ".MI", ".MC", ".HK", ".T", ".SS", ".SZ",
    ".KS", ".AX", ".NZ", ".SI", ".SA", ".MX", "-EUR", "-GBP", "-INR", "-ETH",
];

/// Top-level configuration for the resolver, providers, and analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickwiseConfig {
    /// Words the extractor never picks while a better token exists.
    pub stop_words: Vec<String>,
    /// Leading verbs the normalizer strips. Nouns and filler stay out so tickers
    /// such as COIN or NOW still resolve.
    pub command_words: Vec<String>,
    pub scoring: ScoringWeights,
    pub suffixes: SuffixConfig,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub alerts: AlertConfig,
    #[serde(skip_serializing)]
    pub alphavantage_api_key: Option<String>,
}

/// Bonuses added to a token's length when scoring extraction candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub digit_bonus: usize,
    pub punctuation_bonus: usize,
}

/// Suffix priority used by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuffixConfig {
    pub domestic: String,
    pub secondary_domestic: String,
    pub foreign: Vec<String>,
    pub crypto: Vec<String>,
    /// Further suffixes that mark a symbol as already qualified but are never generated.
    pub recognized_extra: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub history_range_days: u32,
    pub history_interval: Interval,
    pub avg_volume_window: usize,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub profit_threshold_pct: f64,
    pub loss_threshold_pct: f64,
}

impl Default for TickwiseConfig {
    fn default() -> Self {
        Self {
            stop_words: COMMAND_WORDS
                .iter()
                .chain(STOP_WORDS)
                .map(|word| (*word).to_owned())
                .collect(),
            command_words: COMMAND_WORDS.iter().map(|word| (*word).to_owned()).collect(),
            scoring: ScoringWeights::default(),
            suffixes: SuffixConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            alerts: AlertConfig::default(),
            alphavantage_api_key: None,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            digit_bonus: 2,
            punctuation_bonus: 2,
        }
    }
}

impl Default for SuffixConfig {
    fn default() -> Self {
        Self {
            domestic: String::from(".NS"),
            secondary_domestic: String::from(".BO"),
            foreign: vec![
                String::from(".US"),
                String::from(".NYSE"),
                String::from(".NASDAQ"),
            ],
            crypto: vec![
                String::from("-USD"),
                String::from("-USDT"),
                String::from("-BTC"),
            ],
            recognized_extra: RECOGNIZED_EXTRA.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl SuffixConfig {
    /// All suffixes that mark a symbol as already qualified.
    pub fn recognized(&self) -> impl Iterator<Item = &str> {
        [self.domestic.as_str(), self.secondary_domestic.as_str()]
            .into_iter()
            .chain(self.foreign.iter().map(String::as_str))
            .chain(self.crypto.iter().map(String::as_str))
            .chain(self.recognized_extra.iter().map(String::as_str))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            max_results: 10,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            history_range_days: 5,
            history_interval: Interval::OneDay,
            avg_volume_window: 10,
            max_retries: 1,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 5,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            profit_threshold_pct: 5.0,
            loss_threshold_pct: 5.0,
        }
    }
}

impl TickwiseConfig {
    /// Loads a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `TICKWISE_*` environment overrides on top of the current values.
    pub fn with_env_overrides(mut self) -> Result<Self, ValidationError> {
        if let Some(key) = env::var("TICKWISE_ALPHAVANTAGE_API_KEY")
            .or_else(|_| env::var("ALPHAVANTAGE_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
        {
            self.alphavantage_api_key = Some(key);
        }

        if let Some(value) = env_u64("TICKWISE_FETCH_TIMEOUT_MS")? {
            self.fetch.timeout_ms = value;
        }
        if let Some(value) = env_u64("TICKWISE_SEARCH_TIMEOUT_MS")? {
            self.search.timeout_ms = value;
        }
        if let Some(value) = env_u64("TICKWISE_CACHE_TTL_MINUTES")? {
            self.cache.ttl_minutes = value;
        }
        if let Ok(value) = env::var("TICKWISE_SEARCH_ENABLED") {
            self.search.enabled = parse_flag("TICKWISE_SEARCH_ENABLED", &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fetch.timeout_ms == 0 {
            return Err(invalid("fetch.timeout_ms", "must be greater than zero"));
        }
        if self.search.timeout_ms == 0 {
            return Err(invalid("search.timeout_ms", "must be greater than zero"));
        }
        if self.fetch.avg_volume_window == 0 {
            return Err(invalid("fetch.avg_volume_window", "must be greater than zero"));
        }
        if self.fetch.history_range_days == 0 {
            return Err(invalid("fetch.history_range_days", "must be greater than zero"));
        }

        for suffix in self.suffixes.recognized() {
            if !(suffix.starts_with('.') || suffix.starts_with('-')) || suffix.len() < 2 {
                return Err(invalid(
                    "suffixes",
                    format!("'{suffix}' must start with '.' or '-' followed by a code"),
                ));
            }
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch.timeout_ms)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ValidationError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(name, format!("'{value}' is not a whole number"))),
        Err(_) => Ok(None),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(name, format!("'{other}' is not a boolean"))),
    }
}
