//! # Tickwise Core
//!
//! Turns a free-form query naming a stock or coin into a price snapshot.
//!
//! ## Overview
//!
//! - **Candidate extraction** picks the most ticker-like token out of user text
//! - **Symbol search** maps a loose candidate to a listed symbol (optional)
//! - **Normalization** expands a base ticker into ordered exchange and crypto variants
//! - **Quote fetching** walks the variants against a provider fallback chain
//! - **Analysis** wraps the result in a success or failure record with alerts
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Quote providers (Yahoo chart, Yahoo quote, Alpha Vantage) |
//! | [`analysis`] | Analysis record, alerts, positions, change detection |
//! | [`cache`] | TTL cache in front of providers |
//! | [`chain`] | Provider fallback chain and attempt log |
//! | [`circuit_breaker`] | Per-provider circuit breaker |
//! | [`config`] | Stop words, suffixes, timeouts, thresholds |
//! | [`domain`] | Symbol, quote, OHLCV row, interval, timestamp |
//! | [`error`] | Validation and resolution errors |
//! | [`extract`] | Candidate extraction |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Variant expansion |
//! | [`orchestrator`] | Variant-order fetch state machine |
//! | [`provider`] | Provider trait and provider errors |
//! | [`provider_policy`] | Provider quota policies |
//! | [`resolver`] | Extraction, search, normalization pipeline |
//! | [`retry`] | Provider-local retry and backoff |
//! | [`search`] | Symbol search client and match policy |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Rate budget for quota-limited providers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickwise_core::{Analyzer, ReqwestHttpClient, TickwiseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TickwiseConfig::default().with_env_overrides()?;
//!     let analyzer = Analyzer::from_config(&config, Arc::new(ReqwestHttpClient::new()));
//!
//!     let report = analyzer.analyze("show me sbin price", Some(600.0)).await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │ text
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Symbol Resolver │────▶│ Symbol Search    │
//! └────────┬────────┘     └──────────────────┘
//!          │ variants
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Quote Fetcher   │────▶│ Provider Chain   │──▶ cache, breaker, retry
//! └────────┬────────┘     └──────────────────┘
//!          │ quote | none
//!          ▼
//! ┌─────────────────┐
//! │ Analysis Report │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider failures never escape the chain; only the final outcome does:
//!
//! ```rust
//! use tickwise_core::{normalize, ResolveError};
//!
//! let variants = normalize("sbin").expect("bare ticker expands");
//! assert_eq!(variants[0].as_str(), "SBIN.NS");
//!
//! match normalize("?!") {
//!     Err(ResolveError::InvalidSymbol { .. }) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! ## Security
//!
//! - API keys come from config or environment and are never serialized or logged
//! - Every outbound request carries an explicit timeout

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod chain;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod provider_policy;
pub mod resolver;
pub mod retry;
pub mod search;
pub mod source;
pub mod throttling;

// Providers
pub use adapters::{AlphaVantageProvider, YahooChartProvider, YahooQuoteProvider, YahooSession};

// Analysis record
pub use analysis::{
    detect_changes, price_alerts, Alert, AnalysisFailure, AnalysisRecord, AnalysisReport, Analyzer,
    Change, EntryZone, Lot, Position,
};

// Caching
pub use cache::{CacheKey, CacheMode, CacheStore};

// Fallback chain
pub use chain::{AttemptOutcome, FetchAttempt, ProviderChain, ProviderChainBuilder, ProviderStatus};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{
    AlertConfig, CacheConfig, FetchConfig, ScoringWeights, SearchConfig, SuffixConfig,
    TickwiseConfig,
};

// Domain models
pub use domain::{round2, Interval, OhlcvRow, Quote, Symbol, UtcDateTime};

// Error types
pub use error::{CoreError, ResolveError, ValidationError};

// Resolution steps
pub use extract::{extract_candidate, CandidateExtractor};
pub use normalize::{normalize, SymbolNormalizer};
pub use resolver::{Resolution, SymbolResolver};
pub use search::{select_match, SearchResult, SymbolSearch, YahooSearchClient};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Orchestration
pub use orchestrator::{FetchReport, FetchState, QuoteFetcher};

// Provider contract
pub use provider::{QuoteFuture, QuoteProvider, SourceError, SourceErrorKind};

// Provider policies
pub use provider_policy::{BackoffPolicy, ProviderPolicy};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::Throttle;
