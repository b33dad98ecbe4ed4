//! Ordered provider fallback for one exact symbol.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{AlphaVantageProvider, YahooChartProvider, YahooQuoteProvider, YahooSession};
use crate::cache::{CacheKey, CacheMode, CacheStore};
use crate::config::TickwiseConfig;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::provider::{QuoteProvider, SourceError, SourceErrorKind};
use crate::{ProviderId, Quote, Symbol};

/// What one provider did for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    CacheHit,
    NoData,
    Malformed,
    Unavailable,
    RateLimited,
    Skipped,
}

impl AttemptOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::CacheHit => "cache_hit",
            Self::NoData => "no_data",
            Self::Malformed => "malformed",
            Self::Unavailable => "unavailable",
            Self::RateLimited => "rate_limited",
            Self::Skipped => "skipped",
        }
    }

    pub const fn yielded_quote(self) -> bool {
        matches!(self, Self::Success | Self::CacheHit)
    }

    fn from_error(error: &SourceError) -> Self {
        match error.kind() {
            SourceErrorKind::RateLimited => Self::RateLimited,
            SourceErrorKind::Malformed => Self::Malformed,
            SourceErrorKind::MissingCredentials => Self::Skipped,
            SourceErrorKind::Unavailable
            | SourceErrorKind::InvalidRequest
            | SourceErrorKind::Internal => Self::Unavailable,
        }
    }
}

impl Display for AttemptOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic record of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub symbol: Symbol,
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FetchAttempt {
    fn new(symbol: &Symbol, provider: ProviderId, outcome: AttemptOutcome) -> Self {
        Self {
            symbol: symbol.clone(),
            provider,
            outcome,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Provider listing used by the `providers` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub priority: usize,
    pub provider: ProviderId,
    pub available: bool,
}

/// Tries each provider in priority order for the same symbol. Every failure is
/// recorded and swallowed; only "some quote" or "no quote" leaves this type.
pub struct ProviderChain {
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: Option<CacheStore<Quote>>,
    cache_mode: CacheMode,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self {
            providers,
            cache: None,
            cache_mode: CacheMode::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheStore<Quote>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn cache(&self) -> Option<&CacheStore<Quote>> {
        self.cache.as_ref()
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .enumerate()
            .map(|(index, provider)| ProviderStatus {
                priority: index + 1,
                provider: provider.id(),
                available: provider.is_available(),
            })
            .collect()
    }

    /// Returns the first quote any provider produces for `symbol`, appending one
    /// attempt per provider consulted.
    pub async fn fetch_from_providers(
        &self,
        symbol: &Symbol,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Option<Quote> {
        for provider in &self.providers {
            let id = provider.id();

            if !provider.is_available() {
                debug!(provider = %id, symbol = %symbol, "skipping provider without credentials");
                attempts.push(
                    FetchAttempt::new(symbol, id, AttemptOutcome::Skipped)
                        .with_detail("missing credentials"),
                );
                continue;
            }

            if let Some(quote) = self.cached(id, symbol).await {
                debug!(provider = %id, symbol = %symbol, "serving quote from cache");
                attempts.push(FetchAttempt::new(symbol, id, AttemptOutcome::CacheHit));
                return Some(quote);
            }

            match provider.fetch(symbol).await {
                Ok(Some(quote)) => {
                    info!(provider = %id, symbol = %symbol, price = quote.price, "provider returned a quote");
                    attempts.push(FetchAttempt::new(symbol, id, AttemptOutcome::Success));
                    self.store(id, symbol, &quote).await;
                    return Some(quote);
                }
                Ok(None) => {
                    debug!(provider = %id, symbol = %symbol, "provider had no data");
                    attempts.push(FetchAttempt::new(symbol, id, AttemptOutcome::NoData));
                }
                Err(error) => {
                    warn!(
                        provider = %id,
                        symbol = %symbol,
                        code = error.code(),
                        error = error.message(),
                        "provider call failed"
                    );
                    attempts.push(
                        FetchAttempt::new(symbol, id, AttemptOutcome::from_error(&error))
                            .with_detail(error.message()),
                    );
                }
            }
        }

        None
    }

    async fn cached(&self, provider: ProviderId, symbol: &Symbol) -> Option<Quote> {
        if !self.cache_mode.reads() {
            return None;
        }
        let cache = self.cache.as_ref()?;
        cache.get(&CacheKey::new(provider, symbol)).await
    }

    async fn store(&self, provider: ProviderId, symbol: &Symbol, quote: &Quote) {
        if !self.cache_mode.writes() {
            return;
        }
        if let Some(cache) = &self.cache {
            cache
                .put(CacheKey::new(provider, symbol), quote.clone(), None)
                .await;
        }
    }
}

/// Assembles the default Yahoo chart, Yahoo quote, Alpha Vantage chain.
///
/// Tests swap the transport with [`with_http_client`](Self::with_http_client) or
/// replace the providers outright with [`with_providers`](Self::with_providers).
pub struct ProviderChainBuilder {
    config: TickwiseConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    providers: Option<Vec<Arc<dyn QuoteProvider>>>,
    cache: Option<CacheStore<Quote>>,
    cache_mode: CacheMode,
}

impl ProviderChainBuilder {
    pub fn new(config: TickwiseConfig) -> Self {
        Self {
            config,
            http_client: None,
            providers: None,
            cache: None,
            cache_mode: CacheMode::default(),
        }
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_providers(mut self, providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Shares an existing cache instead of creating one from config.
    pub fn with_cache(mut self, cache: CacheStore<Quote>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.config.alphavantage_api_key = Some(key.into());
        self
    }

    pub fn build(self) -> ProviderChain {
        let providers = match self.providers {
            Some(providers) => providers,
            None => {
                let http_client = self
                    .http_client
                    .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
                default_providers(http_client, &self.config)
            }
        };

        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if self.config.cache.enabled => Some(CacheStore::new(self.config.cache.ttl())),
            None => None,
        };

        let mut chain = ProviderChain::new(providers).with_cache_mode(self.cache_mode);
        if let Some(cache) = cache {
            chain = chain.with_cache(cache);
        }
        chain
    }
}

fn default_providers(
    http_client: Arc<dyn HttpClient>,
    config: &TickwiseConfig,
) -> Vec<Arc<dyn QuoteProvider>> {
    let session = Arc::new(YahooSession::default());
    vec![
        Arc::new(YahooChartProvider::new(Arc::clone(&http_client), config)),
        Arc::new(YahooQuoteProvider::new(Arc::clone(&http_client), config).with_session(session)),
        Arc::new(AlphaVantageProvider::new(http_client, config)),
    ]
}
