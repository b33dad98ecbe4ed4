use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{parse_json, Upstream};
use crate::config::TickwiseConfig;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{QuoteFuture, QuoteProvider, SourceError};
use crate::provider_policy::ProviderPolicy;
use crate::retry::RetryConfig;
use crate::throttling::Throttle;
use crate::{ProviderId, Quote, Symbol};

const QUERY_ENDPOINT: &str = "https://www.alphavantage.co/query";

/// Tertiary provider: Alpha Vantage `GLOBAL_QUOTE`. Needs an API key and is held
/// to the free-tier budget by a local throttle.
#[derive(Clone)]
pub struct AlphaVantageProvider {
    upstream: Upstream,
    api_key: Option<String>,
    throttle: Throttle,
}

impl AlphaVantageProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &TickwiseConfig) -> Self {
        Self {
            upstream: Upstream::new(
                ProviderId::Alphavantage,
                http_client,
                RetryConfig::with_max_retries(config.fetch.max_retries),
                config.fetch.timeout_ms,
            ),
            api_key: config
                .alphavantage_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            throttle: Throttle::from_policy(&ProviderPolicy::alphavantage_default()),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.upstream.retry = retry;
        self
    }

    async fn fetch_global_quote(&self, symbol: &Symbol) -> Result<Option<Quote>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials(ProviderId::Alphavantage))?;

        if let Err(wait) = self.throttle.acquire() {
            return Err(SourceError::rate_limited(format!(
                "alphavantage request budget exhausted; retry in {}s",
                wait.as_secs()
            )));
        }

        let endpoint = format!(
            "{QUERY_ENDPOINT}?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(api_key)
        );
        let response = self.upstream.send(HttpRequest::get(endpoint)).await?;
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }

        parse_global_quote(symbol, &response.body)
    }
}

impl QuoteProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> QuoteFuture<'a> {
        Box::pin(self.fetch_global_quote(symbol))
    }
}

pub(crate) fn parse_global_quote(
    symbol: &Symbol,
    body: &str,
) -> Result<Option<Quote>, SourceError> {
    let payload: GlobalQuotePayload = parse_json(ProviderId::Alphavantage, body)?;

    // Quota and key problems come back as 200 with a prose field instead of data.
    if let Some(note) = payload.note.or(payload.information) {
        return Err(SourceError::rate_limited(format!("alphavantage: {note}")));
    }
    if let Some(message) = payload.error_message {
        return Err(SourceError::invalid_request(format!("alphavantage: {message}")));
    }

    let Some(global) = payload.global_quote else {
        return Ok(None);
    };
    let Some(price) = number(global.price.as_deref()) else {
        debug!(symbol = %symbol, "alphavantage returned an empty global quote");
        return Ok(None);
    };

    let change_percent = global
        .change_percent
        .as_deref()
        .map(|raw| raw.trim().trim_end_matches('%'))
        .and_then(|raw| number(Some(raw)));

    let quote = Quote::new(symbol.clone(), price, ProviderId::Alphavantage)
        .map_err(|e| SourceError::malformed(format!("alphavantage quote for {symbol}: {e}")))?
        .with_range(number(global.low.as_deref()), number(global.high.as_deref()))
        .with_volume(
            number(global.volume.as_deref())
                .filter(|volume| *volume >= 0.0)
                .map(|volume| volume.round() as u64),
            None,
        )
        .with_change_percent(change_percent);
    Ok(Some(quote))
}

fn number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

#[derive(Debug, Deserialize)]
struct GlobalQuotePayload {
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}
