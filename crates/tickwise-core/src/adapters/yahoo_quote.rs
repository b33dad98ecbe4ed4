use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{parse_json, Upstream, YahooApiError, YahooSession, YAHOO_REFERER};
use crate::config::TickwiseConfig;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::provider::{QuoteFuture, QuoteProvider, SourceError};
use crate::retry::RetryConfig;
use crate::{ProviderId, Quote, Symbol};

const QUOTE_ENDPOINT: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const QUOTE_FIELDS: &str = "regularMarketPrice,regularMarketDayLow,regularMarketDayHigh,\
regularMarketVolume,averageDailyVolume3Month,regularMarketChangePercent";

/// Secondary provider: the Yahoo quote endpoint, which reports day range, volume,
/// and percent change directly.
#[derive(Clone)]
pub struct YahooQuoteProvider {
    upstream: Upstream,
    session: Arc<YahooSession>,
}

impl YahooQuoteProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &TickwiseConfig) -> Self {
        Self {
            upstream: Upstream::new(
                ProviderId::YahooQuote,
                http_client,
                RetryConfig::with_max_retries(config.fetch.max_retries),
                config.fetch.timeout_ms,
            ),
            session: Arc::new(YahooSession::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.upstream.retry = retry;
        self
    }

    pub fn with_session(mut self, session: Arc<YahooSession>) -> Self {
        self.session = session;
        self
    }

    async fn request(&self, symbol: &Symbol) -> Result<HttpResponse, SourceError> {
        let crumb = self.session.crumb(&self.upstream).await?;
        let endpoint = format!(
            "{QUOTE_ENDPOINT}?symbols={}&fields={QUOTE_FIELDS}&crumb={}",
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(&crumb)
        );
        self.upstream
            .send(HttpRequest::get(endpoint).with_header("referer", YAHOO_REFERER))
            .await
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Option<Quote>, SourceError> {
        let mut response = self.request(symbol).await?;

        // A stale crumb answers 401; refresh the session once.
        if matches!(response.status, 401 | 403) {
            debug!(symbol = %symbol, status = response.status, "refreshing yahoo session");
            self.session.invalidate();
            response = self.request(symbol).await?;
        }

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo quote returned status {}",
                response.status
            )));
        }

        parse_quote(symbol, &response.body)
    }
}

impl QuoteProvider for YahooQuoteProvider {
    fn id(&self) -> ProviderId {
        ProviderId::YahooQuote
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> QuoteFuture<'a> {
        Box::pin(self.fetch_quote(symbol))
    }
}

pub(crate) fn parse_quote(symbol: &Symbol, body: &str) -> Result<Option<Quote>, SourceError> {
    let envelope: QuoteEnvelope = parse_json(ProviderId::YahooQuote, body)?;

    if let Some(error) = envelope.quote_response.error {
        return Err(SourceError::unavailable(format!(
            "yahoo quote error: {}",
            error.describe()
        )));
    }

    let matching = envelope
        .quote_response
        .result
        .into_iter()
        .find(|entry| entry.symbol.eq_ignore_ascii_case(symbol.as_str()));
    let Some(entry) = matching else {
        return Ok(None);
    };
    let Some(price) = entry.regular_market_price else {
        return Ok(None);
    };

    let quote = Quote::new(symbol.clone(), price, ProviderId::YahooQuote)
        .map_err(|e| SourceError::malformed(format!("yahoo quote for {symbol}: {e}")))?
        .with_range(entry.regular_market_day_low, entry.regular_market_day_high)
        .with_volume(
            entry
                .regular_market_volume
                .filter(|volume| volume.is_finite() && *volume >= 0.0)
                .map(|volume| volume.round() as u64),
            entry.average_daily_volume_3_month,
        )
        .with_change_percent(entry.regular_market_change_percent);
    Ok(Some(quote))
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<QuoteEntry>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEntry {
    symbol: String,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_day_low: Option<f64>,
    #[serde(default)]
    regular_market_day_high: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<f64>,
    #[serde(default, rename = "averageDailyVolume3Month")]
    average_daily_volume_3_month: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ScriptedHttpClient;
    use super::*;
    use crate::provider::SourceErrorKind;

    const QUOTE: &str = r#"{"quoteResponse":{"result":[{"symbol":"INFY.NS",
        "regularMarketPrice":1520.5,"regularMarketDayLow":1501.0,"regularMarketDayHigh":1530.25,
        "regularMarketVolume":5120000,"averageDailyVolume3Month":6400000,
        "regularMarketChangePercent":1.23456}],"error":null}}"#;

    fn symbol() -> Symbol {
        Symbol::parse("INFY.NS").expect("valid")
    }

    #[test]
    fn maps_quote_fields_directly() {
        let quote = parse_quote(&symbol(), QUOTE).expect("parses").expect("has price");

        assert_eq!(quote.price, 1520.5);
        assert_eq!(quote.low, Some(1501.0));
        assert_eq!(quote.high, Some(1530.25));
        assert_eq!(quote.volume, Some(5_120_000));
        assert_eq!(quote.avg_volume, 6_400_000.0);
        assert_eq!(quote.change_percent, 1.23);
    }

    #[test]
    fn empty_result_is_no_data() {
        let body = r#"{"quoteResponse":{"result":[],"error":null}}"#;
        assert_eq!(parse_quote(&symbol(), body), Ok(None));
    }

    #[test]
    fn entry_without_price_is_no_data() {
        let body = r#"{"quoteResponse":{"result":[{"symbol":"INFY.NS"}],"error":null}}"#;
        assert_eq!(parse_quote(&symbol(), body), Ok(None));
    }

    #[tokio::test]
    async fn stale_crumb_triggers_one_session_refresh() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::ok_json("old")),
            Ok(HttpResponse::new(401, r#"{"finance":{"error":{"code":"Unauthorized"}}}"#)),
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::ok_json("fresh")),
            Ok(HttpResponse::ok_json(QUOTE)),
        ]));
        let provider = YahooQuoteProvider::new(client.clone(), &TickwiseConfig::default())
            .with_retry(RetryConfig::no_retry());

        let quote = provider.fetch(&symbol()).await.expect("quote").expect("price");
        assert_eq!(quote.source, ProviderId::YahooQuote);

        let urls = client.urls();
        assert!(urls[2].contains("crumb=old"));
        assert!(urls[5].contains("crumb=fresh"));
        assert!(urls[5].contains("symbols=INFY.NS"));
    }

    #[tokio::test]
    async fn persistent_unauthorized_is_unavailable() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::ok_json("c1")),
            Ok(HttpResponse::new(401, "")),
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::ok_json("c2")),
            Ok(HttpResponse::new(401, "")),
        ]));
        let provider = YahooQuoteProvider::new(client, &TickwiseConfig::default())
            .with_retry(RetryConfig::no_retry());

        let error = provider.fetch(&symbol()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    }
}
