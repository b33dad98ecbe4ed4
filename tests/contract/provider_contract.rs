//! Provider contract: every quote provider maps its upstream payload onto the
//! same `Quote` shape and never invents data.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tickwise_core::{
    AlphaVantageProvider, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient,
    ProviderId, QuoteProvider, RetryConfig, Symbol, TickwiseConfig, YahooChartProvider,
    YahooQuoteProvider,
};

const CHART_BODY: &str = r#"{"chart":{"result":[{"timestamp":[1704067200],
    "indicators":{"quote":[{"open":[100.0],"high":[104.0],"low":[99.0],"close":[102.0],
    "volume":[5000]}]}}],"error":null}}"#;

const QUOTE_BODY: &str = r#"{"quoteResponse":{"result":[{"symbol":"AAPL",
    "regularMarketPrice":102.0,"regularMarketDayLow":99.0,"regularMarketDayHigh":104.0,
    "regularMarketVolume":5000,"averageDailyVolume3Month":7000,
    "regularMarketChangePercent":2.0}],"error":null}}"#;

const GLOBAL_QUOTE_BODY: &str = r#"{"Global Quote":{"01. symbol":"AAPL","02. open":"100.00",
    "03. high":"104.00","04. low":"99.00","05. price":"102.00","06. volume":"5000",
    "10. change percent":"2.0000%"}}"#;

/// Answers by the first route whose pattern occurs in the URL.
struct RoutedHttpClient {
    routes: Vec<(&'static str, HttpResponse)>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    fn new(routes: Vec<(&'static str, HttpResponse)>) -> Self {
        Self {
            routes,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().expect("lock").clone()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.seen.lock().expect("lock").push(request.clone());
        let response = self
            .routes
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| HttpError::non_retryable(format!("no route for {}", request.url)));
        Box::pin(async move { response })
    }
}

fn routed() -> Arc<RoutedHttpClient> {
    Arc::new(RoutedHttpClient::new(vec![
        ("fc.yahoo.com", HttpResponse::new(404, "")),
        ("getcrumb", HttpResponse::ok_json("crumb123")),
        ("/v8/finance/chart/", HttpResponse::ok_json(CHART_BODY)),
        ("/v7/finance/quote", HttpResponse::ok_json(QUOTE_BODY)),
        ("alphavantage.co", HttpResponse::ok_json(GLOBAL_QUOTE_BODY)),
    ]))
}

fn providers(http_client: Arc<dyn HttpClient>) -> Vec<Arc<dyn QuoteProvider>> {
    let config = TickwiseConfig::default();
    vec![
        Arc::new(
            YahooChartProvider::new(Arc::clone(&http_client), &config)
                .with_retry(RetryConfig::no_retry()),
        ),
        Arc::new(
            YahooQuoteProvider::new(Arc::clone(&http_client), &config)
                .with_retry(RetryConfig::no_retry()),
        ),
        Arc::new(
            AlphaVantageProvider::new(http_client, &config)
                .with_api_key("contract-key")
                .with_retry(RetryConfig::no_retry()),
        ),
    ]
}

fn aapl() -> Symbol {
    Symbol::parse("AAPL").expect("valid symbol")
}

#[tokio::test]
async fn every_provider_maps_a_valid_payload_to_the_same_quote_shape() {
    // Given: each upstream answers with one well-formed snapshot of AAPL
    let http = routed();

    // When / Then: every provider reports the same normalized quote
    for provider in providers(http.clone()) {
        let id = provider.id();
        let quote = provider
            .fetch(&aapl())
            .await
            .unwrap_or_else(|error| panic!("provider '{id}' failed: {error}"))
            .unwrap_or_else(|| panic!("provider '{id}' returned no data"));

        assert_eq!(quote.symbol, aapl(), "provider '{id}': symbol");
        assert_eq!(quote.source, id, "provider '{id}': source");
        assert_eq!(quote.price, 102.0, "provider '{id}': price");
        assert_eq!(quote.low, Some(99.0), "provider '{id}': low");
        assert_eq!(quote.high, Some(104.0), "provider '{id}': high");
        assert_eq!(quote.volume, Some(5_000), "provider '{id}': volume");
        assert_eq!(quote.change_percent, 2.0, "provider '{id}': change_percent");
        assert!(quote.avg_volume >= 0.0, "provider '{id}': avg_volume is never negative");
    }
}

#[tokio::test]
async fn providers_report_their_canonical_ids_in_chain_order() {
    let ids: Vec<ProviderId> = providers(Arc::new(NoopHttpClient))
        .iter()
        .map(|provider| provider.id())
        .collect();
    assert_eq!(ids, ProviderId::ALL.to_vec());
}

#[tokio::test]
async fn every_outbound_request_carries_a_bounded_timeout() {
    // Given: all providers over a scripted transport
    let http = routed();
    let expected_timeout = TickwiseConfig::default().fetch.timeout_ms;

    // When: each provider fetches once
    for provider in providers(http.clone()) {
        let _ = provider.fetch(&aapl()).await;
    }

    // Then: every request, session handshake included, used the configured timeout
    let seen = http.seen();
    assert!(seen.iter().any(|request| request.url.contains("getcrumb")));
    assert!(seen.iter().any(|request| request.url.contains("alphavantage.co")));
    for request in &seen {
        assert_eq!(request.timeout_ms, expected_timeout, "{}", request.url);
    }
}

#[tokio::test]
async fn offline_transport_never_yields_a_quote_or_panics() {
    for provider in providers(Arc::new(NoopHttpClient)) {
        let id = provider.id();
        let outcome = provider.fetch(&aapl()).await;
        assert!(
            !matches!(outcome, Ok(Some(_))),
            "provider '{id}' invented a quote from an empty body"
        );
    }
}
