//! Quote providers in default chain order, plus the transport guard they share.

mod alphavantage;
mod yahoo_chart;
mod yahoo_quote;
mod yahoo_session;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::provider::SourceError;
use crate::retry::RetryConfig;
use crate::ProviderId;

pub use alphavantage::AlphaVantageProvider;
pub use yahoo_chart::YahooChartProvider;
pub use yahoo_quote::YahooQuoteProvider;
pub use yahoo_session::YahooSession;

pub(crate) const YAHOO_REFERER: &str = "https://finance.yahoo.com/";

/// Wraps a provider's transport with its circuit breaker, retry budget, and timeout.
#[derive(Clone)]
pub(crate) struct Upstream {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    timeout_ms: u64,
}

impl Upstream {
    pub(crate) fn new(
        provider: ProviderId,
        http_client: Arc<dyn HttpClient>,
        retry: RetryConfig,
        timeout_ms: u64,
    ) -> Self {
        Self {
            provider,
            http_client,
            breaker: Arc::new(CircuitBreaker::named(provider.as_str())),
            retry,
            timeout_ms,
        }
    }

    pub(crate) fn http_client(&self) -> &Arc<dyn HttpClient> {
        &self.http_client
    }

    pub(crate) const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Sends `request`, retrying transient failures. Non-2xx answers below 500 other
    /// than 429 are handed back for the adapter to interpret.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        if !self.breaker.allow_request() {
            return Err(SourceError::unavailable(format!(
                "{} circuit breaker is open",
                self.provider
            )));
        }

        let request = request.with_timeout_ms(self.timeout_ms);
        let mut attempt = 0;
        let outcome = loop {
            let outcome = self.http_client.execute(request.clone()).await;
            if !self.retry.should_retry(attempt, &outcome) {
                break outcome;
            }

            let delay = self.retry.delay_for_attempt(attempt);
            debug!(
                provider = %self.provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying upstream call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        match outcome {
            Err(error) => {
                self.breaker.record_failure();
                Err(SourceError::unavailable(format!(
                    "{} transport error: {}",
                    self.provider,
                    error.message()
                )))
            }
            Ok(response) if response.status == 429 => Err(SourceError::rate_limited(format!(
                "{} returned status 429",
                self.provider
            ))),
            Ok(response) if response.status >= 500 => {
                self.breaker.record_failure();
                Err(SourceError::unavailable(format!(
                    "{} returned status {}",
                    self.provider, response.status
                )))
            }
            Ok(response) => {
                self.breaker.record_success();
                Ok(response)
            }
        }
    }
}

/// Error object Yahoo embeds in chart and quote bodies.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct YahooApiError {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

impl YahooApiError {
    pub(crate) fn is_not_found(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case("not found"))
    }

    pub(crate) fn describe(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| String::from("unknown error"))
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: ProviderId,
    body: &str,
) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse {provider} response: {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Answers requests from a queue of scripted responses and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub(crate) fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self
                .responses
                .lock()
                .expect("response queue should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::non_retryable("no scripted response left")));
            Box::pin(async move { response })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedHttpClient;
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::http_client::HttpError;
    use crate::provider::SourceErrorKind;

    fn upstream(client: Arc<ScriptedHttpClient>, retry: RetryConfig) -> Upstream {
        Upstream::new(ProviderId::YahooChart, client, retry, 2_000)
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::ok_json("{}")),
        ]));
        let retry = RetryConfig {
            backoff: crate::retry::Backoff::Fixed {
                delay: std::time::Duration::from_millis(1),
            },
            ..RetryConfig::with_max_retries(1)
        };

        let response = upstream(client.clone(), retry)
            .send(HttpRequest::get("https://example.test/"))
            .await
            .expect("second attempt succeeds");

        assert!(response.is_success());
        assert_eq!(client.urls().len(), 2);
        assert!(client.requests().iter().all(|request| request.timeout_ms == 2_000));
    }

    #[tokio::test]
    async fn not_found_is_returned_to_the_adapter() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(404, ""))]));
        let response = upstream(client, RetryConfig::no_retry())
            .send(HttpRequest::get("https://example.test/"))
            .await
            .expect("404 is not a transport failure");
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_transport_failures() {
        let client = Arc::new(ScriptedHttpClient::new(
            (0..3).map(|_| Err(HttpError::new("reset"))).collect(),
        ));
        let upstream = upstream(client.clone(), RetryConfig::no_retry());

        for _ in 0..3 {
            let error = upstream
                .send(HttpRequest::get("https://example.test/"))
                .await
                .expect_err("transport fails");
            assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        }
        assert_eq!(upstream.breaker.state(), CircuitState::Open);

        let error = upstream
            .send(HttpRequest::get("https://example.test/"))
            .await
            .expect_err("breaker blocks the call");
        assert!(error.message().contains("circuit breaker is open"));
        assert_eq!(client.urls().len(), 3);
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_rate_limited() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(429, ""))]));
        let error = upstream(client, RetryConfig::no_retry())
            .send(HttpRequest::get("https://example.test/"))
            .await
            .expect_err("429 fails");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    }
}
