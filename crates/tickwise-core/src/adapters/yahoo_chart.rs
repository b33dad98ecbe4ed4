use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{parse_json, Upstream, YahooApiError, YAHOO_REFERER};
use crate::config::TickwiseConfig;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{QuoteFuture, QuoteProvider, SourceError};
use crate::retry::RetryConfig;
use crate::{Interval, OhlcvRow, ProviderId, Quote, Symbol, UtcDateTime};

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Primary provider: recent daily bars from the Yahoo chart endpoint, reduced to
/// the newest row that has a close.
#[derive(Clone)]
pub struct YahooChartProvider {
    upstream: Upstream,
    range_days: u32,
    interval: Interval,
    avg_volume_window: usize,
}

impl YahooChartProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &TickwiseConfig) -> Self {
        Self {
            upstream: Upstream::new(
                ProviderId::YahooChart,
                http_client,
                RetryConfig::with_max_retries(config.fetch.max_retries),
                config.fetch.timeout_ms,
            ),
            range_days: config.fetch.history_range_days,
            interval: config.fetch.history_interval,
            avg_volume_window: config.fetch.avg_volume_window,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.upstream.retry = retry;
        self
    }

    fn endpoint(&self, symbol: &Symbol) -> String {
        format!(
            "{CHART_ENDPOINT}/{}?range={}d&interval={}",
            urlencoding::encode(symbol.as_str()),
            self.range_days,
            self.interval.yahoo_param()
        )
    }

    async fn fetch_chart(&self, symbol: &Symbol) -> Result<Option<Quote>, SourceError> {
        let request = HttpRequest::get(self.endpoint(symbol)).with_header("referer", YAHOO_REFERER);
        let response = self.upstream.send(request).await?;

        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo chart returned status {}",
                response.status
            )));
        }

        self.parse_chart(symbol, &response.body)
    }

    pub(crate) fn parse_chart(
        &self,
        symbol: &Symbol,
        body: &str,
    ) -> Result<Option<Quote>, SourceError> {
        let envelope: ChartEnvelope = parse_json(ProviderId::YahooChart, body)?;

        if let Some(error) = envelope.chart.error {
            if error.is_not_found() {
                return Ok(None);
            }
            return Err(SourceError::unavailable(format!(
                "yahoo chart error: {}",
                error.describe()
            )));
        }

        let Some(result) = envelope.chart.result.and_then(|results| results.into_iter().next())
        else {
            return Ok(None);
        };

        let rows = result.into_rows();
        debug!(symbol = %symbol, rows = rows.len(), "parsed yahoo chart rows");
        Ok(Quote::from_rows(
            symbol.clone(),
            &rows,
            self.avg_volume_window,
            ProviderId::YahooChart,
        ))
    }
}

impl QuoteProvider for YahooChartProvider {
    fn id(&self) -> ProviderId {
        ProviderId::YahooChart
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> QuoteFuture<'a> {
        Box::pin(self.fetch_chart(symbol))
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResult {
    fn into_rows(self) -> Vec<OhlcvRow> {
        let quote = self.indicators.quote.into_iter().next().unwrap_or_default();
        let len = quote.close.len().max(self.timestamp.len());
        let at = |column: &[Option<f64>], index: usize| column.get(index).copied().flatten();

        (0..len)
            .map(|index| OhlcvRow {
                ts: self
                    .timestamp
                    .get(index)
                    .and_then(|seconds| UtcDateTime::from_unix_seconds(*seconds).ok()),
                open: at(&quote.open, index),
                high: at(&quote.high, index),
                low: at(&quote.low, index),
                close: at(&quote.close, index),
                volume: at(&quote.volume, index)
                    .filter(|volume| volume.is_finite() && *volume >= 0.0)
                    .map(|volume| volume.round() as u64),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ScriptedHttpClient;
    use super::*;
    use crate::http_client::HttpResponse;
    use crate::provider::SourceErrorKind;

    fn provider(client: Arc<ScriptedHttpClient>) -> YahooChartProvider {
        YahooChartProvider::new(client, &TickwiseConfig::default()).with_retry(RetryConfig::no_retry())
    }

    fn symbol() -> Symbol {
        Symbol::parse("SBIN.NS").expect("valid")
    }

    const TWO_DAYS: &str = r#"{"chart":{"result":[{"timestamp":[1704067200,1704153600],
        "indicators":{"quote":[{"open":[600.0,610.0],"high":[612.0,null],"low":[598.0,null],
        "close":[611.0,null],"volume":[1000,null]}]}}],"error":null}}"#;

    #[tokio::test]
    async fn requests_five_daily_bars() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(TWO_DAYS))]));
        let quote = provider(client.clone())
            .fetch(&symbol())
            .await
            .expect("chart parses")
            .expect("has a close");

        assert_eq!(
            client.urls(),
            vec!["https://query1.finance.yahoo.com/v8/finance/chart/SBIN.NS?range=5d&interval=1d"]
        );
        assert_eq!(quote.price, 611.0);
        assert_eq!(quote.high, Some(612.0));
        assert_eq!(quote.change_percent, 1.83);
        assert_eq!(quote.source, ProviderId::YahooChart);
    }

    #[tokio::test]
    async fn unknown_symbol_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(404, body))]));
        assert_eq!(provider(client).fetch(&symbol()).await, Ok(None));
    }

    #[test]
    fn api_error_other_than_not_found_is_unavailable() {
        let client = Arc::new(ScriptedHttpClient::default());
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#;
        let error = provider(client)
            .parse_chart(&symbol(), body)
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("Invalid range"));
    }

    #[test]
    fn html_body_is_malformed() {
        let client = Arc::new(ScriptedHttpClient::default());
        let error = provider(client)
            .parse_chart(&symbol(), "<html>blocked</html>")
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Malformed);
    }

    #[test]
    fn result_without_timestamps_is_no_data() {
        let client = Arc::new(ScriptedHttpClient::default());
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert_eq!(provider(client).parse_chart(&symbol(), body), Ok(None));
    }
}
