//! External symbol search used to turn a loose candidate into a listed ticker.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TickwiseConfig;
use crate::http_client::{HttpClient, HttpRequest};

const SEARCH_ENDPOINT: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const EQUITY: &str = "EQUITY";

/// Future returned by [`SymbolSearch::search`].
pub type SearchFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

/// Maps a candidate token to the best listed symbol, or `None` when the lookup
/// fails or finds nothing. A `None` is never fatal: callers fall back to the
/// candidate itself.
pub trait SymbolSearch: Send + Sync {
    fn search<'a>(&'a self, candidate: &'a str) -> SearchFuture<'a>;
}

/// One search hit, normalized at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub symbol: String,
    pub shortname: Option<String>,
    pub quote_type: Option<String>,
}

impl SearchResult {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            shortname: None,
            quote_type: None,
        }
    }

    pub fn with_shortname(mut self, shortname: impl Into<String>) -> Self {
        self.shortname = Some(shortname.into());
        self
    }

    pub fn with_quote_type(mut self, quote_type: impl Into<String>) -> Self {
        self.quote_type = Some(quote_type.into());
        self
    }

    pub fn is_equity(&self) -> bool {
        self.quote_type
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case(EQUITY))
    }
}

/// Picks a result for `candidate`; the first rule with a hit wins:
///
/// 1. symbol contains the candidate (case-insensitive)
/// 2. short name contains the candidate
/// 3. an equity listed with `preferred_suffix`
/// 4. the first equity
/// 5. the first result
pub fn select_match<'r>(
    candidate: &str,
    results: &'r [SearchResult],
    preferred_suffix: &str,
) -> Option<&'r SearchResult> {
    let needle = candidate.trim().to_ascii_uppercase();
    let suffix = preferred_suffix.to_ascii_uppercase();
    let contains = |haystack: &str| !needle.is_empty() && haystack.to_ascii_uppercase().contains(&needle);

    results
        .iter()
        .find(|result| contains(&result.symbol))
        .or_else(|| {
            results
                .iter()
                .find(|result| result.shortname.as_deref().is_some_and(contains))
        })
        .or_else(|| {
            results.iter().find(|result| {
                result.is_equity()
                    && !suffix.is_empty()
                    && result.symbol.to_ascii_uppercase().ends_with(&suffix)
            })
        })
        .or_else(|| results.iter().find(|result| result.is_equity()))
        .or_else(|| results.first())
}

/// Yahoo Finance search endpoint. One GET per lookup, no retries, bounded by the
/// search timeout.
#[derive(Clone)]
pub struct YahooSearchClient {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
    max_results: usize,
    preferred_suffix: String,
}

impl YahooSearchClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &TickwiseConfig) -> Self {
        Self {
            http_client,
            timeout_ms: config.search.timeout_ms,
            max_results: config.search.max_results.max(1),
            preferred_suffix: config.suffixes.domestic.clone(),
        }
    }

    fn endpoint(&self, candidate: &str) -> String {
        format!(
            "{SEARCH_ENDPOINT}?q={}&quotesCount={}&newsCount=0",
            urlencoding::encode(candidate),
            self.max_results
        )
    }

    async fn lookup(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }

        let request = HttpRequest::get(self.endpoint(candidate))
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(candidate, error = error.message(), "symbol search failed");
                return None;
            }
        };
        if !response.is_success() {
            warn!(candidate, status = response.status, "symbol search returned non-success status");
            return None;
        }

        let results = match parse_results(&response.body) {
            Ok(results) => results,
            Err(error) => {
                warn!(candidate, %error, "symbol search response was malformed");
                return None;
            }
        };

        let selected = select_match(candidate, &results, &self.preferred_suffix)
            .map(|result| result.symbol.to_ascii_uppercase());
        debug!(candidate, results = results.len(), selected = ?selected, "symbol search finished");
        selected
    }
}

impl SymbolSearch for YahooSearchClient {
    fn search<'a>(&'a self, candidate: &'a str) -> SearchFuture<'a> {
        Box::pin(self.lookup(candidate))
    }
}

/// Parses a search body. Records whose `symbol` is missing or empty are dropped.
pub fn parse_results(body: &str) -> Result<Vec<SearchResult>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .quotes
        .into_iter()
        .filter_map(RawSearchQuote::into_result)
        .collect())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<RawSearchQuote>,
}

#[derive(Debug, Deserialize)]
struct RawSearchQuote {
    #[serde(default)]
    symbol: Option<SymbolField>,
    #[serde(default)]
    shortname: Option<String>,
    #[serde(default, rename = "quoteType")]
    quote_type: Option<String>,
}

/// Older payloads carry `symbol` as a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SymbolField {
    One(String),
    Many(Vec<String>),
}

impl RawSearchQuote {
    fn into_result(self) -> Option<SearchResult> {
        let symbol = match self.symbol? {
            SymbolField::One(symbol) => symbol,
            SymbolField::Many(symbols) => symbols.into_iter().next()?,
        };
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }

        Some(SearchResult {
            symbol: symbol.to_owned(),
            shortname: self.shortname,
            quote_type: self.quote_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ScriptedHttpClient;
    use crate::http_client::{HttpError, HttpResponse, NoopHttpClient};

    fn equity(symbol: &str, name: &str) -> SearchResult {
        SearchResult::new(symbol)
            .with_shortname(name)
            .with_quote_type("EQUITY")
    }

    #[test]
    fn symbol_substring_wins_over_name() {
        let results = vec![
            equity("RELIANCE.NS", "Reliance Industries"),
            equity("SBIN.NS", "State Bank of India"),
        ];
        let selected = select_match("sbin", &results, ".NS").expect("match");
        assert_eq!(selected.symbol, "SBIN.NS");
    }

    #[test]
    fn short_name_matches_when_symbol_does_not() {
        let results = vec![
            equity("MSFT", "Microsoft Corporation"),
            equity("INFY.NS", "Infosys Limited"),
        ];
        let selected = select_match("infosys", &results, ".NS").expect("match");
        assert_eq!(selected.symbol, "INFY.NS");
    }

    #[test]
    fn prefers_home_market_equity_then_any_equity() {
        let results = vec![
            SearchResult::new("XYZ-USD").with_quote_type("CRYPTOCURRENCY"),
            equity("ABC.L", "Alpha"),
            equity("DEF.NS", "Delta"),
        ];
        assert_eq!(select_match("zzz", &results, ".NS").expect("match").symbol, "DEF.NS");
        assert_eq!(select_match("zzz", &results, ".BO").expect("match").symbol, "ABC.L");
    }

    #[test]
    fn falls_back_to_first_result_of_any_type() {
        let results = vec![
            SearchResult::new("^NSEI").with_quote_type("INDEX"),
            SearchResult::new("NIFTYBEES.NS").with_quote_type("ETF"),
        ];
        assert_eq!(select_match("zzz", &results, ".NS").expect("match").symbol, "^NSEI");
        assert!(select_match("zzz", &[], ".NS").is_none());
    }

    #[test]
    fn accepts_symbol_as_string_or_list() {
        let body = r#"{"quotes":[
            {"symbol":["TCS.NS"],"shortname":"Tata Consultancy","quoteType":"EQUITY"},
            {"symbol":"TCS.BO","quoteType":"EQUITY"},
            {"symbol":[],"quoteType":"EQUITY"},
            {"shortname":"no symbol"}
        ]}"#;
        let results = parse_results(body).expect("parses");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "TCS.NS");
        assert_eq!(results[1].symbol, "TCS.BO");
    }

    #[tokio::test]
    async fn returns_selected_symbol_with_bounded_timeout() {
        let body = r#"{"quotes":[{"symbol":"sbin.ns","shortname":"State Bank","quoteType":"EQUITY"}]}"#;
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(body))]));
        let search = YahooSearchClient::new(client.clone(), &TickwiseConfig::default());

        assert_eq!(search.search("SBIN").await.as_deref(), Some("SBIN.NS"));

        let requests = client.requests();
        assert_eq!(
            requests[0].url,
            "https://query2.finance.yahoo.com/v1/finance/search?q=SBIN&quotesCount=10&newsCount=0"
        );
        assert_eq!(requests[0].timeout_ms, 5_000);
    }

    #[tokio::test]
    async fn failures_fall_back_to_none() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Err(HttpError::timeout("search timed out")),
            Ok(HttpResponse::new(500, "")),
            Ok(HttpResponse::ok_json("<html/>")),
            Ok(HttpResponse::ok_json(r#"{"quotes":[]}"#)),
        ]));
        let search = YahooSearchClient::new(client, &TickwiseConfig::default());

        for _ in 0..4 {
            assert_eq!(search.search("SBIN").await, None);
        }
    }

    #[tokio::test]
    async fn offline_client_yields_none() {
        let search = YahooSearchClient::new(Arc::new(NoopHttpClient), &TickwiseConfig::default());
        assert_eq!(search.search("SBIN").await, None);
    }
}
