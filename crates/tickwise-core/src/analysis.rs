//! The outward analysis record: resolve a query, fetch a quote, derive alerts.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::{FetchAttempt, ProviderChainBuilder};
use crate::config::{AlertConfig, TickwiseConfig};
use crate::http_client::HttpClient;
use crate::orchestrator::QuoteFetcher;
use crate::resolver::SymbolResolver;
use crate::search::YahooSearchClient;
use crate::{round2, ProviderId, Quote, ResolveError, Symbol, ValidationError};

/// Marker attached to an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Profit,
    Loss,
    Error,
}

/// Buy zone just around the session low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub lower: f64,
    pub upper: f64,
}

impl EntryZone {
    /// Needs both ends of the day range; the zone itself hangs off the low.
    pub fn from_range(low: Option<f64>, high: Option<f64>) -> Option<Self> {
        let low = low?;
        high?;
        Some(Self {
            lower: round2(low * 0.99),
            upper: round2(low * 1.02),
        })
    }
}

/// Price alerts against an entry price.
pub fn price_alerts(price: f64, entry_price: Option<f64>, thresholds: &AlertConfig) -> Vec<Alert> {
    let Some(entry) = entry_price.filter(|entry| entry.is_finite() && *entry > 0.0) else {
        return Vec::new();
    };

    let mut alerts = Vec::new();
    if price > entry * (1.0 + thresholds.profit_threshold_pct / 100.0) {
        alerts.push(Alert::Profit);
    }
    if price < entry * (1.0 - thresholds.loss_threshold_pct / 100.0) {
        alerts.push(Alert::Loss);
    }
    alerts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub query: String,
    pub candidate: String,
    pub symbol: Symbol,
    pub price: f64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: f64,
    pub change_percent: f64,
    pub source: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    pub alerts: Vec<Alert>,
    pub suggested_entry: Option<EntryZone>,
    pub attempts: Vec<FetchAttempt>,
}

impl AnalysisRecord {
    fn new(
        query: &str,
        candidate: String,
        quote: Quote,
        entry_price: Option<f64>,
        thresholds: &AlertConfig,
        attempts: Vec<FetchAttempt>,
    ) -> Self {
        Self {
            query: query.to_owned(),
            candidate,
            alerts: price_alerts(quote.price, entry_price, thresholds),
            suggested_entry: EntryZone::from_range(quote.low, quote.high),
            symbol: quote.symbol,
            price: quote.price,
            low: quote.low,
            high: quote.high,
            volume: quote.volume,
            avg_volume: quote.avg_volume,
            change_percent: quote.change_percent,
            source: quote.source,
            entry_price,
            attempts,
        }
    }
}

/// A failed analysis. Has no `price`; `alerts` is always `["error"]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    pub error: String,
    pub code: &'static str,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<FetchAttempt>,
}

impl AnalysisFailure {
    fn new(
        query: &str,
        candidate: Option<String>,
        error: &ResolveError,
        attempts: Vec<FetchAttempt>,
    ) -> Self {
        Self {
            query: query.to_owned(),
            candidate,
            error: error.to_string(),
            code: error.code(),
            alerts: vec![Alert::Error],
            attempts,
        }
    }
}

/// Either a populated record or an explicit failure; serializes flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Success(AnalysisRecord),
    Failure(AnalysisFailure),
}

impl AnalysisReport {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Self::Success(record) => Some(record.price),
            Self::Failure(_) => None,
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        match self {
            Self::Success(record) => &record.alerts,
            Self::Failure(failure) => &failure.alerts,
        }
    }

    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            Self::Success(record) => &record.attempts,
            Self::Failure(failure) => &failure.attempts,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(&failure.error),
        }
    }
}

/// Full pipeline behind one function call. Never returns an error: every
/// outcome becomes an [`AnalysisReport`].
#[derive(Clone)]
pub struct Analyzer {
    resolver: SymbolResolver,
    fetcher: QuoteFetcher,
    thresholds: AlertConfig,
}

impl Analyzer {
    pub fn new(resolver: SymbolResolver, fetcher: QuoteFetcher, thresholds: AlertConfig) -> Self {
        Self {
            resolver,
            fetcher,
            thresholds,
        }
    }

    /// Default wiring: Yahoo search (when enabled) and the default provider chain,
    /// all sharing `http_client`.
    pub fn from_config(config: &TickwiseConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let mut resolver = SymbolResolver::from_config(config);
        if config.search.enabled {
            resolver = resolver.with_search(Arc::new(YahooSearchClient::new(
                Arc::clone(&http_client),
                config,
            )));
        }

        let chain = ProviderChainBuilder::new(config.clone())
            .with_http_client(http_client)
            .build();
        Self::new(
            resolver,
            QuoteFetcher::new(Arc::new(chain)),
            config.alerts,
        )
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &QuoteFetcher {
        &self.fetcher
    }

    pub async fn analyze(&self, text: &str, entry_price: Option<f64>) -> AnalysisReport {
        let resolution = match self.resolver.resolve(text).await {
            Ok(resolution) => resolution,
            Err(error) => {
                warn!(query = text, code = error.code(), "query did not resolve to a symbol");
                return AnalysisReport::Failure(AnalysisFailure::new(text, None, &error, Vec::new()));
            }
        };

        let mut report = self.fetcher.fetch_quote(&resolution.variants).await;
        let attempts = std::mem::take(&mut report.attempts);
        match report.into_quote(&resolution.variants) {
            Ok(quote) => AnalysisReport::Success(AnalysisRecord::new(
                text,
                resolution.candidate,
                quote,
                entry_price,
                &self.thresholds,
                attempts,
            )),
            Err(error) => {
                warn!(
                    query = text,
                    candidate = %resolution.candidate,
                    attempts = attempts.len(),
                    "no provider returned price data"
                );
                AnalysisReport::Failure(AnalysisFailure::new(
                    text,
                    Some(resolution.candidate),
                    &error,
                    attempts,
                ))
            }
        }
    }
}

/// One purchase: `PRICE@QUANTITY` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub price: f64,
    pub quantity: f64,
}

impl Lot {
    pub fn new(price: f64, quantity: f64) -> Result<Self, ValidationError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ValidationError::NonFiniteValue { field: "quantity" });
        }
        Ok(Self { price, quantity })
    }
}

impl FromStr for Lot {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidLot {
            value: value.to_owned(),
        };
        let (price, quantity) = value.trim().split_once('@').ok_or_else(invalid)?;
        let price = price.trim().parse::<f64>().map_err(|_| invalid())?;
        let quantity = quantity.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::new(price, quantity).map_err(|_| invalid())
    }
}

/// Aggregate of several lots in one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub quantity: f64,
    pub average_entry: f64,
}

impl Position {
    /// Quantity-weighted average entry; `None` without lots.
    pub fn aggregate(lots: &[Lot]) -> Option<Self> {
        let quantity: f64 = lots.iter().map(|lot| lot.quantity).sum();
        if quantity <= 0.0 {
            return None;
        }
        let cost: f64 = lots.iter().map(|lot| lot.price * lot.quantity).sum();
        Some(Self {
            quantity,
            average_entry: round2(cost / quantity),
        })
    }
}

/// Something worth notifying about between two analyses of the same symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    PercentMove { from: f64, to: f64 },
    NewAlert { alert: Alert },
}

/// Minimum swing in `change_percent`, in points, that counts as a move.
pub const CHANGE_PERCENT_THRESHOLD: f64 = 1.0;

pub fn detect_changes(previous: &AnalysisRecord, current: &AnalysisRecord) -> Vec<Change> {
    let mut changes = Vec::new();

    let delta = (current.change_percent - previous.change_percent).abs();
    if round2(delta) >= CHANGE_PERCENT_THRESHOLD {
        changes.push(Change::PercentMove {
            from: previous.change_percent,
            to: current.change_percent,
        });
    }

    changes.extend(
        current
            .alerts
            .iter()
            .filter(|alert| !previous.alerts.contains(alert))
            .map(|alert| Change::NewAlert { alert: *alert }),
    );
    changes
}
