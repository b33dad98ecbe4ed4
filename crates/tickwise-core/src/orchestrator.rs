//! Variant-by-variant quote lookup: the first variant that yields a quote wins.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::chain::{FetchAttempt, ProviderChain};
use crate::{Quote, ResolveError, Symbol};

/// Lifecycle of one [`QuoteFetcher::fetch_quote`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Pending,
    /// Zero-based index into the variant list.
    TryingVariant(usize),
    Success,
    Exhausted,
}

impl FetchState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Exhausted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchReport {
    pub quote: Option<Quote>,
    pub attempts: Vec<FetchAttempt>,
    pub state: FetchState,
}

impl FetchReport {
    /// The quote, or `NoDataFound` naming the first variant tried.
    pub fn into_quote(self, variants: &[Symbol]) -> Result<Quote, ResolveError> {
        self.quote.ok_or_else(|| ResolveError::NoDataFound {
            symbol: variants
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })
    }
}

/// Walks a variant list against the provider chain. Never retries: transient
/// failures are the providers' business.
#[derive(Clone)]
pub struct QuoteFetcher {
    chain: Arc<ProviderChain>,
}

impl QuoteFetcher {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub async fn fetch_quote(&self, variants: &[Symbol]) -> FetchReport {
        let mut state = FetchState::Pending;
        let mut attempts = Vec::new();

        for (index, variant) in variants.iter().enumerate() {
            state = transition(state, FetchState::TryingVariant(index));

            if let Some(quote) = self.chain.fetch_from_providers(variant, &mut attempts).await {
                state = transition(state, FetchState::Success);
                info!(
                    symbol = %quote.symbol,
                    source = %quote.source,
                    variant_index = index,
                    "quote resolved"
                );
                return FetchReport {
                    quote: Some(quote),
                    attempts,
                    state,
                };
            }

            debug!(symbol = %variant, variant_index = index, "variant exhausted every provider");
        }

        state = transition(state, FetchState::Exhausted);
        info!(variants = variants.len(), attempts = attempts.len(), "no variant produced a quote");
        FetchReport {
            quote: None,
            attempts,
            state,
        }
    }
}

fn transition(from: FetchState, to: FetchState) -> FetchState {
    debug!(from = ?from, to = ?to, "fetch state transition");
    to
}
