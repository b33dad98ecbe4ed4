//! Free text to ordered symbol variants: extract, search, normalize.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::TickwiseConfig;
use crate::extract::CandidateExtractor;
use crate::normalize::SymbolNormalizer;
use crate::search::SymbolSearch;
use crate::{ResolveError, Symbol};

/// Everything learned about a query before any price is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub query: String,
    pub candidate: String,
    /// Symbol picked by the search step, when it ran and found something.
    pub searched: Option<String>,
    pub variants: Vec<Symbol>,
}

/// Runs the resolution steps in order. Search is optional and its failures
/// only ever fall back to the raw candidate.
#[derive(Clone)]
pub struct SymbolResolver {
    extractor: CandidateExtractor,
    normalizer: SymbolNormalizer,
    search: Option<Arc<dyn SymbolSearch>>,
}

impl SymbolResolver {
    pub fn new(extractor: CandidateExtractor, normalizer: SymbolNormalizer) -> Self {
        Self {
            extractor,
            normalizer,
            search: None,
        }
    }

    pub fn from_config(config: &TickwiseConfig) -> Self {
        Self::new(
            CandidateExtractor::from_config(config),
            SymbolNormalizer::from_config(config),
        )
    }

    pub fn with_search(mut self, search: Arc<dyn SymbolSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn without_search(mut self) -> Self {
        self.search = None;
        self
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    pub async fn resolve(&self, text: &str) -> Result<Resolution, ResolveError> {
        let candidate = self
            .extractor
            .extract(text)
            .ok_or_else(|| ResolveError::InvalidSymbol {
                input: text.to_owned(),
            })?;

        // A candidate without a usable base is rejected before any network call.
        let own_variants = self.normalizer.normalize(&candidate)?;
        debug!(query = text, candidate = %candidate, "extracted candidate");

        let searched = match &self.search {
            Some(search) => search.search(&candidate).await,
            None => None,
        };

        let variants = match searched.as_deref() {
            Some(found) if !found.eq_ignore_ascii_case(&candidate) => {
                // The hit itself leads: index and share-class symbols (^NSEI, BRK-B)
                // lose their marker when expanded from a base.
                let exact: Vec<Symbol> = Symbol::parse(found).ok().into_iter().collect();
                match self.normalizer.normalize(found) {
                    Ok(found_variants) => merge(merge(exact, found_variants), own_variants),
                    Err(error) => {
                        debug!(searched = found, %error, "search result did not normalize");
                        merge(exact, own_variants)
                    }
                }
            }
            _ => own_variants,
        };

        info!(
            candidate = %candidate,
            searched = ?searched,
            variants = variants.len(),
            "resolved query"
        );
        Ok(Resolution {
            query: text.to_owned(),
            candidate,
            searched,
            variants,
        })
    }
}

/// `first` in order, then whatever `rest` adds.
fn merge(first: Vec<Symbol>, rest: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen: HashSet<Symbol> = first.iter().cloned().collect();
    let mut merged = first;
    merged.extend(rest.into_iter().filter(|symbol| seen.insert(symbol.clone())));
    merged
}
