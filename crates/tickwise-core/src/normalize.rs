//! Expansion of a base ticker into the ordered exchange and quote-currency variants to try.

use std::collections::HashSet;

use tracing::debug;

use crate::config::{SuffixConfig, TickwiseConfig};
use crate::{ResolveError, Symbol};

const MAX_BASE_LEN: usize = 20;

/// Builds variant lists: home market, alternate home market, bare, foreign, crypto.
#[derive(Debug, Clone)]
pub struct SymbolNormalizer {
    suffixes: SuffixConfig,
    command_words: HashSet<String>,
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        Self::from_config(&TickwiseConfig::default())
    }
}

impl SymbolNormalizer {
    pub fn new(suffixes: SuffixConfig, command_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            suffixes,
            command_words: command_words
                .into_iter()
                .map(|word| word.trim().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn from_config(config: &TickwiseConfig) -> Self {
        Self::new(config.suffixes.clone(), config.command_words.iter().cloned())
    }

    /// Returns the ordered variants for `raw`. An already-qualified symbol comes back
    /// alone and unchanged.
    pub fn normalize(&self, raw: &str) -> Result<Vec<Symbol>, ResolveError> {
        let invalid = || ResolveError::InvalidSymbol {
            input: raw.to_owned(),
        };

        let cleaned = self.strip_command_words(raw).ok_or_else(invalid)?;

        if self.is_qualified(&cleaned) {
            if let Ok(symbol) = Symbol::parse(&cleaned) {
                debug!(symbol = %symbol, "symbol already carries a recognized suffix");
                return Ok(vec![symbol]);
            }
        }

        let base: String = cleaned
            .chars()
            .skip_while(|ch| !is_base_char(*ch))
            .take_while(|ch| is_base_char(*ch))
            .collect();
        if base.is_empty() || base.len() > MAX_BASE_LEN {
            return Err(invalid());
        }

        let suffixes = [
            self.suffixes.domestic.as_str(),
            self.suffixes.secondary_domestic.as_str(),
            "",
        ]
        .into_iter()
        .chain(self.suffixes.foreign.iter().map(String::as_str))
        .chain(self.suffixes.crypto.iter().map(String::as_str));

        let mut seen = HashSet::new();
        let variants: Vec<Symbol> = suffixes
            .filter_map(|suffix| Symbol::parse(&format!("{base}{suffix}")).ok())
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect();

        if variants.is_empty() {
            return Err(invalid());
        }
        debug!(base = %base, count = variants.len(), "expanded symbol variants");
        Ok(variants)
    }

    /// True when `symbol` ends with any recognized exchange or quote-currency suffix.
    pub fn is_qualified(&self, symbol: &str) -> bool {
        let upper = symbol.to_ascii_uppercase();
        self.suffixes.recognized().any(|suffix| {
            let suffix = suffix.to_ascii_uppercase();
            upper.len() > suffix.len() && upper.ends_with(&suffix)
        })
    }

    /// First token that is not a command word. A ticker that spells a command word
    /// (`SHOW` alone) is kept as is.
    fn strip_command_words(&self, raw: &str) -> Option<String> {
        let mut tokens = raw
            .split(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '&' | '.' | '-' | '^' | '=')))
            .map(|token| token.trim_matches(|ch| matches!(ch, '.' | '-')))
            .filter(|token| !token.is_empty())
            .map(str::to_ascii_uppercase)
            .peekable();
        let first = tokens.peek().cloned()?;
        Some(
            tokens
                .find(|token| !self.command_words.contains(token))
                .unwrap_or(first),
        )
    }
}

fn is_base_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '&'
}

/// Convenience wrapper over the default normalizer.
pub fn normalize(raw: &str) -> Result<Vec<Symbol>, ResolveError> {
    SymbolNormalizer::default().normalize(raw)
}
