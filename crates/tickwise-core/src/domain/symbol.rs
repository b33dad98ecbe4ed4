use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 32;

/// Normalized market symbol, optionally carrying an exchange or quote-currency suffix.
///
/// Digits may lead (`500325.BO`), and `&` is kept for tickers such as `M&M.NS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '&' | '^' | '=');
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the symbol ends with `suffix`, compared case-insensitively.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        let suffix = suffix.to_ascii_uppercase();
        self.0.len() > suffix.len() && self.0.ends_with(&suffix)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" sbin.ns ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "SBIN.NS");
    }

    #[test]
    fn accepts_numeric_codes_and_ampersand() {
        assert!(Symbol::parse("500325.BO").is_ok());
        assert!(Symbol::parse("M&M.NS").is_ok());
        assert!(Symbol::parse("BTC-USD").is_ok());
    }

    #[test]
    fn rejects_whitespace_inside_symbol() {
        let err = Symbol::parse("SB IN").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolInvalidChar { ch: ' ', index: 2 });
    }

    #[test]
    fn rejects_overlong_symbol() {
        let err = Symbol::parse(&"A".repeat(33)).expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolTooLong { len: 33, .. }));
    }

    #[test]
    fn suffix_check_requires_a_base() {
        let symbol = Symbol::parse("SBIN.NS").expect("valid");
        assert!(symbol.has_suffix(".ns"));
        assert!(!Symbol::parse(".NS").expect("valid").has_suffix(".NS"));
    }
}
