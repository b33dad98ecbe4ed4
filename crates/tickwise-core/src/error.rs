use thiserror::Error;

/// Validation and contract errors exposed by `tickwise-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 1h, 1d, 1wk")]
    InvalidInterval { value: String },
    #[error("invalid provider '{value}', expected one of yahoo_chart, yahoo_quote, alphavantage")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("invalid lot '{value}', expected PRICE@QUANTITY")]
    InvalidLot { value: String },

    #[error("config field '{field}' is invalid: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

/// Terminal outcomes of resolving free text into a quote.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid symbol")]
    InvalidSymbol { input: String },

    #[error("No price data found")]
    NoDataFound { symbol: String },
}

impl ResolveError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSymbol { .. } => "resolve.invalid_symbol",
            Self::NoDataFound { .. } => "resolve.no_data_found",
        }
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_render_user_facing_messages() {
        let no_data = ResolveError::NoDataFound {
            symbol: String::from("SBIN"),
        };
        assert_eq!(no_data.to_string(), "No price data found");
        assert_eq!(no_data.code(), "resolve.no_data_found");

        let invalid = ResolveError::InvalidSymbol {
            input: String::from("???"),
        };
        assert_eq!(invalid.to_string(), "Invalid symbol");
    }

    #[test]
    fn core_error_wraps_validation_error() {
        let error: CoreError = ValidationError::EmptySymbol.into();
        assert!(matches!(error, CoreError::Validation(ValidationError::EmptySymbol)));
    }
}
