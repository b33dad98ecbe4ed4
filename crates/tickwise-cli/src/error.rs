use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickwise_core::ValidationError),

    #[error("{message}")]
    InvalidSymbol { message: String },

    #[error("{message}")]
    NoData { message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::InvalidSymbol { .. } => 2,
            Self::NoData { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Config(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

impl From<tickwise_core::ResolveError> for CliError {
    fn from(error: tickwise_core::ResolveError) -> Self {
        match error {
            tickwise_core::ResolveError::InvalidSymbol { input } => Self::InvalidSymbol {
                message: format!("Invalid symbol: '{input}'"),
            },
            tickwise_core::ResolveError::NoDataFound { symbol } => Self::NoData {
                message: format!("No price data found for '{symbol}'"),
            },
        }
    }
}

impl From<tickwise_core::CoreError> for CliError {
    fn from(error: tickwise_core::CoreError) -> Self {
        match error {
            tickwise_core::CoreError::Validation(error) => Self::Validation(error),
            tickwise_core::CoreError::Resolve(error) => error.into(),
            tickwise_core::CoreError::Serialization(error) => Self::Config(error.to_string()),
            tickwise_core::CoreError::Io(error) => Self::Io(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_map_to_distinct_exit_codes() {
        let invalid: CliError = tickwise_core::ResolveError::InvalidSymbol {
            input: String::from("???"),
        }
        .into();
        let missing: CliError = tickwise_core::ResolveError::NoDataFound {
            symbol: String::from("ZZZZ.NS"),
        }
        .into();

        assert_eq!(invalid.exit_code(), 2);
        assert_eq!(missing.exit_code(), 3);
    }

    #[test]
    fn unreadable_config_file_is_a_config_error() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").expect_err("bad json");
        let error: CliError = tickwise_core::CoreError::Serialization(parse_error).into();
        assert_eq!(error.exit_code(), 5);
    }
}
