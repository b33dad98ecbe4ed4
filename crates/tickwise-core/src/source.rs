use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in quotes, attempt logs, and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    YahooChart,
    YahooQuote,
    Alphavantage,
}

impl ProviderId {
    /// Default chain priority, primary first.
    pub const ALL: [Self; 3] = [Self::YahooChart, Self::YahooQuote, Self::Alphavantage];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YahooChart => "yahoo_chart",
            Self::YahooQuote => "yahoo_quote",
            Self::Alphavantage => "alphavantage",
        }
    }

    pub const fn requires_credentials(self) -> bool {
        matches!(self, Self::Alphavantage)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo_chart" | "yahoo-chart" => Ok(Self::YahooChart),
            "yahoo_quote" | "yahoo-quote" => Ok(Self::YahooQuote),
            "alphavantage" | "alpha_vantage" => Ok(Self::Alphavantage),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
