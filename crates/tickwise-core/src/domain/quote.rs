use serde::{Deserialize, Serialize};

use crate::{ProviderId, Symbol, UtcDateTime, ValidationError};

/// Rounds to two decimal places, the precision used for every percentage and price band.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One OHLCV bar as returned by a history provider. Any field may be missing on
/// holidays or partially traded sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub ts: Option<UtcDateTime>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// Price and volume snapshot for one symbol at fetch time.
///
/// `avg_volume` is never null: `0.0` stands for "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: f64,
    pub change_percent: f64,
    pub source: ProviderId,
}

impl Quote {
    pub fn new(symbol: Symbol, price: f64, source: ProviderId) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }

        Ok(Self {
            symbol,
            price,
            low: None,
            high: None,
            volume: None,
            avg_volume: 0.0,
            change_percent: 0.0,
            source,
        })
    }

    pub fn with_range(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.low = low.filter(|value| value.is_finite());
        self.high = high.filter(|value| value.is_finite());
        self
    }

    pub fn with_volume(mut self, volume: Option<u64>, avg_volume: Option<f64>) -> Self {
        self.volume = volume;
        self.avg_volume = avg_volume.filter(|value| value.is_finite()).unwrap_or(0.0);
        self
    }

    pub fn with_change_percent(mut self, change_percent: Option<f64>) -> Self {
        self.change_percent = change_percent
            .filter(|value| value.is_finite())
            .map(round2)
            .unwrap_or(0.0);
        self
    }

    /// Builds a quote from history rows ordered oldest first.
    ///
    /// The newest row with a close is used; `avg_volume` averages the non-null
    /// volumes of the `avg_volume_window` rows ending at that row.
    pub fn from_rows(
        symbol: Symbol,
        rows: &[OhlcvRow],
        avg_volume_window: usize,
        source: ProviderId,
    ) -> Option<Self> {
        let index = rows
            .iter()
            .rposition(|row| row.close.is_some_and(f64::is_finite))?;
        let row = rows[index];
        let close = row.close?;

        let window = avg_volume_window.max(1).min(index + 1);
        let volumes: Vec<u64> = rows[index + 1 - window..=index]
            .iter()
            .filter_map(|row| row.volume)
            .collect();
        let avg_volume = if volumes.is_empty() {
            0.0
        } else {
            volumes.iter().map(|value| *value as f64).sum::<f64>() / volumes.len() as f64
        };

        let change_percent = row
            .open
            .filter(|open| open.is_finite() && *open > 0.0)
            .map(|open| (close - open) / open * 100.0);

        let quote = Self::new(symbol, close, source)
            .ok()?
            .with_range(row.low, row.high)
            .with_volume(Some(row.volume.unwrap_or(0)), Some(avg_volume))
            .with_change_percent(change_percent);
        Some(quote)
    }
}
