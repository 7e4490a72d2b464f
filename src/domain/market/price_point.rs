use crate::domain::errors::HistoryError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

/// Bars ordered oldest first. Produced by the quote collaborator, only read here.
pub type History = [PricePoint];

impl PricePoint {
    pub fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    // f64 boundary for the indicator math. Unrepresentable values become NaN
    // and are rejected by the finiteness checks downstream.
    pub fn open_f64(&self) -> f64 {
        self.open.to_f64().unwrap_or(f64::NAN)
    }

    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or(f64::NAN)
    }

    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or(f64::NAN)
    }

    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(f64::NAN)
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Closing prices of `history` as f64, oldest first.
pub fn closes(history: &History) -> Vec<f64> {
    history.iter().map(PricePoint::close_f64).collect()
}

/// Checks the ordering and sanity guarantees a History is supposed to carry:
/// strictly increasing timestamps and a low that does not exceed the high.
pub fn validate_history(history: &History) -> Result<(), HistoryError> {
    for (index, bar) in history.iter().enumerate() {
        if bar.low > bar.high {
            return Err(HistoryError::InvertedRange { index });
        }
        if index > 0 && bar.timestamp <= history[index - 1].timestamp {
            return Err(HistoryError::NotChronological {
                index,
                timestamp: bar.timestamp,
            });
        }
    }
    Ok(())
}
