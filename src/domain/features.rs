use serde::{Deserialize, Serialize};

/// Indicator snapshot at the most recent bar of a history.
///
/// Never mutated after derivation. `bb_position` is `None` when the band
/// width is zero; the volume terms are `None` when the feed carries no volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub returns: f64,
    pub log_returns: f64,
    pub sma_5: f64,
    pub sma_10: f64,
    pub sma_20: f64,
    pub ema_9: f64,
    pub ema_21: f64,
    /// RSI-style oscillator, 0-100
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_diff: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub bb_position: Option<f64>,
    pub bb_width: f64,
    /// Std dev of the trailing simple returns
    pub volatility: f64,
    pub atr: f64,
    pub high_low_ratio: f64,
    pub close_open_ratio: f64,
    pub momentum_3: f64,
    pub momentum_5: f64,
    pub momentum_10: f64,
    pub volume_ratio: Option<f64>,
    pub volume_trend: Option<f64>,
}

/// Ordered list of feature names.
/// This order MUST match `FeatureVector::to_vec`. Estimators trained on the
/// flat vector depend on it.
pub const FEATURE_NAMES: &[&str] = &[
    "returns",
    "log_returns",
    "sma_5",
    "sma_10",
    "sma_20",
    "ema_9",
    "ema_21",
    "rsi",
    "macd",
    "macd_signal",
    "macd_diff",
    "bb_position",
    "bb_width",
    "volatility",
    "atr",
    "high_low_ratio",
    "close_open_ratio",
    "momentum_3",
    "momentum_5",
    "momentum_10",
    "volume_ratio",
    "volume_trend",
];

impl FeatureVector {
    /// Flattens the snapshot in `FEATURE_NAMES` order.
    /// Missing values fall back to neutral defaults: mid-band for the band
    /// position and 1.0 (average) for the volume terms.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.returns,
            self.log_returns,
            self.sma_5,
            self.sma_10,
            self.sma_20,
            self.ema_9,
            self.ema_21,
            self.rsi,
            self.macd,
            self.macd_signal,
            self.macd_diff,
            self.bb_position.unwrap_or(0.5),
            self.bb_width,
            self.volatility,
            self.atr,
            self.high_low_ratio,
            self.close_open_ratio,
            self.momentum_3,
            self.momentum_5,
            self.momentum_10,
            self.volume_ratio.unwrap_or(1.0),
            self.volume_trend.unwrap_or(1.0),
        ]
    }

    /// Look up a feature by its registry name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.to_vec()[idx])
    }

    pub fn has_volume(&self) -> bool {
        self.volume_ratio.is_some()
    }
}
