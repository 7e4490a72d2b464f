use super::indicators::{average_true_range, pct_change, rsi, simple_returns, sma, std_dev};
use crate::domain::errors::FeatureError;
use crate::domain::features::{FEATURE_NAMES, FeatureVector};
use crate::domain::market::{History, PricePoint, closes};
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, MovingAverageConvergenceDivergence};

/// Indicator windows used by the deriver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub sma_short: usize,
    pub sma_mid: usize,
    pub sma_long: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub volatility_window: usize,
    pub atr_period: usize,
    pub volume_window: usize,
    pub volume_trend_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sma_short: 5,
            sma_mid: 10,
            sma_long: 20,
            ema_fast: 9,
            ema_slow: 21,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            volatility_window: 20,
            atr_period: 14,
            volume_window: 20,
            volume_trend_window: 5,
        }
    }
}

// Longest momentum lookback in the vector (momentum_10).
const MAX_MOMENTUM_LAG: usize = 10;

impl FeatureConfig {
    /// Fewest bars for which every non-optional feature is defined.
    pub fn min_history(&self) -> usize {
        [
            self.sma_short,
            self.sma_mid,
            self.sma_long,
            self.bb_period,
            self.rsi_period + 1,
            self.atr_period + 1,
            self.volatility_window + 1,
            MAX_MOMENTUM_LAG + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Turns a raw OHLCV history into a `FeatureVector` describing its last bar.
#[derive(Debug, Clone, Default)]
pub struct FeatureDeriver {
    config: FeatureConfig,
}

impl FeatureDeriver {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn min_history(&self) -> usize {
        self.config.min_history()
    }

    /// Derive the snapshot, or `InsufficientData` when the history is shorter
    /// than the longest window. Never returns partially filled features.
    pub fn derive(&self, history: &History) -> Result<FeatureVector, FeatureError> {
        let required = self.min_history();
        if history.len() < required {
            return Err(FeatureError::InsufficientData {
                required,
                available: history.len(),
            });
        }

        let cfg = &self.config;
        let series = closes(history);
        if series.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(FeatureError::NonFinite { feature: "close" });
        }

        let last = &history[history.len() - 1];
        let close = series[series.len() - 1];
        let prev_close = series[series.len() - 2];

        let sma_5 = window(sma(&series, cfg.sma_short), "sma", cfg.sma_short)?;
        let sma_10 = window(sma(&series, cfg.sma_mid), "sma", cfg.sma_mid)?;
        let sma_20 = window(sma(&series, cfg.sma_long), "sma", cfg.sma_long)?;

        let ema_9 = ema(&series, cfg.ema_fast)?;
        let ema_21 = ema(&series, cfg.ema_slow)?;
        let (macd, macd_signal, macd_diff) = macd(&series, cfg)?;

        let rsi = window(rsi(&series, cfg.rsi_period), "rsi", cfg.rsi_period)?;

        let bb_middle = window(sma(&series, cfg.bb_period), "bollinger", cfg.bb_period)?;
        let bb_sd = window(std_dev(&series, cfg.bb_period), "bollinger", cfg.bb_period)?;
        let bb_upper = bb_middle + cfg.bb_std_dev * bb_sd;
        let bb_lower = bb_middle - cfg.bb_std_dev * bb_sd;
        let bb_width = bb_upper - bb_lower;
        // Zero-width bands leave the position undefined rather than dividing by zero
        let bb_position = (bb_width > 0.0).then(|| (close - bb_lower) / bb_width);

        let returns = simple_returns(&series);
        let volatility = window(
            std_dev(&returns, cfg.volatility_window),
            "volatility",
            cfg.volatility_window,
        )?;
        let atr = window(
            average_true_range(history, cfg.atr_period),
            "atr",
            cfg.atr_period,
        )?;

        let (volume_ratio, volume_trend) = self.volume_terms(history);

        let features = FeatureVector {
            returns: close / prev_close - 1.0,
            log_returns: (close / prev_close).ln(),
            sma_5,
            sma_10,
            sma_20,
            ema_9,
            ema_21,
            rsi,
            macd,
            macd_signal,
            macd_diff,
            bb_upper,
            bb_middle,
            bb_lower,
            bb_position,
            bb_width,
            volatility,
            atr,
            high_low_ratio: last.high_f64() / last.low_f64(),
            close_open_ratio: close / last.open_f64(),
            momentum_3: window(pct_change(&series, 3), "momentum", 3)?,
            momentum_5: window(pct_change(&series, 5), "momentum", 5)?,
            momentum_10: window(
                pct_change(&series, MAX_MOMENTUM_LAG),
                "momentum",
                MAX_MOMENTUM_LAG,
            )?,
            volume_ratio,
            volume_trend,
        };

        ensure_finite(&features)?;
        Ok(features)
    }

    /// Volume ratio and trend, only when the feed carries volume.
    fn volume_terms(&self, history: &History) -> (Option<f64>, Option<f64>) {
        let volumes: Vec<f64> = history.iter().map(PricePoint::volume_f64).collect();
        let Some(avg) = sma(&volumes, self.config.volume_window) else {
            return (None, None);
        };
        if !avg.is_finite() || avg <= 0.0 {
            return (None, None);
        }

        let last = volumes[volumes.len() - 1];
        let ratio = last / avg;
        let trend = sma(&volumes, self.config.volume_trend_window).map(|short| short / avg);
        (Some(ratio), trend)
    }
}

/// Once the length check passed, an unfilled window can only come from a
/// zero or otherwise unusable period in the configuration.
fn window(
    value: Option<f64>,
    indicator: &'static str,
    period: usize,
) -> Result<f64, FeatureError> {
    value.ok_or(FeatureError::InvalidWindow { indicator, period })
}

fn ema(values: &[f64], period: usize) -> Result<f64, FeatureError> {
    let mut indicator = ExponentialMovingAverage::new(period).map_err(|_| {
        FeatureError::InvalidWindow {
            indicator: "ema",
            period,
        }
    })?;
    Ok(values.iter().fold(0.0, |_, v| indicator.next(*v)))
}

fn macd(values: &[f64], cfg: &FeatureConfig) -> Result<(f64, f64, f64), FeatureError> {
    let mut indicator =
        MovingAverageConvergenceDivergence::new(cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)
            .map_err(|_| FeatureError::InvalidWindow {
                indicator: "macd",
                period: cfg.macd_slow,
            })?;

    let mut out = (0.0, 0.0, 0.0);
    for v in values {
        let step = indicator.next(*v);
        out = (step.macd, step.signal, step.histogram);
    }
    Ok(out)
}

fn ensure_finite(features: &FeatureVector) -> Result<(), FeatureError> {
    match features
        .to_vec()
        .iter()
        .zip(FEATURE_NAMES)
        .find(|(value, _)| !value.is_finite())
    {
        Some((_, name)) => Err(FeatureError::NonFinite { feature: *name }),
        None => Ok(()),
    }
}
