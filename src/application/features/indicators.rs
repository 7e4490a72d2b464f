//! Trailing-window indicator math over f64 series
//!
//! Every function describes the window that ends at the last element of the
//! series. `None` means the series is too short for the window.

use crate::domain::market::PricePoint;
use statrs::statistics::{Data, Distribution};

/// Trailing `period` slice of `values`.
fn tail(values: &[f64], period: usize) -> Option<&[f64]> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(&values[values.len() - period..])
}

/// Simple moving average over the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    let window = tail(values, period)?;
    Data::new(window.to_vec()).mean()
}

/// Sample standard deviation (n - 1) over the last `period` values
pub fn std_dev(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let window = tail(values, period)?;
    Data::new(window.to_vec()).std_dev()
}

/// Relative change between the last value and the one `lag` bars before it.
pub fn pct_change(values: &[f64], lag: usize) -> Option<f64> {
    if lag == 0 || values.len() <= lag {
        return None;
    }
    let last = values[values.len() - 1];
    let base = values[values.len() - 1 - lag];
    Some(last / base - 1.0)
}

/// Simple returns `v[i] / v[i-1] - 1` for the whole series (one shorter than the input)
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// RSI-style oscillator using plain averages of gains and losses over
/// `period` deltas: `100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// A zero average loss maps to 100.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let window = tail(values, period + 1)?;

    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// True range of `bar` given the previous close
pub fn true_range(bar: &PricePoint, prev_close: f64) -> f64 {
    let high = bar.high_f64();
    let low = bar.low_f64();
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// Average true range over the last `period` bars (needs `period + 1` bars)
pub fn average_true_range(bars: &[PricePoint], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let start = bars.len() - period;
    let sum: f64 = (start..bars.len())
        .map(|i| true_range(&bars[i], bars[i - 1].close_f64()))
        .sum();
    Some(sum / period as f64)
}

/// Least-squares line through `values` indexed 0..n.
///
/// Returns `(slope, intercept)`, or `None` for fewer than two points.
pub fn linear_fit(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}
