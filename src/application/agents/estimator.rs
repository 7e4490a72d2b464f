use crate::application::features::indicators::linear_fit;
use crate::domain::features::{FEATURE_NAMES, FeatureVector};

/// Next-price estimator used by the trend agent.
///
/// Learned parameters are injected at construction; nothing is loaded or
/// trained at prediction time.
pub trait PriceEstimator: Send + Sync {
    /// Estimated close of the next bar. `closes` ends at the current bar.
    fn estimate_next(&self, features: &FeatureVector, closes: &[f64]) -> Result<f64, String>;

    fn name(&self) -> &str;
}

/// Least-squares line through the most recent closes, extrapolated one bar.
#[derive(Debug, Clone)]
pub struct LinearTrendEstimator {
    window: usize,
}

impl LinearTrendEstimator {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
        }
    }
}

impl Default for LinearTrendEstimator {
    fn default() -> Self {
        Self::new(20)
    }
}

impl PriceEstimator for LinearTrendEstimator {
    fn estimate_next(&self, _features: &FeatureVector, closes: &[f64]) -> Result<f64, String> {
        let start = closes.len().saturating_sub(self.window);
        let recent = &closes[start..];
        let (slope, intercept) = linear_fit(recent)
            .ok_or_else(|| format!("cannot fit a line through {} closes", recent.len()))?;
        Ok(intercept + slope * recent.len() as f64)
    }

    fn name(&self) -> &str {
        "linear_trend"
    }
}

/// Linear model over the flat feature vector predicting the next bar's
/// return: `r = intercept + Σ coef_i * x_i`, estimate = `close * (1 + r)`.
#[derive(Debug, Clone)]
pub struct FeatureModelEstimator {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl FeatureModelEstimator {
    /// `coefficients` follow `FEATURE_NAMES` order.
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Result<Self, String> {
        if coefficients.len() != FEATURE_NAMES.len() {
            return Err(format!(
                "expected {} coefficients, got {}",
                FEATURE_NAMES.len(),
                coefficients.len()
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err("model parameters must be finite".to_string());
        }
        Ok(Self {
            intercept,
            coefficients,
        })
    }
}

impl PriceEstimator for FeatureModelEstimator {
    fn estimate_next(&self, features: &FeatureVector, closes: &[f64]) -> Result<f64, String> {
        let last = closes.last().copied().ok_or("no closes")?;
        let predicted_return = self.intercept
            + features
                .to_vec()
                .iter()
                .zip(&self.coefficients)
                .map(|(x, c)| x * c)
                .sum::<f64>();
        Ok(last * (1.0 + predicted_return))
    }

    fn name(&self) -> &str {
        "feature_model"
    }
}
