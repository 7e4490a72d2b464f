use super::Evaluate;
use super::estimator::{LinearTrendEstimator, PriceEstimator};
use crate::application::features::FeatureDeriver;
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, Timeframe, closes};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

const NAME: &str = "TrendAgent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    /// Estimate must exceed `price * (1 + band)` for BUY, fall below `price * (1 - band)` for SELL
    pub band: f64,
    pub confidence_scale: f64,
    pub confidence_cap: f64,
    pub hold_confidence: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            band: 0.001,
            confidence_scale: 10_000.0,
            confidence_cap: 95.0,
            hold_confidence: 50.0,
        }
    }
}

/// Compares a next-price estimate against the current price.
#[derive(Clone)]
pub struct TrendAgent {
    deriver: FeatureDeriver,
    estimator: Arc<dyn PriceEstimator>,
    params: TrendParams,
}

impl TrendAgent {
    pub fn new(
        deriver: FeatureDeriver,
        estimator: Arc<dyn PriceEstimator>,
        params: TrendParams,
    ) -> Self {
        Self {
            deriver,
            estimator,
            params,
        }
    }

    pub fn with_estimator(estimator: Arc<dyn PriceEstimator>) -> Self {
        Self::new(FeatureDeriver::default(), estimator, TrendParams::default())
    }
}

impl Default for TrendAgent {
    fn default() -> Self {
        Self::with_estimator(Arc::new(LinearTrendEstimator::default()))
    }
}

impl fmt::Debug for TrendAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrendAgent")
            .field("estimator", &self.estimator.name())
            .field("params", &self.params)
            .finish()
    }
}

impl Evaluate for TrendAgent {
    fn min_history(&self) -> usize {
        self.deriver.min_history()
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let features = self.deriver.derive(history)?;
        let estimate = self
            .estimator
            .estimate_next(&features, &closes(history))
            .map_err(|reason| AgentError::Estimator {
                agent: NAME,
                reason,
            })?;
        if !estimate.is_finite() {
            return Err(AgentError::NonFinite {
                agent: NAME,
                what: "price estimate",
            });
        }

        let p = &self.params;
        let confidence = ((estimate - current_price).abs() / current_price * p.confidence_scale)
            .min(p.confidence_cap);

        let opinion = if estimate > current_price * (1.0 + p.band) {
            Opinion::buy(NAME, timeframe, confidence)
        } else if estimate < current_price * (1.0 - p.band) {
            Opinion::sell(NAME, timeframe, confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        };

        Ok(opinion
            .with_diagnostic("predicted_price", json!(estimate))
            .with_diagnostic("estimator", json!(self.estimator.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::history_from_closes;
    use crate::domain::consensus::Direction;
    use crate::domain::features::FeatureVector;
    use crate::domain::market::PricePoint;

    struct Fixed(f64);

    impl PriceEstimator for Fixed {
        fn estimate_next(&self, _: &FeatureVector, _: &[f64]) -> Result<f64, String> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl PriceEstimator for Broken {
        fn estimate_next(&self, _: &FeatureVector, _: &[f64]) -> Result<f64, String> {
            Err("model not fitted".to_string())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn flat() -> Vec<PricePoint> {
        history_from_closes(&[1.1; 30])
    }

    #[test]
    fn test_buy_when_estimate_above_band() {
        let agent = TrendAgent::with_estimator(Arc::new(Fixed(1.1033)));
        let opinion = agent.evaluate(Timeframe::M1, 1.1, &flat()).unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
        // |1.1033 - 1.1| / 1.1 * 10000 = 30
        assert!((opinion.confidence - 30.0).abs() < 1e-6);
        assert_eq!(opinion.diagnostic("estimator"), Some(&json!("fixed")));
    }

    #[test]
    fn test_sell_confidence_is_capped() {
        let agent = TrendAgent::with_estimator(Arc::new(Fixed(1.0)));
        let opinion = agent.evaluate(Timeframe::M1, 1.1, &flat()).unwrap();
        assert_eq!(opinion.direction, Direction::Sell);
        assert_eq!(opinion.confidence, 95.0);
    }

    #[test]
    fn test_hold_inside_band() {
        let agent = TrendAgent::with_estimator(Arc::new(Fixed(1.1005)));
        let opinion = agent.evaluate(Timeframe::M1, 1.1, &flat()).unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 50.0);
    }

    #[test]
    fn test_estimator_failure_is_an_error() {
        let agent = TrendAgent::with_estimator(Arc::new(Broken));
        let err = agent.evaluate(Timeframe::M1, 1.1, &flat()).unwrap_err();
        assert!(matches!(err, AgentError::Estimator { .. }));
        assert!(!err.is_insufficient_data());
    }

    #[test]
    fn test_non_finite_estimate_is_an_error() {
        let agent = TrendAgent::with_estimator(Arc::new(Fixed(f64::INFINITY)));
        assert!(matches!(
            agent.evaluate(Timeframe::M1, 1.1, &flat()),
            Err(AgentError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_default_estimator_follows_uptrend() {
        let closes: Vec<f64> = (0..30).map(|i| 1.1 + 0.002 * i as f64).collect();
        let history = history_from_closes(&closes);
        let opinion = TrendAgent::default()
            .evaluate(Timeframe::M1, closes[29], &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
    }
}
