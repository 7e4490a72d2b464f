use super::Evaluate;
use crate::application::features::FeatureDeriver;
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::json;

const NAME: &str = "MomentumAgent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub threshold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub confidence_scale: f64,
    pub confidence_cap: f64,
    pub hold_confidence: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            threshold: 0.002,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            confidence_scale: 10_000.0,
            confidence_cap: 90.0,
            hold_confidence: 40.0,
        }
    }
}

/// 5-bar momentum, filtered by the RSI so it does not chase exhausted moves.
#[derive(Debug, Clone, Default)]
pub struct MomentumAgent {
    deriver: FeatureDeriver,
    params: MomentumParams,
}

impl MomentumAgent {
    pub fn new(deriver: FeatureDeriver, params: MomentumParams) -> Self {
        Self { deriver, params }
    }
}

impl Evaluate for MomentumAgent {
    fn min_history(&self) -> usize {
        self.deriver.min_history()
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        _current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let features = self.deriver.derive(history)?;
        let momentum = features.momentum_5;
        let rsi = features.rsi;
        let p = &self.params;

        let confidence = (momentum.abs() * p.confidence_scale).min(p.confidence_cap);
        let opinion = if momentum > p.threshold && rsi < p.rsi_overbought {
            Opinion::buy(NAME, timeframe, confidence)
        } else if momentum < -p.threshold && rsi > p.rsi_oversold {
            Opinion::sell(NAME, timeframe, confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        };

        Ok(opinion
            .with_diagnostic("momentum", json!(momentum))
            .with_diagnostic("rsi", json!(rsi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::history_from_closes;
    use crate::domain::consensus::Direction;

    /// Sideways chop, then a push of `step` per bar over the last five bars.
    fn push(step: f64) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..25)
            .map(|i| if i % 2 == 0 { 1.1000 } else { 1.1010 })
            .collect();
        let base = closes[24];
        closes.extend((1..=5).map(|i| base + step * i as f64));
        closes
    }

    #[test]
    fn test_buy_on_positive_momentum() {
        let history = history_from_closes(&push(0.0006));
        let opinion = MomentumAgent::default()
            .evaluate(Timeframe::M1, 1.104, &history)
            .unwrap();
        let momentum = opinion.diagnostic("momentum").unwrap().as_f64().unwrap();
        let rsi = opinion.diagnostic("rsi").unwrap().as_f64().unwrap();
        assert!(momentum > 0.002, "momentum {}", momentum);
        assert!(rsi < 70.0, "rsi {}", rsi);
        assert_eq!(opinion.direction, Direction::Buy);
        assert!((opinion.confidence - (momentum * 10_000.0).min(90.0)).abs() < 1e-9);
    }

    #[test]
    fn test_sell_on_negative_momentum() {
        let history = history_from_closes(&push(-0.0006));
        let opinion = MomentumAgent::default()
            .evaluate(Timeframe::M1, 1.098, &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Sell);
    }

    #[test]
    fn test_overbought_blocks_buy() {
        // Straight-line rally: RSI pinned at 100
        let closes: Vec<f64> = (0..30).map(|i| 1.1 + 0.001 * i as f64).collect();
        let history = history_from_closes(&closes);
        let opinion = MomentumAgent::default()
            .evaluate(Timeframe::M1, closes[29], &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 40.0);
    }

    #[test]
    fn test_hold_when_flat() {
        let history = history_from_closes(&[1.2; 25]);
        let opinion = MomentumAgent::default()
            .evaluate(Timeframe::M1, 1.2, &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
    }
}
