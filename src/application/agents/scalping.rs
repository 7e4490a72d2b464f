use super::Evaluate;
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, PricePoint, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::json;
use statrs::statistics::Statistics;

const NAME: &str = "ScalpingAgent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalpingParams {
    pub window: usize,
    /// Micro-trend compares the last close with the one this many bars earlier
    pub trend_lag: usize,
    pub threshold: f64,
    pub signal_confidence: f64,
    pub hold_confidence: f64,
}

impl Default for ScalpingParams {
    fn default() -> Self {
        Self {
            window: 10,
            trend_lag: 4,
            threshold: 0.0005,
            signal_confidence: 75.0,
            hold_confidence: 55.0,
        }
    }
}

/// Buys dips inside a short uptrend and sells rips inside a short downtrend.
#[derive(Debug, Clone, Default)]
pub struct ScalpingAgent {
    params: ScalpingParams,
}

impl ScalpingAgent {
    pub fn new(params: ScalpingParams) -> Self {
        Self { params }
    }
}

impl Evaluate for ScalpingAgent {
    fn min_history(&self) -> usize {
        self.params.window.max(self.params.trend_lag + 1)
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let p = &self.params;
        let recent: Vec<f64> = history[history.len() - self.min_history()..]
            .iter()
            .map(PricePoint::close_f64)
            .collect();

        let last = recent[recent.len() - 1];
        let base = recent[recent.len() - 1 - p.trend_lag];
        let micro_trend = (last - base) / base;
        if !micro_trend.is_finite() {
            return Err(AgentError::NonFinite {
                agent: NAME,
                what: "micro trend",
            });
        }

        let average = recent.iter().mean();
        let spread = recent.iter().population_std_dev();

        let opinion = if micro_trend > p.threshold && current_price < average {
            Opinion::buy(NAME, timeframe, p.signal_confidence)
        } else if micro_trend < -p.threshold && current_price > average {
            Opinion::sell(NAME, timeframe, p.signal_confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        };

        Ok(opinion
            .with_diagnostic("micro_trend", json!(micro_trend))
            .with_diagnostic("price_std", json!(spread)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::history_from_closes;
    use crate::domain::consensus::Direction;

    fn rising() -> Vec<PricePoint> {
        let closes: Vec<f64> = (0..10).map(|i| 1.1 + 0.0002 * i as f64).collect();
        history_from_closes(&closes)
    }

    #[test]
    fn test_buy_dip_in_micro_uptrend() {
        // Micro trend 0.0008/1.101 > 0.0005; price below the 10-bar mean
        let opinion = ScalpingAgent::default()
            .evaluate(Timeframe::M1, 1.1005, &rising())
            .unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
        assert_eq!(opinion.confidence, 75.0);
    }

    #[test]
    fn test_no_chase_above_average() {
        let opinion = ScalpingAgent::default()
            .evaluate(Timeframe::M1, 1.1018, &rising())
            .unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 55.0);
    }

    #[test]
    fn test_sell_rip_in_micro_downtrend() {
        let closes: Vec<f64> = (0..10).map(|i| 1.1 - 0.0002 * i as f64).collect();
        let opinion = ScalpingAgent::default()
            .evaluate(Timeframe::M1, 1.0995, &history_from_closes(&closes))
            .unwrap();
        assert_eq!(opinion.direction, Direction::Sell);
    }

    #[test]
    fn test_only_last_window_matters() {
        let mut closes = vec![5.0; 30];
        closes.extend((0..10).map(|i| 1.1 + 0.0002 * i as f64));
        let opinion = ScalpingAgent::default()
            .evaluate(Timeframe::M1, 1.1005, &history_from_closes(&closes))
            .unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
    }
}
