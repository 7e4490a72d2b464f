use super::Evaluate;
use crate::application::features::indicators::{simple_returns, std_dev};
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, Timeframe, closes};
use serde::{Deserialize, Serialize};
use serde_json::json;

const NAME: &str = "NewsAgent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsParams {
    /// Number of trailing returns in the volatility window
    pub window: usize,
    pub spike_threshold: f64,
    /// Direction of a spike: last close against the one this many bars earlier
    pub direction_lag: usize,
    pub signal_confidence: f64,
    pub hold_confidence: f64,
}

impl Default for NewsParams {
    fn default() -> Self {
        Self {
            window: 10,
            spike_threshold: 0.005,
            direction_lag: 4,
            signal_confidence: 70.0,
            hold_confidence: 60.0,
        }
    }
}

/// Volatility-spike proxy for event-driven moves. Reads prices only.
#[derive(Debug, Clone, Default)]
pub struct NewsAgent {
    params: NewsParams,
}

impl NewsAgent {
    pub fn new(params: NewsParams) -> Self {
        Self { params }
    }
}

impl Evaluate for NewsAgent {
    fn min_history(&self) -> usize {
        (self.params.window + 1).max(self.params.direction_lag + 1)
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        _current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let p = &self.params;
        let series = closes(history);
        let returns = simple_returns(&series);

        let spike = std_dev(&returns, p.window)
            .filter(|v| v.is_finite())
            .ok_or(AgentError::NonFinite {
                agent: NAME,
                what: "return volatility",
            })?;

        let last = series[series.len() - 1];
        let base = series[series.len() - 1 - p.direction_lag];

        // A spike with no net move gives no direction to follow
        let opinion = if spike > p.spike_threshold && last > base {
            Opinion::buy(NAME, timeframe, p.signal_confidence)
        } else if spike > p.spike_threshold && last < base {
            Opinion::sell(NAME, timeframe, p.signal_confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        };

        Ok(opinion.with_diagnostic("volatility_signal", json!(spike)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::history_from_closes;
    use crate::domain::consensus::Direction;

    /// 1% swings, ending `drift` away from where it was four bars earlier.
    fn choppy(drift: f64) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..12)
            .map(|i| if i % 2 == 0 { 1.10 } else { 1.111 })
            .collect();
        let four_back = closes[closes.len() - 4];
        closes.push(four_back + drift);
        closes
    }

    #[test]
    fn test_spike_up_is_buy() {
        let history = history_from_closes(&choppy(0.002));
        let opinion = NewsAgent::default()
            .evaluate(Timeframe::M1, 1.102, &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
        assert_eq!(opinion.confidence, 70.0);
        assert!(opinion.diagnostic("volatility_signal").unwrap().as_f64().unwrap() > 0.005);
    }

    #[test]
    fn test_spike_down_is_sell() {
        let history = history_from_closes(&choppy(-0.002));
        let opinion = NewsAgent::default()
            .evaluate(Timeframe::M1, 1.098, &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Sell);
    }

    #[test]
    fn test_spike_without_net_move_holds() {
        let history = history_from_closes(&choppy(0.0));
        let opinion = NewsAgent::default()
            .evaluate(Timeframe::M1, 1.1, &history)
            .unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 60.0);
    }

    #[test]
    fn test_quiet_market_holds() {
        let closes: Vec<f64> = (0..15).map(|i| 1.1 + 0.0001 * i as f64).collect();
        let opinion = NewsAgent::default()
            .evaluate(Timeframe::M1, 1.1014, &history_from_closes(&closes))
            .unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
    }
}
