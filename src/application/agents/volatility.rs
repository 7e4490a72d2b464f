use super::Evaluate;
use crate::application::features::FeatureDeriver;
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::json;

const NAME: &str = "VolatilityAgent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    /// Band touches only count while return volatility stays below this
    pub max_volatility: f64,
    pub signal_confidence: f64,
    pub hold_confidence: f64,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            max_volatility: 0.01,
            signal_confidence: 85.0,
            hold_confidence: 60.0,
        }
    }
}

/// Bollinger band reversion in calm markets.
#[derive(Debug, Clone, Default)]
pub struct VolatilityAgent {
    deriver: FeatureDeriver,
    params: VolatilityParams,
}

impl VolatilityAgent {
    pub fn new(deriver: FeatureDeriver, params: VolatilityParams) -> Self {
        Self { deriver, params }
    }
}

impl Evaluate for VolatilityAgent {
    fn min_history(&self) -> usize {
        self.deriver.min_history()
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let fs = self.deriver.derive(history)?;
        let p = &self.params;
        let calm = fs.volatility < p.max_volatility;

        // Zero-width bands: every price touches both, so neither side means anything
        let opinion = if fs.bb_position.is_none() {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        } else if current_price <= fs.bb_lower && calm {
            Opinion::buy(NAME, timeframe, p.signal_confidence)
        } else if current_price >= fs.bb_upper && calm {
            Opinion::sell(NAME, timeframe, p.signal_confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.hold_confidence)
        };

        Ok(opinion
            .with_diagnostic("volatility", json!(fs.volatility))
            .with_diagnostic("atr", json!(fs.atr))
            .with_diagnostic("bb_upper", json!(fs.bb_upper))
            .with_diagnostic("bb_lower", json!(fs.bb_lower)))
    }
}
