use super::direction::Direction;
use crate::domain::market::Timeframe;
use serde::{Deserialize, Serialize};

/// Directional call plus confidence produced by one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    pub agent: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    /// 0.0 - 100.0
    pub confidence: f64,
    /// Agent-specific values that explain the call (predicted price, RSI, patterns...)
    #[serde(default)]
    pub diagnostics: serde_json::Value,
}

impl Opinion {
    /// Confidence is clamped into [0, 100]; a non-finite value counts as no confidence.
    pub fn new(
        agent: impl Into<String>,
        timeframe: Timeframe,
        direction: Direction,
        confidence: f64,
    ) -> Self {
        let confidence = match direction {
            Direction::Neutral => 0.0,
            _ if confidence.is_finite() => confidence.clamp(0.0, 100.0),
            _ => 0.0,
        };
        Self {
            agent: agent.into(),
            timeframe,
            direction,
            confidence,
            diagnostics: serde_json::json!({}),
        }
    }

    pub fn buy(agent: impl Into<String>, timeframe: Timeframe, confidence: f64) -> Self {
        Self::new(agent, timeframe, Direction::Buy, confidence)
    }

    pub fn sell(agent: impl Into<String>, timeframe: Timeframe, confidence: f64) -> Self {
        Self::new(agent, timeframe, Direction::Sell, confidence)
    }

    pub fn hold(agent: impl Into<String>, timeframe: Timeframe, confidence: f64) -> Self {
        Self::new(agent, timeframe, Direction::Hold, confidence)
    }

    /// The failure / not-enough-data opinion.
    pub fn neutral(agent: impl Into<String>, timeframe: Timeframe) -> Self {
        Self::new(agent, timeframe, Direction::Neutral, 0.0)
    }

    pub fn is_neutral(&self) -> bool {
        self.direction == Direction::Neutral
    }

    /// Add a diagnostic value
    pub fn with_diagnostic(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(obj) = self.diagnostics.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        self
    }

    pub fn diagnostic(&self, key: &str) -> Option<&serde_json::Value> {
        self.diagnostics.get(key)
    }
}
