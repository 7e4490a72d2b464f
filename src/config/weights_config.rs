//! Agent weight table.

use super::parse_f64;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Static fusion weight per agent variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub pattern: f64,
    pub scalping: f64,
    pub news: f64,
}

impl Default for AgentWeights {
    fn default() -> Self {
        Self {
            trend: 1.5,
            momentum: 1.3,
            volatility: 1.2,
            pattern: 1.0,
            scalping: 0.8,
            news: 0.7,
        }
    }
}

impl AgentWeights {
    pub(super) fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            trend: parse_f64(lookup, "WEIGHT_TREND", d.trend)?,
            momentum: parse_f64(lookup, "WEIGHT_MOMENTUM", d.momentum)?,
            volatility: parse_f64(lookup, "WEIGHT_VOLATILITY", d.volatility)?,
            pattern: parse_f64(lookup, "WEIGHT_PATTERN", d.pattern)?,
            scalping: parse_f64(lookup, "WEIGHT_SCALPING", d.scalping)?,
            news: parse_f64(lookup, "WEIGHT_NEWS", d.news)?,
        })
    }

    /// `(name, weight)` pairs in table order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("trend", self.trend),
            ("momentum", self.momentum),
            ("volatility", self.volatility),
            ("pattern", self.pattern),
            ("scalping", self.scalping),
            ("news", self.news),
        ]
    }
}
