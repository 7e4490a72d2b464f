use super::direction::Decision;
use super::opinion::Opinion;
use crate::domain::market::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized per-class scores of one fusion pass.
///
/// Either all three are 0 (nothing contributed) or they sum to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub buy: f64,
    pub sell: f64,
    pub hold: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.buy + self.sell + self.hold
    }

    /// Divides each class by the total so the three sum to 1. A zero total
    /// leaves everything at 0.
    pub fn normalized(self) -> Self {
        let total = self.total();
        if total > 0.0 {
            Self {
                buy: self.buy / total,
                sell: self.sell / total,
                hold: self.hold / total,
            }
        } else {
            Self::default()
        }
    }

    /// Class scores scaled to 0-100 for display.
    pub fn as_percentages(&self) -> Self {
        Self {
            buy: self.buy * 100.0,
            sell: self.sell * 100.0,
            hold: self.hold * 100.0,
        }
    }

    pub fn get(&self, decision: Decision) -> f64 {
        match decision {
            Decision::Buy => self.buy,
            Decision::Sell => self.sell,
            Decision::Hold => self.hold,
        }
    }
}

/// An opinion together with the weight it was fused with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOpinion {
    #[serde(flatten)]
    pub opinion: Opinion,
    pub weight: f64,
}

/// An agent that failed outright during a fusion pass. It contributed
/// neither an opinion nor its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent: String,
    pub timeframe: Timeframe,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn from_confidence(confidence: f64, high_risk_confidence: f64) -> Self {
        if confidence < high_risk_confidence {
            RiskLevel::Low
        } else {
            RiskLevel::High
        }
    }
}

/// Fused recommendation for one instrument. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub pair: String,
    pub direction: Decision,
    /// 0.0 - 95.0 (capped by policy)
    pub confidence: f64,
    pub current_price: Decimal,
    pub target_price: Decimal,
    pub stop_loss: Decimal,
    pub agents_count: usize,
    pub opinions: Vec<WeightedOpinion>,
    pub failures: Vec<AgentFailure>,
    pub scores: ScoreBreakdown,
    pub risk_level: RiskLevel,
}

impl Consensus {
    /// HOLD at zero confidence with no directional levels. Used when no agent
    /// produced an opinion.
    pub fn degenerate(pair: impl Into<String>, current_price: Decimal) -> Self {
        Self {
            pair: pair.into(),
            direction: Decision::Hold,
            confidence: 0.0,
            current_price,
            target_price: current_price,
            stop_loss: current_price,
            agents_count: 0,
            opinions: Vec::new(),
            failures: Vec::new(),
            scores: ScoreBreakdown::default(),
            risk_level: RiskLevel::Low,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.direction != Decision::Hold
    }
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {:.5} (Conf: {:.1}%)",
            self.pair, self.direction, self.current_price, self.confidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalized_sums_to_one() {
        let scores = ScoreBreakdown {
            buy: 150.0,
            sell: 50.0,
            hold: 0.0,
        }
        .normalized();
        assert!((scores.total() - 1.0).abs() < 1e-12);
        assert!((scores.buy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_zero_stays_zero() {
        let scores = ScoreBreakdown::default().normalized();
        assert_eq!(scores, ScoreBreakdown::default());
    }

    #[test]
    fn test_degenerate_consensus() {
        let consensus = Consensus::degenerate("EURUSD", dec!(1.1));
        assert_eq!(consensus.direction, Decision::Hold);
        assert_eq!(consensus.confidence, 0.0);
        assert_eq!(consensus.agents_count, 0);
        assert_eq!(consensus.target_price, dec!(1.1));
        assert!(!consensus.is_actionable());
    }

    #[test]
    fn test_display_format() {
        let mut consensus = Consensus::degenerate("GBPUSD", dec!(1.27));
        consensus.direction = Decision::Sell;
        consensus.confidence = 72.345;
        assert_eq!(consensus.to_string(), "[GBPUSD] SELL @ 1.27000 (Conf: 72.3%)");
    }

    #[test]
    fn test_risk_level_boundary() {
        assert_eq!(RiskLevel::from_confidence(69.9, 70.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_confidence(70.0, 70.0), RiskLevel::High);
    }
}
