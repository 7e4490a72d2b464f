use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional call made by a single agent.
///
/// `Neutral` is reserved for "could not form an opinion" and always
/// travels with a confidence of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
    Neutral,
}

/// Final call of a fused consensus. There is no neutral outcome: a
/// coordinator without usable opinions decides `Hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    /// Score class this direction contributes to, if any.
    pub fn as_decision(&self) -> Option<Decision> {
        match self {
            Direction::Buy => Some(Decision::Buy),
            Direction::Sell => Some(Decision::Sell),
            Direction::Hold => Some(Decision::Hold),
            Direction::Neutral => None,
        }
    }
}

impl From<Decision> for Direction {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Buy => Direction::Buy,
            Decision::Sell => Direction::Sell,
            Decision::Hold => Direction::Hold,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Direction::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_has_no_score_class() {
        assert_eq!(Direction::Neutral.as_decision(), None);
        assert_eq!(Direction::Sell.as_decision(), Some(Decision::Sell));
    }

    #[test]
    fn test_serializes_upper_case() {
        let json = serde_json::to_string(&Direction::Neutral).unwrap();
        assert_eq!(json, "\"NEUTRAL\"");
        let decision: Decision = serde_json::from_str("\"HOLD\"").unwrap();
        assert_eq!(decision, Decision::Hold);
        assert_eq!(Decision::Buy.to_string(), "BUY");
    }
}
