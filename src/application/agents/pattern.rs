use super::Evaluate;
use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, PricePoint, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::json;

const NAME: &str = "PatternAgent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandlePattern {
    Doji,
    Hammer,
    BullishEngulfing,
    BearishEngulfing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub min_history: usize,
    /// Doji: body smaller than this fraction of the bar range
    pub doji_body_ratio: f64,
    /// Hammer: lower shadow larger than this multiple of the body
    pub hammer_shadow_ratio: f64,
    /// Engulfing: body larger than this multiple of the previous body
    pub engulfing_ratio: f64,
    pub signal_confidence: f64,
    pub doji_confidence: f64,
    pub no_pattern_confidence: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            min_history: 20,
            doji_body_ratio: 0.1,
            hammer_shadow_ratio: 2.0,
            engulfing_ratio: 1.5,
            signal_confidence: 80.0,
            doji_confidence: 70.0,
            no_pattern_confidence: 50.0,
        }
    }
}

/// Candlestick shapes of the last one or two bars.
#[derive(Debug, Clone, Default)]
pub struct PatternAgent {
    params: PatternParams,
}

impl PatternAgent {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }

    /// Patterns formed by the last bar (and the one before it for engulfing).
    pub fn detect(&self, history: &History) -> Vec<CandlePattern> {
        let Some(last) = history.last() else {
            return Vec::new();
        };
        let p = &self.params;
        let mut patterns = Vec::new();

        let size = body(last);
        let range = last.high_f64() - last.low_f64();
        if size < range * p.doji_body_ratio {
            patterns.push(CandlePattern::Doji);
        }

        let lower_shadow = last.open_f64().min(last.close_f64()) - last.low_f64();
        if lower_shadow > size * p.hammer_shadow_ratio {
            patterns.push(CandlePattern::Hammer);
        }

        if history.len() > 1 {
            let prev = &history[history.len() - 2];
            if size > body(prev) * p.engulfing_ratio {
                if last.is_bullish() && prev.is_bearish() {
                    patterns.push(CandlePattern::BullishEngulfing);
                } else if last.is_bearish() && prev.is_bullish() {
                    patterns.push(CandlePattern::BearishEngulfing);
                }
            }
        }

        patterns
    }
}

fn body(bar: &PricePoint) -> f64 {
    (bar.close_f64() - bar.open_f64()).abs()
}

impl Evaluate for PatternAgent {
    fn min_history(&self) -> usize {
        self.params.min_history
    }

    fn evaluate(
        &self,
        timeframe: Timeframe,
        _current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let patterns = self.detect(history);
        let p = &self.params;
        let has = |pattern| patterns.contains(&pattern);

        // No recognised shape is a low-conviction HOLD; NEUTRAL is reserved for failures
        let opinion = if has(CandlePattern::BullishEngulfing) || has(CandlePattern::Hammer) {
            Opinion::buy(NAME, timeframe, p.signal_confidence)
        } else if has(CandlePattern::BearishEngulfing) {
            Opinion::sell(NAME, timeframe, p.signal_confidence)
        } else if has(CandlePattern::Doji) {
            Opinion::hold(NAME, timeframe, p.doji_confidence)
        } else {
            Opinion::hold(NAME, timeframe, p.no_pattern_confidence)
        };

        Ok(opinion.with_diagnostic("patterns", json!(patterns)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::{bar, flat_then};
    use crate::domain::consensus::Direction;

    fn agent() -> PatternAgent {
        PatternAgent::default()
    }

    #[test]
    fn test_detects_doji() {
        // Body 0.0001 against a range of 0.0040, no lower shadow
        let history = flat_then(19, 1.1, &[bar(1.1000, 1.1040, 1.1000, 1.1001)]);
        assert_eq!(agent().detect(&history), vec![CandlePattern::Doji]);

        let opinion = agent().evaluate(Timeframe::M1, 1.1, &history).unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 70.0);
    }

    #[test]
    fn test_hammer_is_buy() {
        // Body 0.0010, lower shadow 0.0030, no upper shadow
        let history = flat_then(19, 1.1, &[bar(1.1000, 1.1010, 1.0970, 1.1010)]);
        let patterns = agent().detect(&history);
        assert!(patterns.contains(&CandlePattern::Hammer));

        let opinion = agent().evaluate(Timeframe::M1, 1.101, &history).unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
        assert_eq!(opinion.confidence, 80.0);
        assert_eq!(opinion.diagnostic("patterns"), Some(&json!(patterns)));
    }

    #[test]
    fn test_bullish_engulfing_is_buy() {
        let history = flat_then(
            18,
            1.1,
            &[
                bar(1.1010, 1.1012, 1.0998, 1.1000),
                bar(1.0999, 1.1022, 1.0998, 1.1020),
            ],
        );
        assert!(agent().detect(&history).contains(&CandlePattern::BullishEngulfing));
        let opinion = agent().evaluate(Timeframe::M1, 1.102, &history).unwrap();
        assert_eq!(opinion.direction, Direction::Buy);
    }

    #[test]
    fn test_bearish_engulfing_is_sell() {
        let history = flat_then(
            18,
            1.1,
            &[
                bar(1.1000, 1.1012, 1.0998, 1.1010),
                bar(1.1011, 1.1012, 1.0988, 1.0990),
            ],
        );
        assert_eq!(agent().detect(&history), vec![CandlePattern::BearishEngulfing]);
        let opinion = agent().evaluate(Timeframe::M1, 1.099, &history).unwrap();
        assert_eq!(opinion.direction, Direction::Sell);
        assert_eq!(opinion.confidence, 80.0);
    }

    #[test]
    fn test_no_pattern_is_low_confidence_hold() {
        // Solid bullish bar, small wicks, previous bar also bullish
        let history = flat_then(
            18,
            1.1,
            &[
                bar(1.1000, 1.1011, 1.0999, 1.1010),
                bar(1.1010, 1.1021, 1.1009, 1.1020),
            ],
        );
        assert!(agent().detect(&history).is_empty());
        let opinion = agent().evaluate(Timeframe::M1, 1.102, &history).unwrap();
        assert_eq!(opinion.direction, Direction::Hold);
        assert_eq!(opinion.confidence, 50.0);
    }
}
