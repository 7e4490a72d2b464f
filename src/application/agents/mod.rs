//! Signal-generating agents
//!
//! The set of variants is closed: every agent is one of the six kinds below,
//! dispatched through `Agent`. Each variant only implements its heuristic;
//! the shared contract (minimum-history check first, no error escaping
//! `predict`) lives here.

mod estimator;
mod momentum;
mod news;
mod pattern;
mod scalping;
mod trend;
mod volatility;

pub use estimator::{FeatureModelEstimator, LinearTrendEstimator, PriceEstimator};
pub use momentum::{MomentumAgent, MomentumParams};
pub use news::{NewsAgent, NewsParams};
pub use pattern::{CandlePattern, PatternAgent, PatternParams};
pub use scalping::{ScalpingAgent, ScalpingParams};
pub use trend::{TrendAgent, TrendParams};
pub use volatility::{VolatilityAgent, VolatilityParams};

use crate::domain::consensus::Opinion;
use crate::domain::errors::AgentError;
use crate::domain::market::{History, Timeframe};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Trend,
    Momentum,
    Volatility,
    Pattern,
    Scalping,
    News,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Trend,
        AgentKind::Momentum,
        AgentKind::Volatility,
        AgentKind::Pattern,
        AgentKind::Scalping,
        AgentKind::News,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Trend => "TrendAgent",
            AgentKind::Momentum => "MomentumAgent",
            AgentKind::Volatility => "VolatilityAgent",
            AgentKind::Pattern => "PatternAgent",
            AgentKind::Scalping => "ScalpingAgent",
            AgentKind::News => "NewsAgent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity of a registered agent inside a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentKey {
    pub kind: AgentKind,
    pub timeframe: Timeframe,
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.name(), self.timeframe)
    }
}

/// What a variant implements. The minimum-history check and the price
/// conversion are done by `Agent` before `evaluate` is reached.
trait Evaluate {
    fn min_history(&self) -> usize;

    fn evaluate(
        &self,
        timeframe: Timeframe,
        current_price: f64,
        history: &History,
    ) -> Result<Opinion, AgentError>;
}

#[derive(Debug, Clone)]
pub enum AgentVariant {
    Trend(TrendAgent),
    Momentum(MomentumAgent),
    Volatility(VolatilityAgent),
    Pattern(PatternAgent),
    Scalping(ScalpingAgent),
    News(NewsAgent),
}

impl AgentVariant {
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentVariant::Trend(_) => AgentKind::Trend,
            AgentVariant::Momentum(_) => AgentKind::Momentum,
            AgentVariant::Volatility(_) => AgentKind::Volatility,
            AgentVariant::Pattern(_) => AgentKind::Pattern,
            AgentVariant::Scalping(_) => AgentKind::Scalping,
            AgentVariant::News(_) => AgentKind::News,
        }
    }

    fn inner(&self) -> &dyn Evaluate {
        match self {
            AgentVariant::Trend(a) => a,
            AgentVariant::Momentum(a) => a,
            AgentVariant::Volatility(a) => a,
            AgentVariant::Pattern(a) => a,
            AgentVariant::Scalping(a) => a,
            AgentVariant::News(a) => a,
        }
    }
}

/// One independent estimator bound to a timeframe.
#[derive(Debug, Clone)]
pub struct Agent {
    timeframe: Timeframe,
    variant: AgentVariant,
}

impl Agent {
    pub fn new(variant: AgentVariant, timeframe: Timeframe) -> Self {
        Self { timeframe, variant }
    }

    /// Agent of `kind` with default parameters.
    pub fn with_defaults(kind: AgentKind, timeframe: Timeframe) -> Self {
        let variant = match kind {
            AgentKind::Trend => AgentVariant::Trend(TrendAgent::default()),
            AgentKind::Momentum => AgentVariant::Momentum(MomentumAgent::default()),
            AgentKind::Volatility => AgentVariant::Volatility(VolatilityAgent::default()),
            AgentKind::Pattern => AgentVariant::Pattern(PatternAgent::default()),
            AgentKind::Scalping => AgentVariant::Scalping(ScalpingAgent::default()),
            AgentKind::News => AgentVariant::News(NewsAgent::default()),
        };
        Self::new(variant, timeframe)
    }

    pub fn kind(&self) -> AgentKind {
        self.variant.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn key(&self) -> AgentKey {
        AgentKey {
            kind: self.kind(),
            timeframe: self.timeframe,
        }
    }

    pub fn variant(&self) -> &AgentVariant {
        &self.variant
    }

    /// Fewest bars this agent needs before it forms an opinion.
    pub fn min_history(&self) -> usize {
        self.variant.inner().min_history()
    }

    /// Raw outcome, with the reason when no opinion could be formed.
    pub fn evaluate(
        &self,
        current_price: Decimal,
        history: &History,
    ) -> Result<Opinion, AgentError> {
        let agent = self.name();
        let required = self.min_history();
        if history.len() < required {
            return Err(AgentError::InsufficientData {
                agent,
                required,
                available: history.len(),
            });
        }

        let price = current_price
            .to_f64()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(AgentError::NonFinite {
                agent,
                what: "current price",
            })?;

        self.variant.inner().evaluate(self.timeframe, price, history)
    }

    /// Never fails: any error becomes a NEUTRAL opinion with zero confidence.
    pub fn predict(&self, current_price: Decimal, history: &History) -> Opinion {
        self.evaluate(current_price, history).unwrap_or_else(|e| {
            debug!("{} ({}): neutral, {}", self.name(), self.timeframe, e);
            Opinion::neutral(self.name(), self.timeframe)
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::market::PricePoint;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    pub fn d(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    /// Bars whose open is the previous close and whose wicks sit 5 pips outside the body.
    pub fn history_from_closes(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let open = if i == 0 { *c } else { closes[i - 1] };
                PricePoint::new(
                    i as i64,
                    d(open),
                    d(c.max(open) + 0.0005),
                    d(c.min(open) - 0.0005),
                    d(*c),
                    Decimal::ZERO,
                )
            })
            .collect()
    }

    pub fn bar(open: f64, high: f64, low: f64, close: f64) -> PricePoint {
        PricePoint::new(0, d(open), d(high), d(low), d(close), Decimal::ZERO)
    }

    /// Flat bars followed by `tail`, with timestamps renumbered.
    pub fn flat_then(n: usize, price: f64, tail: &[PricePoint]) -> Vec<PricePoint> {
        let mut bars = history_from_closes(&vec![price; n]);
        bars.extend_from_slice(tail);
        for (i, b) in bars.iter_mut().enumerate() {
            b.timestamp = i as i64;
        }
        bars
    }
}
