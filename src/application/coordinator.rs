use crate::application::agents::{Agent, AgentKey};
use crate::config::ConsensusConfig;
use crate::domain::consensus::{
    AgentFailure, Consensus, Decision, Opinion, RiskLevel, ScoreBreakdown, WeightedOpinion,
};
use crate::domain::errors::ConsensusError;
use crate::domain::market::History;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Turns normalized class scores into a direction, a confidence and price levels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    pub threshold: f64,
    pub confidence_cap: f64,
    pub target_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub high_risk_confidence: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::from_config(&ConsensusConfig::default())
    }
}

impl DecisionPolicy {
    pub fn from_config(config: &ConsensusConfig) -> Self {
        Self {
            threshold: config.decision_threshold,
            confidence_cap: config.confidence_cap,
            target_pct: fraction(config.target_pct),
            stop_loss_pct: fraction(config.stop_loss_pct),
            high_risk_confidence: config.high_risk_confidence,
        }
    }

    /// First match wins: BUY is checked before SELL, HOLD takes the rest.
    pub fn decide(&self, scores: &ScoreBreakdown) -> (Decision, f64) {
        let decision = if scores.buy > self.threshold {
            Decision::Buy
        } else if scores.sell > self.threshold {
            Decision::Sell
        } else {
            Decision::Hold
        };
        // Not clamp: a NaN or negative cap would panic
        let confidence = (scores.get(decision) * 100.0)
            .max(0.0)
            .min(self.confidence_cap);
        (decision, confidence)
    }

    /// `(target, stop_loss)` at fixed offsets from `current_price`.
    /// A level that overflows stays at `current_price`.
    pub fn levels(&self, decision: Decision, current_price: Decimal) -> (Decimal, Decimal) {
        let scaled = |factor: Option<Decimal>| {
            factor
                .and_then(|f| current_price.checked_mul(f))
                .unwrap_or(current_price)
        };
        let up = |pct: Decimal| scaled(Decimal::ONE.checked_add(pct));
        let down = |pct: Decimal| scaled(Decimal::ONE.checked_sub(pct));
        match decision {
            Decision::Buy => (up(self.target_pct), down(self.stop_loss_pct)),
            Decision::Sell => (down(self.target_pct), up(self.stop_loss_pct)),
            Decision::Hold => (current_price, current_price),
        }
    }
}

fn fraction(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(10))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct WeightedAgent {
    pub agent: Agent,
    pub weight: f64,
}

/// Owns the weighted agents of one instrument and fuses their opinions.
///
/// Agents are keyed by `(kind, timeframe)`; registering the same key again
/// replaces the previous entry.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pair: String,
    agents: BTreeMap<AgentKey, WeightedAgent>,
    policy: DecisionPolicy,
}

impl Coordinator {
    pub fn new(pair: impl Into<String>, policy: DecisionPolicy) -> Self {
        Self {
            pair: pair.into(),
            agents: BTreeMap::new(),
            policy,
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn add(&mut self, agent: Agent, weight: f64) -> Result<(), ConsensusError> {
        let key = agent.key();
        if !weight.is_finite() || weight <= 0.0 {
            return Err(ConsensusError::InvalidWeight {
                agent: key.to_string(),
                weight,
            });
        }
        if self
            .agents
            .insert(key, WeightedAgent { agent, weight })
            .is_some()
        {
            debug!("{}: replaced {}", self.pair, key);
        }
        Ok(())
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agents(&self) -> impl Iterator<Item = &WeightedAgent> {
        self.agents.values()
    }

    /// One fusion pass over every registered agent.
    ///
    /// Agents that fail outright (an error other than missing history, or a
    /// panic) are listed in `failures` and contribute neither an opinion nor
    /// weight. Never fails.
    pub fn fuse(&self, current_price: Decimal, history: &History) -> Consensus {
        let mut opinions = Vec::with_capacity(self.agents.len());
        let mut failures = Vec::new();

        for (key, entry) in &self.agents {
            match run_isolated(&entry.agent, current_price, history) {
                Ok(opinion) => {
                    debug!(
                        "{} {}: {} ({:.1})",
                        self.pair, key, opinion.direction, opinion.confidence
                    );
                    opinions.push(WeightedOpinion {
                        opinion,
                        weight: entry.weight,
                    });
                }
                Err(reason) => {
                    warn!("{} {}: agent failed: {}", self.pair, key, reason);
                    failures.push(AgentFailure {
                        agent: entry.agent.name().to_string(),
                        timeframe: entry.agent.timeframe(),
                        reason,
                    });
                }
            }
        }

        if opinions.is_empty() {
            let mut consensus = Consensus::degenerate(self.pair.clone(), current_price);
            consensus.failures = failures;
            return consensus;
        }

        let scores = tally(&opinions).normalized();
        let (direction, confidence) = self.policy.decide(&scores);
        let (target_price, stop_loss) = self.policy.levels(direction, current_price);

        debug!(
            "{}: {} conf {:.1} (buy {:.3} sell {:.3} hold {:.3})",
            self.pair, direction, confidence, scores.buy, scores.sell, scores.hold
        );

        Consensus {
            pair: self.pair.clone(),
            direction,
            confidence,
            current_price,
            target_price,
            stop_loss,
            agents_count: opinions.len(),
            opinions,
            failures,
            scores,
            risk_level: RiskLevel::from_confidence(confidence, self.policy.high_risk_confidence),
        }
    }
}

/// Raw (un-normalized) `confidence * weight` per class. NEUTRAL opinions add nothing.
pub fn tally(opinions: &[WeightedOpinion]) -> ScoreBreakdown {
    opinions
        .iter()
        .fold(ScoreBreakdown::default(), |mut scores, wo| {
            let contribution = wo.opinion.confidence * wo.weight;
            match wo.opinion.direction.as_decision() {
                Some(Decision::Buy) => scores.buy += contribution,
                Some(Decision::Sell) => scores.sell += contribution,
                Some(Decision::Hold) => scores.hold += contribution,
                None => {}
            }
            scores
        })
}

/// Runs one agent behind the isolation boundary.
///
/// Missing history is an expected condition and yields NEUTRAL/0; any other
/// error or a panic is reported as a failure reason.
fn run_isolated(
    agent: &Agent,
    current_price: Decimal,
    history: &History,
) -> Result<Opinion, String> {
    match catch_unwind(AssertUnwindSafe(|| agent.evaluate(current_price, history))) {
        Ok(Ok(opinion)) => Ok(opinion),
        Ok(Err(e)) if e.is_insufficient_data() => {
            debug!("{}: {}", agent.key(), e);
            Ok(Opinion::neutral(agent.name(), agent.timeframe()))
        }
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
