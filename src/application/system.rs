use crate::application::agents::{Agent, AgentKind};
use crate::application::coordinator::{Coordinator, DecisionPolicy};
use crate::config::{AgentWeights, ConsensusConfig};
use crate::domain::consensus::Consensus;
use crate::domain::errors::ConsensusError;
use crate::domain::market::{History, PricePoint, Timeframe};
use crate::domain::ports::QuoteSource;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Fusion weight of `kind` in the configured table.
pub fn weight_of(weights: &AgentWeights, kind: AgentKind) -> f64 {
    match kind {
        AgentKind::Trend => weights.trend,
        AgentKind::Momentum => weights.momentum,
        AgentKind::Volatility => weights.volatility,
        AgentKind::Pattern => weights.pattern,
        AgentKind::Scalping => weights.scalping,
        AgentKind::News => weights.news,
    }
}

/// One coordinator per tracked instrument.
///
/// Coordinators share nothing, so instruments are fused in parallel.
#[derive(Debug, Clone)]
pub struct MultiInstrumentSystem {
    config: ConsensusConfig,
    coordinators: BTreeMap<String, Coordinator>,
}

impl MultiInstrumentSystem {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            coordinators: BTreeMap::new(),
        }
    }

    /// System tracking the configured pairs and timeframes.
    ///
    /// The config is validated first, whichever way it was built.
    pub fn from_config(config: ConsensusConfig) -> Result<Self, ConsensusError> {
        config
            .validate()
            .map_err(|e| ConsensusError::InvalidConfig {
                reason: format!("{:#}", e),
            })?;
        let mut system = Self::new(config);
        let pairs = system.config.pairs.clone();
        let timeframes = system.config.timeframes.clone();
        system.initialize(&pairs, &timeframes)?;
        Ok(system)
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// (Re)builds the coordinator of every pair in `pairs` with one agent of
    /// each kind per timeframe, weighted from the configured table.
    pub fn initialize(
        &mut self,
        pairs: &[String],
        timeframes: &[Timeframe],
    ) -> Result<(), ConsensusError> {
        for pair in pairs {
            let mut coordinator =
                Coordinator::new(pair.clone(), DecisionPolicy::from_config(&self.config));
            for timeframe in timeframes {
                for kind in AgentKind::ALL {
                    coordinator.add(
                        Agent::with_defaults(kind, *timeframe),
                        weight_of(&self.config.weights, kind),
                    )?;
                }
            }
            self.coordinators.insert(pair.clone(), coordinator);
        }

        info!(
            "Consensus system initialized: {} pairs, {} timeframes, {} agents",
            self.coordinators.len(),
            timeframes.len(),
            self.agent_count()
        );
        Ok(())
    }

    pub fn coordinator(&self, pair: &str) -> Option<&Coordinator> {
        self.coordinators.get(pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }

    /// Total registered agents across all instruments.
    pub fn agent_count(&self) -> usize {
        self.coordinators.values().map(Coordinator::agent_count).sum()
    }

    pub fn predict(
        &self,
        pair: &str,
        current_price: Decimal,
        history: &History,
    ) -> Result<Consensus, ConsensusError> {
        let coordinator = self
            .coordinators
            .get(pair)
            .ok_or_else(|| ConsensusError::UnknownPair {
                pair: pair.to_string(),
            })?;
        Ok(coordinator.fuse(current_price, history))
    }

    /// Fuses every tracked pair that has both a current price and a
    /// non-empty history. Other pairs are left out of the result.
    pub fn predict_all(
        &self,
        current_prices: &HashMap<String, Decimal>,
        histories: &HashMap<String, Vec<PricePoint>>,
    ) -> BTreeMap<String, Consensus> {
        let ready: Vec<(&Coordinator, Decimal, &[PricePoint])> = self
            .coordinators
            .iter()
            .filter_map(|(pair, coordinator)| {
                let price = current_prices.get(pair);
                let history = histories.get(pair).filter(|h| !h.is_empty());
                match (price, history) {
                    (Some(price), Some(history)) => {
                        Some((coordinator, *price, history.as_slice()))
                    }
                    _ => {
                        debug!("{}: skipped, missing price or history", pair);
                        None
                    }
                }
            })
            .collect();

        ready
            .into_par_iter()
            .map(|(coordinator, price, history)| {
                (
                    coordinator.pair().to_string(),
                    coordinator.fuse(price, history),
                )
            })
            .collect()
    }

    /// `predict_all` over whatever `source` currently knows about the tracked pairs.
    pub fn predict_from_source(
        &self,
        source: &dyn QuoteSource,
        timeframe: Timeframe,
    ) -> BTreeMap<String, Consensus> {
        let mut prices = HashMap::new();
        let mut histories = HashMap::new();
        for pair in self.coordinators.keys() {
            if let Some(price) = source.current_price(pair) {
                prices.insert(pair.clone(), price);
            }
            histories.insert(pair.clone(), source.history(pair, timeframe));
        }
        self.predict_all(&prices, &histories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::test_support::history_from_closes;
    use rust_decimal_macros::dec;

    fn pairs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_initialize_registers_every_kind_per_timeframe() {
        let mut system = MultiInstrumentSystem::new(ConsensusConfig::default());
        system
            .initialize(&pairs(&["EURUSD", "GBPUSD"]), &[Timeframe::M1, Timeframe::M5])
            .unwrap();
        assert_eq!(system.coordinator("EURUSD").unwrap().agent_count(), 12);
        assert_eq!(system.agent_count(), 24);
    }

    #[test]
    fn test_initialize_uses_weight_table() {
        let mut system = MultiInstrumentSystem::new(ConsensusConfig::default());
        system.initialize(&pairs(&["EURUSD"]), &[Timeframe::M1]).unwrap();
        let weights: Vec<(AgentKind, f64)> = system
            .coordinator("EURUSD")
            .unwrap()
            .agents()
            .map(|wa| (wa.agent.kind(), wa.weight))
            .collect();
        assert!(weights.contains(&(AgentKind::Trend, 1.5)));
        assert!(weights.contains(&(AgentKind::News, 0.7)));
    }

    #[test]
    fn test_reinitialize_does_not_duplicate() {
        let mut system = MultiInstrumentSystem::new(ConsensusConfig::default());
        system.initialize(&pairs(&["EURUSD"]), &[Timeframe::M1]).unwrap();
        system.initialize(&pairs(&["EURUSD"]), &[Timeframe::M1]).unwrap();
        assert_eq!(system.agent_count(), 6);
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = ConsensusConfig {
            confidence_cap: -1.0,
            ..ConsensusConfig::default()
        };
        let err = MultiInstrumentSystem::from_config(config).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidConfig { .. }));
        assert!(err.to_string().contains("confidence_cap"));

        let config = ConsensusConfig {
            decision_threshold: f64::NAN,
            ..ConsensusConfig::default()
        };
        assert!(MultiInstrumentSystem::from_config(config).is_err());
    }

    #[test]
    fn test_predict_unknown_pair() {
        let system = MultiInstrumentSystem::new(ConsensusConfig::default());
        let err = system.predict("XAUUSD", dec!(2000), &[]).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::UnknownPair {
                pair: "XAUUSD".to_string()
            }
        );
    }

    #[test]
    fn test_predict_all_skips_missing_inputs() {
        let mut system = MultiInstrumentSystem::new(ConsensusConfig::default());
        system
            .initialize(&pairs(&["EURUSD", "GBPUSD", "USDJPY"]), &[Timeframe::M1])
            .unwrap();

        let closes: Vec<f64> = (0..40).map(|i| 1.1 + 0.0001 * i as f64).collect();
        let prices = HashMap::from([
            ("EURUSD".to_string(), dec!(1.1039)),
            ("GBPUSD".to_string(), dec!(1.1039)),
        ]);
        let histories = HashMap::from([
            ("EURUSD".to_string(), history_from_closes(&closes)),
            ("USDJPY".to_string(), history_from_closes(&closes)),
        ]);

        let results = system.predict_all(&prices, &histories);
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["EURUSD"]);
        assert_eq!(results["EURUSD"].agents_count, 6);
    }
}
