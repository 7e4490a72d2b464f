//! Configuration module for the consensus engine.
//!
//! Everything here is plain data: the decision policy, the agent weight table
//! and the tracked instruments. Values come from environment variables or a
//! TOML file; anything missing falls back to the defaults.

mod weights_config;

pub use weights_config::AgentWeights;

use crate::domain::market::Timeframe;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// A class must hold more than this share of the normalized score to win
    pub decision_threshold: f64,
    pub confidence_cap: f64,
    /// Target offset from the current price, as a fraction
    pub target_pct: f64,
    /// Stop-loss offset from the current price, as a fraction
    pub stop_loss_pct: f64,
    /// Consensus confidence at or above which the call is flagged high risk
    pub high_risk_confidence: f64,
    pub weights: AgentWeights,
    pub pairs: Vec<String>,
    pub timeframes: Vec<Timeframe>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.6,
            confidence_cap: 95.0,
            target_pct: 0.005,
            stop_loss_pct: 0.003,
            high_risk_confidence: 70.0,
            weights: AgentWeights::default(),
            pairs: ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCAD"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeframes: vec![Timeframe::M1],
        }
    }
}

impl ConsensusConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same keys as `from_env`, read through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();

        let pairs = match lookup("PAIRS") {
            Some(raw) => parse_pairs(&raw),
            None => d.pairs,
        };

        let timeframes = match lookup("TIMEFRAMES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<Timeframe>)
                .collect::<Result<Vec<Timeframe>>>()
                .context("Failed to parse TIMEFRAMES")?,
            None => d.timeframes,
        };

        let config = Self {
            decision_threshold: parse_f64(&lookup, "CONSENSUS_THRESHOLD", d.decision_threshold)?,
            confidence_cap: parse_f64(&lookup, "CONFIDENCE_CAP", d.confidence_cap)?,
            target_pct: parse_f64(&lookup, "TARGET_PCT", d.target_pct)?,
            stop_loss_pct: parse_f64(&lookup, "STOP_LOSS_PCT", d.stop_loss_pct)?,
            high_risk_confidence: parse_f64(
                &lookup,
                "HIGH_RISK_CONFIDENCE",
                d.high_risk_confidence,
            )?,
            weights: AgentWeights::from_lookup(&lookup)?,
            pairs,
            timeframes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw).context("Failed to parse consensus config")?;
        config.pairs = config.pairs.iter().map(|p| p.trim().to_uppercase()).collect();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Runs agents on `timeframe` only. Returns true if the list changed.
    pub fn use_single_timeframe(&mut self, timeframe: Timeframe) -> bool {
        if self.timeframes == [timeframe] {
            return false;
        }
        self.timeframes = vec![timeframe];
        true
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.decision_threshold > 0.0 && self.decision_threshold < 1.0,
            "decision_threshold must be in (0, 1), got {}",
            self.decision_threshold
        );
        ensure!(
            self.confidence_cap > 0.0 && self.confidence_cap <= 100.0,
            "confidence_cap must be in (0, 100], got {}",
            self.confidence_cap
        );
        ensure!(
            self.target_pct.is_finite() && self.target_pct >= 0.0,
            "target_pct must be >= 0, got {}",
            self.target_pct
        );
        ensure!(
            self.stop_loss_pct.is_finite() && self.stop_loss_pct >= 0.0,
            "stop_loss_pct must be >= 0, got {}",
            self.stop_loss_pct
        );
        for (name, weight) in self.weights.entries() {
            ensure!(
                weight.is_finite() && weight > 0.0,
                "weight for {} must be > 0, got {}",
                name,
                weight
            );
        }
        Ok(())
    }
}

fn parse_pairs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}
