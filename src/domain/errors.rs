use thiserror::Error;

/// Errors raised while deriving the indicator snapshot from a history
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Insufficient data: need {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Non-finite value for feature {feature}")]
    NonFinite { feature: &'static str },

    #[error("Invalid {indicator} window: {period}")]
    InvalidWindow {
        indicator: &'static str,
        period: usize,
    },
}

/// Errors raised inside a single agent.
///
/// These never cross the agent boundary as failures of the fusion pass:
/// the coordinator records them and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("{agent}: insufficient data, need {required} bars, got {available}")]
    InsufficientData {
        agent: &'static str,
        required: usize,
        available: usize,
    },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("{agent}: estimator failed: {reason}")]
    Estimator { agent: &'static str, reason: String },

    #[error("{agent}: non-finite {what}")]
    NonFinite {
        agent: &'static str,
        what: &'static str,
    },
}

impl AgentError {
    /// Not-enough-history conditions, whether raised by the agent itself or by feature derivation.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            AgentError::InsufficientData { .. }
                | AgentError::Feature(FeatureError::InsufficientData { .. })
        )
    }
}

/// Errors related to coordinator and system configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    #[error("Invalid weight {weight} for agent {agent}: must be finite and > 0")]
    InvalidWeight { agent: String, weight: f64 },

    #[error("Pair {pair} is not tracked by this system")]
    UnknownPair { pair: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Violations of the ordering guarantees a history must carry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("Bar {index} (timestamp {timestamp}) is not after its predecessor")]
    NotChronological { index: usize, timestamp: i64 },

    #[error("Bar {index} has a low above its high")]
    InvertedRange { index: usize },
}
