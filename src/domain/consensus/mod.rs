// Agent opinions and the fused recommendation
pub mod direction;
pub mod opinion;
pub mod outcome;

pub use direction::{Decision, Direction};
pub use opinion::Opinion;
pub use outcome::{AgentFailure, Consensus, RiskLevel, ScoreBreakdown, WeightedOpinion};
