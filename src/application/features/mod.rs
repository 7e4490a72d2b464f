mod deriver;
pub mod indicators;

pub use deriver::{FeatureConfig, FeatureDeriver};
