// Agent opinions and fused recommendations
pub mod consensus;

// Domain-specific error types
pub mod errors;

// Indicator snapshot and feature registry
pub mod features;

// Price bars and timeframes
pub mod market;

// Port interfaces
pub mod ports;
