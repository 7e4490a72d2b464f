// Signal-generating agents
pub mod agents;

// Fusion of weighted opinions for one instrument
pub mod coordinator;

// Feature derivation and indicator math
pub mod features;

// Multi-instrument orchestrator
pub mod system;
