//! Application layer - Generic services that use ports.

// Orchestrator: publishes one video to every platform it targets
pub mod orchestrator;

// Scheduler: selects due videos and arms their publishes
pub mod scheduler;
