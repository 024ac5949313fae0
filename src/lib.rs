//! Control Studio - Scheduled multi-platform video publishing
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (video records, status aggregation, due window)
//! - ports/: Trait definitions (video store, platform publishers, clock)
//! - adapters/: Concrete implementations (JSON file store, platform APIs)
//! - application/: Generic services (orchestrator, scheduler)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::orchestrator::{OrchestratorService, PublishReport, PublisherRegistry};
pub use application::scheduler::{SchedulerService, VideoOutcome};
pub use config::SchedulerConfig;
pub use domain::video::{Platform, PlatformOutcome, VideoRecord, VideoStatus};
