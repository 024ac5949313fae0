//! One-shot scheduler pass
//!
//! Selects the videos due within the horizon, publishes each at its scheduled
//! time and exits once every armed publish has finished. Meant for cron.

use control_studio::adapters::local::JsonFileStore;
use control_studio::adapters::platforms;
use control_studio::application::orchestrator::{OrchestratorService, PublisherRegistry};
use control_studio::application::scheduler::{log_outcomes, SchedulerService, VideoOutcome};
use control_studio::config::SchedulerConfig;
use control_studio::ports::clock::{Clock, SystemClock};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match SchedulerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(JsonFileStore::new(&config.db_path));
    let clock = Arc::new(SystemClock);
    let publishers: PublisherRegistry =
        platforms::from_credentials(&config.credentials, reqwest::Client::new())
            .into_iter()
            .collect();
    tracing::info!(
        db_path = %store.path().display(),
        platforms = ?publishers.platforms(),
        "Running single scheduler pass"
    );

    let orchestrator = Arc::new(OrchestratorService::new(
        store.clone(),
        clock.clone(),
        publishers,
    ));
    let scheduler = SchedulerService::new(store, clock.clone(), orchestrator, config.horizon);

    let outcomes = match scheduler.run_scheduler_pass(clock.now()).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Scheduler pass failed: {}", e);
            std::process::exit(1);
        }
    };
    log_outcomes(&outcomes);

    let failed = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                VideoOutcome::Failed { .. } | VideoOutcome::Unrecorded { .. }
            )
        })
        .count();
    tracing::info!(processed = outcomes.len(), failed, "Pass complete");
    if failed > 0 {
        std::process::exit(2);
    }
}
