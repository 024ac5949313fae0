//! Scheduler daemon
//!
//! Polls the video store and publishes every scheduled video when its time comes.
//! It wires up:
//! - The JSON video store shared with the upload server
//! - One publisher per configured platform
//! - The orchestrator and the polling scheduler

use control_studio::adapters::local::JsonFileStore;
use control_studio::adapters::platforms;
use control_studio::application::orchestrator::{OrchestratorService, PublisherRegistry};
use control_studio::application::scheduler::SchedulerService;
use control_studio::config::SchedulerConfig;
use control_studio::ports::clock::SystemClock;
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

    // 1. Adapters
    let store = Arc::new(JsonFileStore::new(&config.db_path));
    let clock = Arc::new(SystemClock);
    let publishers: PublisherRegistry =
        platforms::from_credentials(&config.credentials, reqwest::Client::new())
            .into_iter()
            .collect();
    if publishers.platforms().is_empty() {
        tracing::warn!("No platform credentials configured, every publish will fail");
    }

    // 2. Application Services
    tracing::info!(platforms = ?publishers.platforms(), "Publishers configured");
    let orchestrator = Arc::new(OrchestratorService::new(
        store.clone(),
        clock.clone(),
        publishers,
    ));
    let db_path = store.path().display().to_string();
    let scheduler = Arc::new(SchedulerService::new(
        store,
        clock,
        orchestrator,
        config.horizon,
    ));

    // 3. Poll loop
    tracing::info!(
        %db_path,
        horizon_secs = config.horizon.num_seconds(),
        poll_secs = config.poll_interval.as_secs(),
        "Scheduler started"
    );
    let handle = scheduler.start(config.poll_interval);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
        result = handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scheduler loop stopped");
            }
        }
    }
}
