use crate::application::orchestrator::{OrchestratorService, PublishReport};
use crate::domain::due::due_videos;
use crate::domain::video::{VideoRecord, VideoStatus};
use crate::error::{OrchestratorError, StoreError};
use crate::ports::clock::Clock;
use crate::ports::repository::VideoStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What happened to one video armed during a pass.
#[derive(Debug)]
pub enum VideoOutcome {
    Published(PublishReport),
    /// The record was edited, rescheduled or deleted while its timer was pending.
    Skipped { video_id: String },
    Failed {
        video_id: String,
        error: OrchestratorError,
    },
    /// Platforms were attempted but the outcome could not be saved. The video
    /// stays claimed for the life of the process so it is not uploaded again.
    Unrecorded { video_id: String, error: StoreError },
}

impl VideoOutcome {
    pub fn video_id(&self) -> &str {
        match self {
            VideoOutcome::Published(report) => &report.video_id,
            VideoOutcome::Skipped { video_id }
            | VideoOutcome::Failed { video_id, .. }
            | VideoOutcome::Unrecorded { video_id, .. } => video_id,
        }
    }

    /// Whether the video may be armed again by a later pass.
    fn releases_claim(&self) -> bool {
        !matches!(self, VideoOutcome::Unrecorded { .. })
    }
}

pub struct SchedulerService<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    orchestrator: Arc<OrchestratorService<S, C>>,
    horizon: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<S, C> SchedulerService<S, C>
where
    S: VideoStore + 'static,
    C: Clock + 'static,
{
    pub fn new(
        store: Arc<S>,
        clock: Arc<C>,
        orchestrator: Arc<OrchestratorService<S, C>>,
        horizon: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            orchestrator,
            horizon,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Scheduled videos whose publish time falls before `now + horizon`,
    /// earliest first.
    pub async fn select_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VideoRecord>, StoreError> {
        let videos = self.store.list().await?;
        Ok(due_videos(videos, now, self.horizon))
    }

    /// Arms a publish for every due video and waits for all of them.
    ///
    /// Each publish runs on its own task after `scheduled_date - now`
    /// (immediately when already past). Videos still armed by an earlier
    /// pass are left alone.
    pub async fn run_scheduler_pass(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VideoOutcome>, StoreError> {
        let due = self.select_due(now).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read videos for scheduling");
            e
        })?;
        tracing::info!(count = due.len(), "Due videos selected");

        let mut handles = Vec::with_capacity(due.len());
        for video in due {
            if !video.id.is_empty() && !self.claim(&video.id) {
                tracing::debug!(video_id = %video.id, "Publish already armed");
                continue;
            }

            let delay = video
                .scheduled_date
                .and_then(|at| (at - now).to_std().ok())
                .unwrap_or_default();
            tracing::info!(
                video_id = %video.id,
                delay_ms = delay.as_millis() as u64,
                "Scheduling video"
            );

            let orchestrator = self.orchestrator.clone();
            let store = self.store.clone();
            let in_flight = self.in_flight.clone();
            handles.push(tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let outcome =
                    publish_if_still_due(orchestrator.as_ref(), store.as_ref(), video).await;
                if outcome.releases_claim() {
                    release(&in_flight, outcome.video_id());
                }
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Publish task aborted"),
            }
        }
        Ok(outcomes)
    }

    /// Runs a pass every `poll_interval` until the returned handle is aborted.
    /// Passes overlap freely; the in-flight set keeps a video from being armed twice.
    pub fn start(self: Arc<Self>, poll_interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let scheduler = self.clone();
                let now = self.clock.now();
                tokio::spawn(async move {
                    match scheduler.run_scheduler_pass(now).await {
                        Ok(outcomes) => log_outcomes(&outcomes),
                        Err(e) => tracing::error!(error = %e, "Scheduler pass failed"),
                    }
                });
            }
        })
    }

    fn claim(&self, video_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(video_id.to_string())
    }
}

/// Re-reads the armed video when its timer fires and publishes it only if
/// it is still scheduled for the same time.
async fn publish_if_still_due<S, C>(
    orchestrator: &OrchestratorService<S, C>,
    store: &S,
    armed: VideoRecord,
) -> VideoOutcome
where
    S: VideoStore,
    C: Clock,
{
    // Records without an id cannot be re-read; the orchestrator rejects them.
    let current = if armed.id.is_empty() {
        armed.clone()
    } else {
        match store.get(&armed.id).await {
            Ok(current) => current,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(video_id = %armed.id, "Video deleted before publish");
                return VideoOutcome::Skipped {
                    video_id: armed.id,
                };
            }
            Err(e) => {
                tracing::error!(video_id = %armed.id, error = %e, "Failed to re-read video");
                return VideoOutcome::Failed {
                    video_id: armed.id,
                    error: e.into(),
                };
            }
        }
    };

    let unchanged = current.status == VideoStatus::Scheduled
        && current.scheduled_date == armed.scheduled_date;
    if !unchanged {
        tracing::info!(
            video_id = %current.id,
            status = ?current.status,
            "Video changed before publish, skipping"
        );
        return VideoOutcome::Skipped {
            video_id: current.id,
        };
    }

    match orchestrator.publish_video(&current).await {
        Ok(report) => VideoOutcome::Published(report),
        // only the final status write can fail with a store error
        Err(OrchestratorError::Store(error)) => {
            tracing::error!(
                video_id = %current.id,
                error = %error,
                "Publish attempted but status not saved, holding video until restart"
            );
            VideoOutcome::Unrecorded {
                video_id: current.id,
                error,
            }
        }
        Err(error) => {
            tracing::error!(video_id = %current.id, error = %error, "Publish run failed");
            VideoOutcome::Failed {
                video_id: current.id,
                error,
            }
        }
    }
}

fn release(in_flight: &Mutex<HashSet<String>>, video_id: &str) {
    in_flight
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(video_id);
}

pub fn log_outcomes(outcomes: &[VideoOutcome]) {
    for outcome in outcomes {
        match outcome {
            VideoOutcome::Published(report) => tracing::info!(
                video_id = %report.video_id,
                status = ?report.status,
                "Video processed"
            ),
            VideoOutcome::Skipped { video_id } => {
                tracing::info!(%video_id, "Video skipped")
            }
            VideoOutcome::Failed { video_id, error } => {
                tracing::warn!(%video_id, error = %error, "Video not published")
            }
            VideoOutcome::Unrecorded { video_id, error } => {
                tracing::error!(%video_id, error = %error, "Video outcome not saved")
            }
        }
    }
}
