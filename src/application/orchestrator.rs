use crate::domain::video::{
    aggregate_status, Platform, PlatformOutcome, StatusUpdate, VideoRecord, VideoStatus,
};
use crate::error::{OrchestratorError, PublishError, ValidationError};
use crate::ports::clock::Clock;
use crate::ports::publisher::{MediaRef, PlatformPublisher, PublishOptions};
use crate::ports::repository::VideoStore;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// One publisher per platform.
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: HashMap<Platform, Arc<dyn PlatformPublisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `publisher`, replacing any earlier one for the same platform.
    pub fn register(&mut self, publisher: Arc<dyn PlatformPublisher>) {
        self.publishers.insert(publisher.platform(), publisher);
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn PlatformPublisher>> {
        self.publishers.get(&platform)
    }

    pub fn platforms(&self) -> BTreeSet<Platform> {
        self.publishers.keys().copied().collect()
    }
}

impl FromIterator<Arc<dyn PlatformPublisher>> for PublisherRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn PlatformPublisher>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for publisher in iter {
            registry.register(publisher);
        }
        registry
    }
}

/// Result of one publish run over a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub video_id: String,
    pub status: VideoStatus,
    pub succeeded: Vec<Platform>,
    pub failed: Vec<Platform>,
}

pub struct OrchestratorService<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    publishers: PublisherRegistry,
}

impl<S, C> OrchestratorService<S, C>
where
    S: VideoStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, publishers: PublisherRegistry) -> Self {
        Self {
            store,
            clock,
            publishers,
        }
    }

    /// Publishes `video` to each of its platforms and persists the outcome.
    ///
    /// Platform failures are recorded, never returned. Only an invalid record
    /// or a failed status write is an error.
    pub async fn publish_video(
        &self,
        video: &VideoRecord,
    ) -> Result<PublishReport, OrchestratorError> {
        let platforms = video.platform_set();

        if let Err(e) = validate(video, &platforms) {
            self.record_rejection(video, &platforms).await;
            return Err(e.into());
        }

        tracing::info!(
            video_id = %video.id,
            title = %video.title,
            platforms = ?platforms,
            "Publishing video"
        );

        let attempts = platforms
            .iter()
            .map(|&platform| self.attempt(video, platform));
        let outcomes: BTreeMap<Platform, PlatformOutcome> =
            join_all(attempts).await.into_iter().collect();

        let status = aggregate_status(&platforms, &outcomes);
        let update = StatusUpdate {
            publish_status: outcomes.clone(),
            status,
            updated_at: self.clock.now(),
        };
        self.store.update(&video.id, &update).await?;

        let (succeeded, failed): (Vec<_>, Vec<_>) = outcomes
            .iter()
            .partition(|(_, outcome)| **outcome == PlatformOutcome::Success);
        let report = PublishReport {
            video_id: video.id.clone(),
            status,
            succeeded: succeeded.into_iter().map(|(p, _)| *p).collect(),
            failed: failed.into_iter().map(|(p, _)| *p).collect(),
        };

        tracing::info!(
            video_id = %report.video_id,
            status = ?report.status,
            succeeded = ?report.succeeded,
            failed = ?report.failed,
            "Publish run finished"
        );
        Ok(report)
    }

    /// Runs one platform's publisher; any error or panic becomes `Failed`.
    async fn attempt(
        &self,
        video: &VideoRecord,
        platform: Platform,
    ) -> (Platform, PlatformOutcome) {
        let result = match self.publishers.get(platform) {
            None => Err(PublishError::NotConfigured(platform)),
            Some(publisher) => {
                let media = MediaRef {
                    path: video.path.clone(),
                };
                let options = PublishOptions::for_platform(video, platform);
                AssertUnwindSafe(async { publisher.publish(&media, &options).await })
                    .catch_unwind()
                    .await
                    .unwrap_or(Err(PublishError::Panicked(platform)))
            }
        };

        match result {
            Ok(published) => {
                tracing::info!(
                    video_id = %video.id,
                    %platform,
                    remote_id = %published.remote_id,
                    "Published to platform"
                );
                (platform, PlatformOutcome::Success)
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %video.id,
                    %platform,
                    error = %e,
                    "Platform publish failed"
                );
                (platform, PlatformOutcome::Failed)
            }
        }
    }

    /// Best-effort: marks every declared platform failed on a rejected record.
    async fn record_rejection(&self, video: &VideoRecord, platforms: &BTreeSet<Platform>) {
        if video.id.is_empty() {
            tracing::warn!(title = %video.title, "Rejected video has no id, status not persisted");
            return;
        }

        let update = StatusUpdate {
            publish_status: platforms
                .iter()
                .map(|&p| (p, PlatformOutcome::Failed))
                .collect(),
            status: VideoStatus::Failed,
            updated_at: self.clock.now(),
        };
        if let Err(e) = self.store.update(&video.id, &update).await {
            tracing::error!(video_id = %video.id, error = %e, "Failed to persist rejection");
        }
    }
}

fn validate(video: &VideoRecord, platforms: &BTreeSet<Platform>) -> Result<(), ValidationError> {
    if video.id.trim().is_empty() {
        return Err(ValidationError::MissingId);
    }
    if platforms.is_empty() {
        return Err(ValidationError::NoPlatforms(video.id.clone()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::local::InMemoryStore;
    use crate::ports::clock::ManualClock;
    use crate::ports::publisher::{MockPlatformPublisher, PublishResult};
    use crate::ports::repository::VideoStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub(crate) fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    pub(crate) fn scheduled_video(id: &str, platforms: &[Platform]) -> VideoRecord {
        let mut video = VideoRecord::new(id, format!("uploads/{id}.mp4"));
        video.title = "Sunset".to_string();
        video.description = "Timelapse".to_string();
        video.platforms = platforms.to_vec();
        video.status = VideoStatus::Scheduled;
        video.scheduled_date = Some(run_time() + Duration::minutes(2));
        video
    }

    pub(crate) fn succeeding(platform: Platform, times: usize) -> Arc<dyn PlatformPublisher> {
        let mut publisher = MockPlatformPublisher::new();
        publisher.expect_platform().return_const(platform);
        publisher.expect_publish().times(times).returning(move |_, _| {
            Ok(PublishResult {
                platform,
                remote_id: format!("{platform}-remote"),
            })
        });
        Arc::new(publisher)
    }

    pub(crate) fn failing(platform: Platform, times: usize) -> Arc<dyn PlatformPublisher> {
        let mut publisher = MockPlatformPublisher::new();
        publisher.expect_platform().return_const(platform);
        publisher
            .expect_publish()
            .times(times)
            .returning(move |_, _| {
                Err(PublishError::Api {
                    platform,
                    status: 500,
                    body: "backend error".to_string(),
                })
            });
        Arc::new(publisher)
    }

    fn orchestrator(
        videos: Vec<VideoRecord>,
        publishers: Vec<Arc<dyn PlatformPublisher>>,
    ) -> (Arc<InMemoryStore>, OrchestratorService<InMemoryStore, ManualClock>) {
        let store = Arc::new(InMemoryStore::new(videos));
        let clock = Arc::new(ManualClock::new(run_time()));
        let registry: PublisherRegistry = publishers.into_iter().collect();
        let service = OrchestratorService::new(store.clone(), clock, registry);
        (store, service)
    }

    #[tokio::test]
    async fn test_failing_platform_does_not_affect_others() {
        let video = scheduled_video("1", &[Platform::Youtube, Platform::Tiktok]);
        let (store, service) = orchestrator(
            vec![video.clone()],
            vec![failing(Platform::Youtube, 1), succeeding(Platform::Tiktok, 1)],
        );

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.status, VideoStatus::PartiallyPublished);
        assert_eq!(report.succeeded, vec![Platform::Tiktok]);
        assert_eq!(report.failed, vec![Platform::Youtube]);

        let stored = store.get("1").await.unwrap();
        assert_eq!(stored.status, VideoStatus::PartiallyPublished);
        assert_eq!(
            stored.publish_status,
            BTreeMap::from([
                (Platform::Youtube, PlatformOutcome::Failed),
                (Platform::Tiktok, PlatformOutcome::Success),
            ])
        );
        assert_eq!(stored.updated_at, Some(run_time()));
        assert_eq!(stored.platforms, video.platforms);
    }

    #[tokio::test]
    async fn test_all_success_is_published() {
        let video = scheduled_video("1", &[Platform::Instagram, Platform::Facebook]);
        let (store, service) = orchestrator(
            vec![video.clone()],
            vec![
                succeeding(Platform::Instagram, 1),
                succeeding(Platform::Facebook, 1),
            ],
        );

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.status, VideoStatus::Published);
        assert!(report.failed.is_empty());
        assert_eq!(store.get("1").await.unwrap().status, VideoStatus::Published);
    }

    #[tokio::test]
    async fn test_all_failure_is_failed() {
        let video = scheduled_video("1", &[Platform::Youtube, Platform::Tiktok]);
        let (store, service) = orchestrator(
            vec![video.clone()],
            vec![failing(Platform::Youtube, 1), failing(Platform::Tiktok, 1)],
        );

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.status, VideoStatus::Failed);
        assert_eq!(store.get("1").await.unwrap().status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn test_unconfigured_platform_is_failed() {
        let video = scheduled_video("1", &[Platform::Youtube, Platform::Facebook]);
        let (store, service) =
            orchestrator(vec![video.clone()], vec![succeeding(Platform::Youtube, 1)]);

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.status, VideoStatus::PartiallyPublished);
        assert_eq!(
            store.get("1").await.unwrap().publish_status.get(&Platform::Facebook),
            Some(&PlatformOutcome::Failed)
        );
    }

    #[tokio::test]
    async fn test_panicking_publisher_is_isolated() {
        let mut exploding = MockPlatformPublisher::new();
        exploding.expect_platform().return_const(Platform::Instagram);
        exploding
            .expect_publish()
            .returning(|_, _| panic!("instagram client blew up"));

        let video = scheduled_video("1", &[Platform::Instagram, Platform::Tiktok]);
        let (_store, service) = orchestrator(
            vec![video.clone()],
            vec![Arc::new(exploding), succeeding(Platform::Tiktok, 1)],
        );

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.status, VideoStatus::PartiallyPublished);
        assert_eq!(report.failed, vec![Platform::Instagram]);
    }

    #[tokio::test]
    async fn test_duplicate_platforms_publish_once() {
        let video = scheduled_video("1", &[Platform::Tiktok, Platform::Tiktok]);
        let (_store, service) =
            orchestrator(vec![video.clone()], vec![succeeding(Platform::Tiktok, 1)]);

        let report = service.publish_video(&video).await.unwrap();
        assert_eq!(report.succeeded, vec![Platform::Tiktok]);
        assert_eq!(report.status, VideoStatus::Published);
    }

    #[tokio::test]
    async fn test_publisher_receives_platform_options() {
        let mut tiktok = MockPlatformPublisher::new();
        tiktok.expect_platform().return_const(Platform::Tiktok);
        tiktok
            .expect_publish()
            .withf(|media, options| {
                media.path == std::path::Path::new("uploads/1.mp4") && options.caption == "Sunset"
            })
            .times(1)
            .returning(|_, _| {
                Ok(PublishResult {
                    platform: Platform::Tiktok,
                    remote_id: "p-1".to_string(),
                })
            });

        let video = scheduled_video("1", &[Platform::Tiktok]);
        let (_store, service) = orchestrator(vec![video.clone()], vec![Arc::new(tiktok)]);
        service.publish_video(&video).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_platforms_is_validation_error() {
        let video = scheduled_video("1", &[]);
        let (store, service) =
            orchestrator(vec![video.clone()], vec![succeeding(Platform::Youtube, 0)]);

        let result = service.publish_video(&video).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Validation(ValidationError::NoPlatforms(_)))
        ));

        let stored = store.get("1").await.unwrap();
        assert_eq!(stored.status, VideoStatus::Failed);
        assert!(!stored
            .publish_status
            .values()
            .any(|o| *o == PlatformOutcome::Success));
    }

    #[tokio::test]
    async fn test_missing_id_is_validation_error() {
        let mut video = scheduled_video("", &[Platform::Youtube]);
        video.title = "No id".to_string();
        let (store, service) =
            orchestrator(vec![video.clone()], vec![succeeding(Platform::Youtube, 0)]);

        let result = service.publish_video(&video).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Validation(ValidationError::MissingId))
        ));

        let stored = store.list().await.unwrap();
        assert_eq!(stored[0].status, VideoStatus::Scheduled);
        assert!(stored[0].publish_status.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_on_published_record_is_stable() {
        let video = scheduled_video("1", &[Platform::Youtube, Platform::Facebook]);
        let (store, service) = orchestrator(
            vec![video.clone()],
            vec![succeeding(Platform::Youtube, 2), succeeding(Platform::Facebook, 2)],
        );

        let first = service.publish_video(&video).await.unwrap();
        let published = store.get("1").await.unwrap();
        let second = service.publish_video(&published).await.unwrap();
        let republished = store.get("1").await.unwrap();

        assert_eq!(first.status, VideoStatus::Published);
        assert_eq!(second, first);
        assert_eq!(republished.publish_status, published.publish_status);
        assert_eq!(republished.status, published.status);
    }

    #[tokio::test]
    async fn test_missing_record_is_store_error() {
        let video = scheduled_video("gone", &[Platform::Youtube]);
        let (_store, service) = orchestrator(vec![], vec![succeeding(Platform::Youtube, 1)]);

        let result = service.publish_video(&video).await;
        assert!(matches!(result, Err(OrchestratorError::Store(_))));
    }
}
