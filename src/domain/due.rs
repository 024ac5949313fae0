//! Due-window selection over persisted video records.

use super::video::{VideoRecord, VideoStatus};
use chrono::{DateTime, Duration, Utc};

/// Default look-ahead window for scheduled publishes.
pub const DEFAULT_HORIZON: Duration = Duration::minutes(5);

/// Returns whether `video` should be armed for publishing at `now`.
///
/// Past-due videos stay eligible while still `scheduled`; videos scheduled
/// `horizon` or more ahead are left for a later pass.
pub fn is_due(video: &VideoRecord, now: DateTime<Utc>, horizon: Duration) -> bool {
    if video.status != VideoStatus::Scheduled {
        return false;
    }
    match video.scheduled_date {
        Some(at) => at - now < horizon,
        None => false,
    }
}

/// Selects the due videos, ordered by scheduled date.
pub fn due_videos(
    videos: Vec<VideoRecord>,
    now: DateTime<Utc>,
    horizon: Duration,
) -> Vec<VideoRecord> {
    let mut due: Vec<VideoRecord> = videos
        .into_iter()
        .filter(|video| is_due(video, now, horizon))
        .collect();
    // stable: ties keep store order
    due.sort_by_key(|video| video.scheduled_date);
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::video::Platform;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn scheduled(id: &str, at: DateTime<Utc>) -> VideoRecord {
        let mut video = VideoRecord::new(id, format!("uploads/{id}.mp4"));
        video.status = VideoStatus::Scheduled;
        video.platforms = vec![Platform::Youtube];
        video.scheduled_date = Some(at);
        video
    }

    #[test]
    fn test_within_horizon_is_due() {
        let video = scheduled("1", now() + Duration::minutes(2));
        assert!(is_due(&video, now(), DEFAULT_HORIZON));
    }

    #[test]
    fn test_exactly_horizon_is_not_due() {
        let video = scheduled("1", now() + DEFAULT_HORIZON);
        assert!(!is_due(&video, now(), DEFAULT_HORIZON));

        let earlier = now() + Duration::milliseconds(1);
        assert!(is_due(&video, earlier, DEFAULT_HORIZON));
    }

    #[test]
    fn test_past_due_is_still_due() {
        let video = scheduled("1", now() - Duration::hours(3));
        assert!(is_due(&video, now(), DEFAULT_HORIZON));
    }

    #[test]
    fn test_non_scheduled_statuses_are_never_due() {
        for status in [
            VideoStatus::AwaitingDetails,
            VideoStatus::Published,
            VideoStatus::PartiallyPublished,
            VideoStatus::Failed,
        ] {
            let mut video = scheduled("1", now());
            video.status = status;
            assert!(!is_due(&video, now(), DEFAULT_HORIZON), "{status:?}");
        }
    }

    #[test]
    fn test_missing_date_is_not_due() {
        let mut video = scheduled("1", now());
        video.scheduled_date = None;
        assert!(!is_due(&video, now(), DEFAULT_HORIZON));
    }

    #[test]
    fn test_due_videos_sorted_by_date() {
        let videos = vec![
            scheduled("late", now() + Duration::minutes(4)),
            scheduled("far", now() + Duration::hours(1)),
            scheduled("early", now() - Duration::minutes(1)),
            scheduled("mid", now() + Duration::minutes(1)),
        ];

        let ids: Vec<String> = due_videos(videos, now(), DEFAULT_HORIZON)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
    }
}
