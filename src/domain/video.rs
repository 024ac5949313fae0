use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// A video-sharing service a record can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Tiktok,
        Platform::Instagram,
        Platform::Facebook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video-level lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoStatus {
    #[default]
    AwaitingDetails,
    Scheduled,
    Published,
    PartiallyPublished,
    Failed,
}

/// Outcome of one publish attempt on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformOutcome {
    Success,
    Failed,
}

/// A persisted video, one entry of the store's `videos` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub publish_status: BTreeMap<Platform, PlatformOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields owned by the upload flow (filename, thumbnail, size, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoRecord {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            title: String::new(),
            description: String::new(),
            platforms: Vec::new(),
            scheduled_date: None,
            status: VideoStatus::AwaitingDetails,
            publish_status: BTreeMap::new(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Declared platforms with duplicates removed.
    pub fn platform_set(&self) -> BTreeSet<Platform> {
        self.platforms.iter().copied().collect()
    }

    /// Applies a status update produced by a publish run.
    pub fn apply(&mut self, update: &StatusUpdate) {
        for (platform, outcome) in &update.publish_status {
            self.publish_status.insert(*platform, *outcome);
        }
        self.status = update.status;
        self.updated_at = Some(update.updated_at);
    }
}

// The editor clears the schedule by sending an empty string.
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// The only fields a publish run is allowed to write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub publish_status: BTreeMap<Platform, PlatformOutcome>,
    pub status: VideoStatus,
    pub updated_at: DateTime<Utc>,
}

/// Derives the video-level status from per-platform outcomes over `platforms`.
///
/// A declared platform with no recorded outcome counts as not successful.
pub fn aggregate_status(
    platforms: &BTreeSet<Platform>,
    outcomes: &BTreeMap<Platform, PlatformOutcome>,
) -> VideoStatus {
    let succeeded = platforms
        .iter()
        .filter(|p| outcomes.get(p) == Some(&PlatformOutcome::Success))
        .count();

    if succeeded == 0 {
        VideoStatus::Failed
    } else if succeeded == platforms.len() {
        VideoStatus::Published
    } else {
        VideoStatus::PartiallyPublished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcomes(entries: &[(Platform, PlatformOutcome)]) -> BTreeMap<Platform, PlatformOutcome> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_aggregate_all_success_is_published() {
        let platforms = BTreeSet::from([Platform::Youtube, Platform::Tiktok]);
        let status = aggregate_status(
            &platforms,
            &outcomes(&[
                (Platform::Youtube, PlatformOutcome::Success),
                (Platform::Tiktok, PlatformOutcome::Success),
            ]),
        );
        assert_eq!(status, VideoStatus::Published);
    }

    #[test]
    fn test_aggregate_all_failed_is_failed() {
        let platforms = BTreeSet::from([Platform::Youtube, Platform::Tiktok]);
        let status = aggregate_status(
            &platforms,
            &outcomes(&[
                (Platform::Youtube, PlatformOutcome::Failed),
                (Platform::Tiktok, PlatformOutcome::Failed),
            ]),
        );
        assert_eq!(status, VideoStatus::Failed);
    }

    #[test]
    fn test_aggregate_mix_is_partially_published() {
        let platforms = BTreeSet::from([Platform::Youtube, Platform::Tiktok]);
        let status = aggregate_status(
            &platforms,
            &outcomes(&[
                (Platform::Youtube, PlatformOutcome::Failed),
                (Platform::Tiktok, PlatformOutcome::Success),
            ]),
        );
        assert_eq!(status, VideoStatus::PartiallyPublished);
    }

    #[test]
    fn test_aggregate_ignores_undeclared_platforms() {
        let platforms = BTreeSet::from([Platform::Facebook]);
        let status = aggregate_status(
            &platforms,
            &outcomes(&[
                (Platform::Facebook, PlatformOutcome::Success),
                (Platform::Instagram, PlatformOutcome::Failed),
            ]),
        );
        assert_eq!(status, VideoStatus::Published);
    }

    #[test]
    fn test_record_keeps_upload_fields() {
        let raw = json!({
            "id": "1700000000000",
            "title": "Trip",
            "filename": "1700000000000-42.mp4",
            "thumbnail": "https://via.placeholder.com/400x225",
            "sizeBytes": 1024,
            "status": "scheduled",
            "platforms": ["youtube", "tiktok"],
            "scheduledDate": "2024-05-01T10:00:00Z",
            "path": "uploads/1700000000000-42.mp4"
        });

        let record: VideoRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.status, VideoStatus::Scheduled);
        assert_eq!(record.platforms, vec![Platform::Youtube, Platform::Tiktok]);
        assert_eq!(record.extra.get("sizeBytes"), Some(&json!(1024)));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["filename"], raw["filename"]);
        assert_eq!(back["thumbnail"], raw["thumbnail"]);
        assert_eq!(back["scheduledDate"], json!("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_empty_scheduled_date_is_unscheduled() {
        let record: VideoRecord = serde_json::from_value(json!({
            "id": "2",
            "status": "awaiting-details",
            "scheduledDate": ""
        }))
        .unwrap();
        assert_eq!(record.scheduled_date, None);
    }

    #[test]
    fn test_scheduled_date_with_offset_is_normalized() {
        let record: VideoRecord = serde_json::from_value(json!({
            "id": "3",
            "scheduledDate": "2024-05-01T12:00:00+02:00"
        }))
        .unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(record.scheduled_date, Some(expected.with_timezone(&Utc)));
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let value = serde_json::to_value(VideoStatus::PartiallyPublished).unwrap();
        assert_eq!(value, json!("partially-published"));
        let value = serde_json::to_value(VideoStatus::AwaitingDetails).unwrap();
        assert_eq!(value, json!("awaiting-details"));
    }

    #[test]
    fn test_apply_merges_publish_status() {
        let mut record = VideoRecord::new("1", "a.mp4");
        record.publish_status.insert(Platform::Facebook, PlatformOutcome::Success);

        let update = StatusUpdate {
            publish_status: outcomes(&[(Platform::Youtube, PlatformOutcome::Failed)]),
            status: VideoStatus::Failed,
            updated_at: Utc::now(),
        };
        record.apply(&update);

        assert_eq!(record.publish_status.len(), 2);
        assert_eq!(record.status, VideoStatus::Failed);
        assert_eq!(record.updated_at, Some(update.updated_at));
    }
}
