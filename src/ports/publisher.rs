use crate::domain::video::{Platform, VideoRecord};
use crate::error::PublishError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reference to the media asset being published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub path: PathBuf,
}

/// Per-platform publish options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub title: Option<String>,
    pub caption: String,
}

impl PublishOptions {
    /// Derives what each platform accepts from the record's metadata.
    pub fn for_platform(video: &VideoRecord, platform: Platform) -> Self {
        let title = Some(video.title.clone()).filter(|t| !t.is_empty());
        match platform {
            Platform::Youtube | Platform::Facebook => Self {
                title,
                caption: video.description.clone(),
            },
            Platform::Tiktok => Self {
                title: None,
                caption: video.title.clone(),
            },
            Platform::Instagram => Self {
                title: None,
                caption: video.description.clone(),
            },
        }
    }
}

/// Identifier the platform assigned to the published video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub platform: Platform,
    pub remote_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Upload and publish one video
    async fn publish(
        &self,
        media: &MediaRef,
        options: &PublishOptions,
    ) -> Result<PublishResult, PublishError>;
}
