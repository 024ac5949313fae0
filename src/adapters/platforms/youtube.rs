//! YouTube Data API v3 resumable upload.

use super::{ensure_success, media_size};
use crate::domain::video::Platform;
use crate::error::PublishError;
use crate::ports::publisher::{MediaRef, PlatformPublisher, PublishOptions, PublishResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// "People & Blogs"
const CATEGORY_ID: &str = "22";

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

#[derive(Clone)]
pub struct YoutubePublisher {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl YoutubePublisher {
    pub fn new(client: reqwest::Client, access_token: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Opens a resumable upload session and returns its URI.
    async fn start_session(
        &self,
        size: u64,
        options: &PublishOptions,
    ) -> Result<String, PublishError> {
        let metadata = json!({
            "snippet": {
                "title": options.title.clone().unwrap_or_default(),
                "description": options.caption,
                "categoryId": CATEGORY_ID,
            },
            "status": {
                "privacyStatus": "public",
            },
        });

        let response = self
            .client
            .post(format!("{}/upload/youtube/v3/videos", self.base_url))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", size.to_string())
            .json(&metadata)
            .send()
            .await?;
        let response = ensure_success(Platform::Youtube, response).await?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PublishError::UnexpectedResponse {
                platform: Platform::Youtube,
                reason: "no Location header in upload session response".to_string(),
            })
    }
}

#[async_trait]
impl PlatformPublisher for YoutubePublisher {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn publish(
        &self,
        media: &MediaRef,
        options: &PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        let size = media_size(Platform::Youtube, &media.path).await?;
        let session_uri = self.start_session(size, options).await?;
        tracing::debug!(session_uri = %session_uri, size, "YouTube upload session opened");

        let file = tokio::fs::File::open(&media.path)
            .await
            .map_err(|source| PublishError::Media {
                path: media.path.clone(),
                source,
            })?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .put(&session_uri)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, "video/*")
            .header(CONTENT_LENGTH, size.to_string())
            .body(body)
            .send()
            .await?;
        let uploaded: UploadedVideo = ensure_success(Platform::Youtube, response)
            .await?
            .json()
            .await?;

        Ok(PublishResult {
            platform: Platform::Youtube,
            remote_id: uploaded.id,
        })
    }
}
