//! TikTok Content Posting API, direct post with file upload.

use super::{ensure_success, media_size, read_range};
use crate::domain::video::Platform;
use crate::error::PublishError;
use crate::ports::publisher::{MediaRef, PlatformPublisher, PublishOptions, PublishResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://open.tiktokapis.com";

const MIB: u64 = 1024 * 1024;
/// Files up to this size go up in a single chunk.
const SINGLE_CHUNK_LIMIT: u64 = 64 * MIB;
const CHUNK_SIZE: u64 = 10 * MIB;

/// How a file is split for upload. The final chunk absorbs the remainder,
/// so it can be up to twice `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub video_size: u64,
    pub chunk_size: u64,
    pub total_chunk_count: u64,
}

impl ChunkPlan {
    pub fn for_size(video_size: u64) -> Self {
        if video_size <= SINGLE_CHUNK_LIMIT {
            return Self {
                video_size,
                chunk_size: video_size,
                total_chunk_count: 1,
            };
        }
        Self {
            video_size,
            chunk_size: CHUNK_SIZE,
            total_chunk_count: video_size / CHUNK_SIZE,
        }
    }

    /// Inclusive byte range of chunk `index`.
    pub fn range(&self, index: u64) -> (u64, u64) {
        let start = index * self.chunk_size;
        let end = if index + 1 == self.total_chunk_count {
            self.video_size - 1
        } else {
            start + self.chunk_size - 1
        };
        (start, end)
    }
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    data: Option<InitData>,
    error: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct InitData {
    publish_id: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct TiktokPublisher {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    privacy_level: String,
}

impl TiktokPublisher {
    pub fn new(client: reqwest::Client, access_token: String, privacy_level: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token,
            privacy_level,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn init(
        &self,
        plan: &ChunkPlan,
        options: &PublishOptions,
    ) -> Result<InitData, PublishError> {
        let body = json!({
            "post_info": {
                "title": options.caption,
                "privacy_level": self.privacy_level,
            },
            "source_info": {
                "source": "FILE_UPLOAD",
                "video_size": plan.video_size,
                "chunk_size": plan.chunk_size,
                "total_chunk_count": plan.total_chunk_count,
            },
        });

        let response = self
            .client
            .post(format!("{}/v2/post/publish/video/init/", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let init: InitResponse = ensure_success(Platform::Tiktok, response)
            .await?
            .json()
            .await?;

        if init.error.code != "ok" {
            return Err(PublishError::Processing {
                platform: Platform::Tiktok,
                reason: format!("{}: {}", init.error.code, init.error.message),
            });
        }
        init.data.ok_or_else(|| PublishError::UnexpectedResponse {
            platform: Platform::Tiktok,
            reason: "init response has no data".to_string(),
        })
    }
}

#[async_trait]
impl PlatformPublisher for TiktokPublisher {
    fn platform(&self) -> Platform {
        Platform::Tiktok
    }

    async fn publish(
        &self,
        media: &MediaRef,
        options: &PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        let size = media_size(Platform::Tiktok, &media.path).await?;
        let plan = ChunkPlan::for_size(size);
        let upload = self.init(&plan, options).await?;

        for index in 0..plan.total_chunk_count {
            let (start, end) = plan.range(index);
            let chunk = read_range(&media.path, start, end - start + 1).await?;
            let response = self
                .client
                .put(&upload.upload_url)
                .header(CONTENT_TYPE, "video/mp4")
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size))
                .body(chunk)
                .send()
                .await?;
            ensure_success(Platform::Tiktok, response).await?;
            tracing::debug!(publish_id = %upload.publish_id, index, "TikTok chunk uploaded");
        }

        Ok(PublishResult {
            platform: Platform::Tiktok,
            remote_id: upload.publish_id,
        })
    }
}
