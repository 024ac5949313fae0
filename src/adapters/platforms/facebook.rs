//! Facebook page video upload through the Graph API's three-phase flow:
//! `start` opens a session, `transfer` sends chunks at the offsets the API
//! asks for, `finish` attaches metadata and publishes.

use super::{ensure_success, media_size, read_range, GRAPH_API_VERSION};
use crate::domain::video::Platform;
use crate::error::PublishError;
use crate::ports::publisher::{MediaRef, PlatformPublisher, PublishOptions, PublishResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";

#[derive(Debug, Deserialize)]
struct StartResponse {
    video_id: String,
    upload_session_id: String,
    start_offset: String,
    end_offset: String,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    start_offset: String,
    end_offset: String,
}

#[derive(Debug, Deserialize)]
struct FinishResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Clone)]
pub struct FacebookPublisher {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    page_id: String,
}

impl FacebookPublisher {
    pub fn new(client: reqwest::Client, access_token: String, page_id: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token,
            page_id,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn videos_url(&self) -> String {
        format!(
            "{}/{}/{}/videos",
            self.base_url, GRAPH_API_VERSION, self.page_id
        )
    }

    async fn start(&self, size: u64) -> Result<StartResponse, PublishError> {
        let file_size = size.to_string();
        let response = self
            .client
            .post(self.videos_url())
            .query(&[
                ("upload_phase", "start"),
                ("file_size", file_size.as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        Ok(ensure_success(Platform::Facebook, response)
            .await?
            .json()
            .await?)
    }

    async fn transfer(
        &self,
        media: &MediaRef,
        session_id: &str,
        start: u64,
        end: u64,
    ) -> Result<TransferResponse, PublishError> {
        let chunk = read_range(&media.path, start, end - start).await?;
        let form = Form::new().part(
            "video_file_chunk",
            Part::bytes(chunk).file_name("chunk"),
        );

        let start_offset = start.to_string();
        let response = self
            .client
            .post(self.videos_url())
            .query(&[
                ("upload_phase", "transfer"),
                ("upload_session_id", session_id),
                ("start_offset", start_offset.as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .multipart(form)
            .send()
            .await?;
        Ok(ensure_success(Platform::Facebook, response)
            .await?
            .json()
            .await?)
    }

    async fn finish(
        &self,
        session_id: &str,
        options: &PublishOptions,
    ) -> Result<FinishResponse, PublishError> {
        let mut params = vec![
            ("upload_phase", "finish"),
            ("upload_session_id", session_id),
            ("access_token", self.access_token.as_str()),
        ];
        if let Some(title) = options.title.as_deref() {
            params.push(("title", title));
        }
        if !options.caption.is_empty() {
            params.push(("description", options.caption.as_str()));
        }

        let response = self
            .client
            .post(self.videos_url())
            .query(&params)
            .send()
            .await?;
        Ok(ensure_success(Platform::Facebook, response)
            .await?
            .json()
            .await?)
    }
}

fn parse_offset(value: &str) -> Result<u64, PublishError> {
    value
        .parse()
        .map_err(|_| PublishError::UnexpectedResponse {
            platform: Platform::Facebook,
            reason: format!("invalid upload offset '{}'", value),
        })
}

#[async_trait]
impl PlatformPublisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn publish(
        &self,
        media: &MediaRef,
        options: &PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        let size = media_size(Platform::Facebook, &media.path).await?;
        let session = self.start(size).await?;
        tracing::debug!(
            page_id = %self.page_id,
            session_id = %session.upload_session_id,
            size,
            "Facebook upload session created"
        );

        let mut start = parse_offset(&session.start_offset)?;
        let mut end = parse_offset(&session.end_offset)?;
        while start < end {
            let chunk_end = end.min(size);
            if chunk_end <= start {
                return Err(PublishError::UnexpectedResponse {
                    platform: Platform::Facebook,
                    reason: format!("offset {} is past the end of the file", start),
                });
            }
            let next = self
                .transfer(media, &session.upload_session_id, start, chunk_end)
                .await?;
            let next_start = parse_offset(&next.start_offset)?;
            if next_start <= start {
                return Err(PublishError::UnexpectedResponse {
                    platform: Platform::Facebook,
                    reason: format!("upload stalled at offset {}", start),
                });
            }
            start = next_start;
            end = parse_offset(&next.end_offset)?;
        }

        let finished = self.finish(&session.upload_session_id, options).await?;
        if !finished.success {
            return Err(PublishError::Processing {
                platform: Platform::Facebook,
                reason: "finish phase was not acknowledged".to_string(),
            });
        }

        Ok(PublishResult {
            platform: Platform::Facebook,
            remote_id: session.video_id,
        })
    }
}
