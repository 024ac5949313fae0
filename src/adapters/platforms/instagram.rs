//! Instagram Reels publishing through the Graph API: create a resumable
//! media container, upload the bytes, wait for processing, then publish.

use super::{ensure_success, media_size, GRAPH_API_VERSION};
use crate::domain::video::Platform;
use crate::error::PublishError;
use crate::ports::publisher::{MediaRef, PlatformPublisher, PublishOptions, PublishResult};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://rupload.facebook.com";

const DEFAULT_STATUS_CHECKS: u32 = 30;
const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Container {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    #[serde(default)]
    status_code: String,
}

#[derive(Debug, Deserialize)]
struct PublishedMedia {
    id: String,
}

#[derive(Clone)]
pub struct InstagramPublisher {
    client: reqwest::Client,
    base_url: String,
    upload_url: String,
    access_token: String,
    user_id: String,
    status_checks: u32,
    status_interval: Duration,
}

impl InstagramPublisher {
    pub fn new(client: reqwest::Client, access_token: String, user_id: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            access_token,
            user_id,
            status_checks: DEFAULT_STATUS_CHECKS,
            status_interval: DEFAULT_STATUS_INTERVAL,
        }
    }

    /// Points both the Graph API and the upload host at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.upload_url = base_url.clone();
        self.base_url = base_url;
        self
    }

    pub fn with_status_polling(mut self, checks: u32, interval: Duration) -> Self {
        self.status_checks = checks;
        self.status_interval = interval;
        self
    }

    fn graph_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, GRAPH_API_VERSION, path)
    }

    async fn create_container(&self, options: &PublishOptions) -> Result<Container, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/media", self.user_id)))
            .query(&[
                ("media_type", "REELS"),
                ("upload_type", "resumable"),
                ("caption", options.caption.as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        Ok(ensure_success(Platform::Instagram, response)
            .await?
            .json()
            .await?)
    }

    async fn upload(
        &self,
        container_id: &str,
        media: &MediaRef,
        size: u64,
    ) -> Result<(), PublishError> {
        let bytes = tokio::fs::read(&media.path)
            .await
            .map_err(|source| PublishError::Media {
                path: media.path.clone(),
                source,
            })?;

        let response = self
            .client
            .post(format!(
                "{}/ig-api-upload/{}/{}",
                self.upload_url, GRAPH_API_VERSION, container_id
            ))
            .header(AUTHORIZATION, format!("OAuth {}", self.access_token))
            .header("offset", "0")
            .header("file_size", size.to_string())
            .body(bytes)
            .send()
            .await?;
        ensure_success(Platform::Instagram, response).await?;
        Ok(())
    }

    /// Polls the container until Instagram has finished processing it.
    async fn wait_until_ready(&self, container_id: &str) -> Result<(), PublishError> {
        for attempt in 1..=self.status_checks {
            let response = self
                .client
                .get(self.graph_url(container_id))
                .query(&[
                    ("fields", "status_code"),
                    ("access_token", self.access_token.as_str()),
                ])
                .send()
                .await?;
            let status: ContainerStatus = ensure_success(Platform::Instagram, response)
                .await?
                .json()
                .await?;

            match status.status_code.as_str() {
                "FINISHED" => return Ok(()),
                "ERROR" | "EXPIRED" => {
                    return Err(PublishError::Processing {
                        platform: Platform::Instagram,
                        reason: format!("container {} is {}", container_id, status.status_code),
                    })
                }
                other => {
                    tracing::debug!(container_id, attempt, status = other, "Reel still processing");
                    tokio::time::sleep(self.status_interval).await;
                }
            }
        }

        Err(PublishError::Processing {
            platform: Platform::Instagram,
            reason: format!(
                "container {} not ready after {} checks",
                container_id, self.status_checks
            ),
        })
    }

    async fn publish_container(&self, container_id: &str) -> Result<PublishedMedia, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/media_publish", self.user_id)))
            .query(&[
                ("creation_id", container_id),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        Ok(ensure_success(Platform::Instagram, response)
            .await?
            .json()
            .await?)
    }
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn publish(
        &self,
        media: &MediaRef,
        options: &PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        let size = media_size(Platform::Instagram, &media.path).await?;
        let container = self.create_container(options).await?;
        self.upload(&container.id, media, size).await?;
        self.wait_until_ready(&container.id).await?;
        let published = self.publish_container(&container.id).await?;

        Ok(PublishResult {
            platform: Platform::Instagram,
            remote_id: published.id,
        })
    }
}
