//! HTTP publishers for the supported video platforms.
//!
//! Each adapter takes a ready-to-use access token; obtaining and refreshing
//! tokens happens elsewhere.

pub mod facebook;
pub mod instagram;
pub mod tiktok;
pub mod youtube;

pub use facebook::FacebookPublisher;
pub use instagram::InstagramPublisher;
pub use tiktok::TiktokPublisher;
pub use youtube::YoutubePublisher;

use crate::config::PlatformCredentials;
use crate::domain::video::Platform;
use crate::error::PublishError;
use crate::ports::publisher::PlatformPublisher;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Graph API version shared by the Facebook and Instagram adapters.
pub(crate) const GRAPH_API_VERSION: &str = "v21.0";

/// Builds a publisher for every platform that has credentials.
pub fn from_credentials(
    credentials: &PlatformCredentials,
    client: reqwest::Client,
) -> Vec<Arc<dyn PlatformPublisher>> {
    let mut publishers: Vec<Arc<dyn PlatformPublisher>> = Vec::new();

    if let Some(token) = &credentials.youtube_access_token {
        publishers.push(Arc::new(YoutubePublisher::new(client.clone(), token.clone())));
    }
    if let Some(token) = &credentials.tiktok_access_token {
        publishers.push(Arc::new(TiktokPublisher::new(
            client.clone(),
            token.clone(),
            credentials.tiktok_privacy_level.clone(),
        )));
    }
    if let (Some(token), Some(user_id)) = (
        &credentials.instagram_access_token,
        &credentials.instagram_user_id,
    ) {
        publishers.push(Arc::new(InstagramPublisher::new(
            client.clone(),
            token.clone(),
            user_id.clone(),
        )));
    }
    if let (Some(token), Some(page_id)) = (
        &credentials.facebook_access_token,
        &credentials.facebook_page_id,
    ) {
        publishers.push(Arc::new(FacebookPublisher::new(
            client,
            token.clone(),
            page_id.clone(),
        )));
    }

    for platform in Platform::ALL {
        if !publishers.iter().any(|p| p.platform() == platform) {
            tracing::warn!(%platform, "No credentials configured, publishing will fail");
        }
    }
    publishers
}

/// Turns a non-2xx response into `PublishError::Api`.
pub(crate) async fn ensure_success(
    platform: Platform,
    response: reqwest::Response,
) -> Result<reqwest::Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Api {
        platform,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn media_size(platform: Platform, path: &Path) -> Result<u64, PublishError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| PublishError::Media {
            path: path.to_path_buf(),
            source,
        })?;
    if metadata.len() == 0 {
        return Err(PublishError::Processing {
            platform,
            reason: format!("media file {:?} is empty", path),
        });
    }
    Ok(metadata.len())
}

/// Reads `len` bytes starting at `offset`.
pub(crate) async fn read_range(
    path: &Path,
    offset: u64,
    len: u64,
) -> Result<Vec<u8>, PublishError> {
    let media_err = |source: std::io::Error| PublishError::Media {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(media_err)?;
    file.seek(std::io::SeekFrom::Start(offset))
        .await
        .map_err(media_err)?;
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf).await.map_err(media_err)?;
    Ok(buf)
}
