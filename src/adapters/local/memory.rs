use crate::domain::video::{StatusUpdate, VideoRecord};
use crate::error::StoreError;
use crate::ports::repository::VideoStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process `VideoStore`, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    videos: RwLock<Vec<VideoRecord>>,
}

impl InMemoryStore {
    pub fn new(videos: Vec<VideoRecord>) -> Self {
        Self {
            videos: RwLock::new(videos),
        }
    }

    pub async fn remove(&self, id: &str) -> Option<VideoRecord> {
        let mut videos = self.videos.write().await;
        let index = videos.iter().position(|v| v.id == id)?;
        Some(videos.remove(index))
    }

    /// Replaces a record wholesale, as an editor would.
    pub async fn replace(&self, video: VideoRecord) -> Result<(), StoreError> {
        let mut videos = self.videos.write().await;
        let slot = videos
            .iter_mut()
            .find(|v| v.id == video.id)
            .ok_or_else(|| StoreError::NotFound(video.id.clone()))?;
        *slot = video;
        Ok(())
    }
}

#[async_trait]
impl VideoStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<VideoRecord>, StoreError> {
        Ok(self.videos.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<VideoRecord, StoreError> {
        self.videos
            .read()
            .await
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, update: &StatusUpdate) -> Result<VideoRecord, StoreError> {
        let mut videos = self.videos.write().await;
        let video = videos
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        video.apply(update);
        Ok(video.clone())
    }
}
