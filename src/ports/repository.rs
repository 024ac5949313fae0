use crate::domain::video::{StatusUpdate, VideoRecord};
use crate::error::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// All records, in store order
    async fn list(&self) -> Result<Vec<VideoRecord>, StoreError>;

    /// A single record by id
    async fn get(&self, id: &str) -> Result<VideoRecord, StoreError>;

    /// Apply a publish result to one record and persist the whole store.
    /// Implementations must make the read-modify-write atomic with respect
    /// to other updates on the same store.
    async fn update(&self, id: &str, update: &StatusUpdate) -> Result<VideoRecord, StoreError>;
}
