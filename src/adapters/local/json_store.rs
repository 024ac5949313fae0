//! File-backed `VideoStore` over the upload server's `videos.json`.
//!
//! Records are typed on read. Status writes patch the raw JSON entry, so
//! everything else stays exactly as the upload server wrote it.

use crate::domain::video::{StatusUpdate, VideoRecord};
use crate::error::StoreError;
use crate::ports::repository::VideoStore;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Every access goes through one async mutex so concurrent publish runs
/// cannot lose each other's writes. Files are replaced atomically.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, reason: impl ToString) -> StoreError {
        StoreError::Read {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// On-disk layout: `{ "videos": [ ... ] }`, plus whatever else the upload server keeps.
    async fn read_document(&self) -> Result<Value, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            // the upload server creates the file lazily
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(json!({ "videos": [] })),
            Err(e) => return Err(self.read_error(e)),
        };

        let document: Value = serde_json::from_str(&raw).map_err(|e| self.read_error(e))?;
        if !document.is_object() {
            return Err(self.read_error("top level is not an object"));
        }
        Ok(document)
    }

    fn entries<'a>(&self, document: &'a Value) -> Result<&'a [Value], StoreError> {
        match document.get("videos") {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(videos)) => Ok(videos),
            Some(_) => Err(self.read_error("`videos` is not an array")),
        }
    }

    async fn write_document(&self, document: &Value) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

fn parse_record(entry: &Value) -> Result<VideoRecord, StoreError> {
    serde_json::from_value(entry.clone()).map_err(|e| StoreError::InvalidRecord {
        id: entry_id(entry).unwrap_or_default().to_string(),
        reason: e.to_string(),
    })
}

/// Writes `publishStatus` (merged), `status` and `updatedAt` into a raw entry.
fn patch_status(entry: &mut Value, update: &StatusUpdate) -> Result<(), StoreError> {
    let Some(fields) = entry.as_object_mut() else {
        return Err(StoreError::InvalidRecord {
            id: String::new(),
            reason: "record is not an object".to_string(),
        });
    };

    let publish_status = fields
        .entry("publishStatus")
        .or_insert_with(|| Value::Object(Map::new()));
    if !publish_status.is_object() {
        *publish_status = Value::Object(Map::new());
    }
    if let Some(outcomes) = publish_status.as_object_mut() {
        for (platform, outcome) in &update.publish_status {
            outcomes.insert(platform.as_str().to_string(), serde_json::to_value(outcome)?);
        }
    }

    fields.insert("status".to_string(), serde_json::to_value(update.status)?);
    fields.insert(
        "updatedAt".to_string(),
        serde_json::to_value(update.updated_at)?,
    );
    Ok(())
}

#[async_trait]
impl VideoStore for JsonFileStore {
    /// Malformed entries are logged and left out so one bad record cannot
    /// block every other video.
    async fn list(&self) -> Result<Vec<VideoRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await?;

        let videos = self
            .entries(&document)?
            .iter()
            .filter_map(|entry| match parse_record(entry) {
                Ok(video) => Some(video),
                Err(e) => {
                    tracing::warn!(
                        video_id = entry_id(entry).unwrap_or_default(),
                        error = %e,
                        "Skipping malformed video record"
                    );
                    None
                }
            })
            .collect();
        Ok(videos)
    }

    async fn get(&self, id: &str) -> Result<VideoRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await?;

        let entry = self
            .entries(&document)?
            .iter()
            .find(|entry| entry_id(entry) == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        parse_record(entry)
    }

    async fn update(&self, id: &str, update: &StatusUpdate) -> Result<VideoRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        self.entries(&document)?;

        let entry = document
            .get_mut("videos")
            .and_then(Value::as_array_mut)
            .and_then(|videos| videos.iter_mut().find(|entry| entry_id(entry) == Some(id)))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch_status(entry, update)?;
        let updated = parse_record(entry)?;

        self.write_document(&document).await?;
        tracing::debug!(video_id = %id, status = ?updated.status, "Video status persisted");
        Ok(updated)
    }
}
