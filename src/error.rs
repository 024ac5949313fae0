//! Error types shared across the crate.

use crate::domain::video::Platform;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the persisted video store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store exists but could not be read or parsed.
    #[error("Failed to read video store '{path}': {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write video store '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize video store: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Video not found: {0}")]
    NotFound(String),

    /// One entry of the store does not match the record schema.
    #[error("Invalid video record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// A video record that cannot be published as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("videoId is required")]
    MissingId,

    #[error("No platforms selected for publishing video {0}")]
    NoPlatforms(String),
}

/// Failure of a single platform publish attempt.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{platform} API returned {status}: {body}")]
    Api {
        platform: Platform,
        status: u16,
        body: String,
    },

    #[error("Failed to read media '{path}': {source}")]
    Media {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected {platform} response: {reason}")]
    UnexpectedResponse { platform: Platform, reason: String },

    #[error("{platform} processing failed: {reason}")]
    Processing { platform: Platform, reason: String },

    #[error("No publisher configured for {0}")]
    NotConfigured(Platform),

    #[error("{0} publisher panicked")]
    Panicked(Platform),
}

/// Errors surfaced to the caller of the publish orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid video record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}
