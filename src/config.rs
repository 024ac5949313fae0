//! Configuration loaded from the environment.

use crate::error::ConfigError;
use chrono::Duration;
use std::env;
use std::path::PathBuf;

/// Access tokens and account ids for the platform adapters.
/// A platform without its token (and id, where needed) gets no publisher.
#[derive(Clone, Debug)]
pub struct PlatformCredentials {
    pub youtube_access_token: Option<String>,
    pub tiktok_access_token: Option<String>,
    /// `PUBLIC_TO_EVERYONE`, `MUTUAL_FOLLOW_FRIENDS`, `FOLLOWER_OF_CREATOR` or `SELF_ONLY`
    pub tiktok_privacy_level: String,
    pub instagram_access_token: Option<String>,
    pub instagram_user_id: Option<String>,
    pub facebook_access_token: Option<String>,
    pub facebook_page_id: Option<String>,
}

impl Default for PlatformCredentials {
    fn default() -> Self {
        Self {
            youtube_access_token: None,
            tiktok_access_token: None,
            tiktok_privacy_level: String::from("SELF_ONLY"),
            instagram_access_token: None,
            instagram_user_id: None,
            facebook_access_token: None,
            facebook_page_id: None,
        }
    }
}

/// Configuration for the publish scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// JSON document shared with the upload server
    pub db_path: PathBuf,
    /// Look-ahead window for due videos
    pub horizon: Duration,
    /// Delay between selector passes in the long-running loop
    pub poll_interval: std::time::Duration,
    pub credentials: PlatformCredentials,
}

impl SchedulerConfig {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let horizon = parse_horizon(&lookup)?;
        let poll_secs = parse_secs(&lookup, "POLL_INTERVAL_SECS", 60)?;

        Ok(Self {
            db_path: non_empty("VIDEOS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./videos.json")),
            horizon,
            poll_interval: std::time::Duration::from_secs(poll_secs.max(1)),
            credentials: PlatformCredentials {
                youtube_access_token: non_empty("YOUTUBE_ACCESS_TOKEN"),
                tiktok_access_token: non_empty("TIKTOK_ACCESS_TOKEN"),
                tiktok_privacy_level: non_empty("TIKTOK_PRIVACY_LEVEL")
                    .unwrap_or_else(|| String::from("SELF_ONLY")),
                instagram_access_token: non_empty("INSTAGRAM_ACCESS_TOKEN"),
                instagram_user_id: non_empty("INSTAGRAM_USER_ID"),
                facebook_access_token: non_empty("FACEBOOK_ACCESS_TOKEN"),
                facebook_page_id: non_empty("FACEBOOK_PAGE_ID"),
            },
        })
    }
}

fn parse_secs<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

/// Rejects values chrono cannot represent instead of wrapping or panicking.
fn parse_horizon<F>(lookup: &F) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const NAME: &str = "SCHEDULE_HORIZON_SECS";
    let secs = parse_secs(lookup, NAME, 300)?;
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::InvalidNumber {
            name: NAME,
            value: secs.to_string(),
        })
}
