//! Configuration for Luma nodes
//!
//! Loaded from a JSON file next to the host's other settings. Every field
//! has a default, so a missing file or a partial file is fine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{defaults, polling, timeouts};

/// Polling cadence and attempt budget for one endpoint family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause before each status read
    #[serde(rename = "interval_secs", with = "secs")]
    pub interval: Duration,
    /// Status reads before giving up
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Image generation and reframe
    pub fn image() -> Self {
        Self::new(
            Duration::from_secs(polling::IMAGE_INTERVAL_SECS),
            polling::IMAGE_MAX_ATTEMPTS,
        )
    }

    /// Video generation
    pub fn video_generation() -> Self {
        Self::new(
            Duration::from_secs(polling::VIDEO_GENERATION_INTERVAL_SECS),
            polling::VIDEO_GENERATION_MAX_ATTEMPTS,
        )
    }

    /// Video modify and reframe
    pub fn video_edit() -> Self {
        Self::new(
            Duration::from_secs(polling::VIDEO_EDIT_INTERVAL_SECS),
            polling::VIDEO_EDIT_MAX_ATTEMPTS,
        )
    }

    /// Upper bound on time spent sleeping
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("interval must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Polling profiles used by the generation nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingProfiles {
    #[serde(default = "PollConfig::image")]
    pub image: PollConfig,
    #[serde(default = "PollConfig::video_generation")]
    pub video_generation: PollConfig,
    #[serde(default = "PollConfig::video_edit")]
    pub video_edit: PollConfig,
}

impl Default for PollingProfiles {
    fn default() -> Self {
        Self {
            image: PollConfig::image(),
            video_generation: PollConfig::video_generation(),
            video_edit: PollConfig::video_edit(),
        }
    }
}

fn default_base_url() -> String {
    defaults::BASE_URL.to_string()
}

fn default_api_key_secret() -> String {
    defaults::API_KEY_SECRET.to_string()
}

fn default_request_timeout() -> u64 {
    timeouts::API_REQUEST_SECS
}

fn default_reference_fetch_timeout() -> u64 {
    timeouts::REFERENCE_FETCH_SECS
}

fn default_image_download_timeout() -> u64 {
    timeouts::IMAGE_DOWNLOAD_SECS
}

fn default_video_download_timeout() -> u64 {
    timeouts::VIDEO_DOWNLOAD_SECS
}

/// Full Luma configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumaConfig {
    /// API root, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Secret name looked up in the secret store
    #[serde(default = "default_api_key_secret")]
    pub api_key_secret: String,
    /// Timeout for each Luma API request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for fetching loopback references, in seconds
    #[serde(default = "default_reference_fetch_timeout")]
    pub reference_fetch_timeout_secs: u64,
    /// Timeout for downloading generated images, in seconds
    #[serde(default = "default_image_download_timeout")]
    pub image_download_timeout_secs: u64,
    /// Timeout for downloading generated videos, in seconds
    #[serde(default = "default_video_download_timeout")]
    pub video_download_timeout_secs: u64,
    /// Polling profiles
    #[serde(default)]
    pub polling: PollingProfiles,
}

impl Default for LumaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_secret: default_api_key_secret(),
            request_timeout_secs: default_request_timeout(),
            reference_fetch_timeout_secs: default_reference_fetch_timeout(),
            image_download_timeout_secs: default_image_download_timeout(),
            video_download_timeout_secs: default_video_download_timeout(),
            polling: PollingProfiles::default(),
        }
    }
}

impl LumaConfig {
    /// Load configuration from a JSON file, or defaults if it does not exist
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No Luma config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to a JSON file
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(ConfigError::Io)?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(path, contents).await.map_err(ConfigError::Io)?;

        log::info!("Luma configuration saved to {:?}", path);
        Ok(())
    }

    /// Apply environment overrides (`LUMAAI_BASE_URL`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(defaults::BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// API root without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reference_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.reference_fetch_timeout_secs)
    }

    pub fn image_download_timeout(&self) -> Duration {
        Duration::from_secs(self.image_download_timeout_secs)
    }

    pub fn video_download_timeout(&self) -> Duration {
        Duration::from_secs(self.video_download_timeout_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
