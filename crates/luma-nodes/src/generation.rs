//! Generation job model
//!
//! Mirrors the generation object returned by the Dream Machine API. Jobs are
//! only ever mutated by re-reading them from the API.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Remote job state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Queued,
    Dreaming,
    Completed,
    Failed,
    /// A state this crate does not know about yet; treated as in progress
    Other(String),
}

impl GenerationState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Dreaming => "dreaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(state) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl From<&str> for GenerationState {
    fn from(value: &str) -> Self {
        match value {
            "queued" => Self::Queued,
            "dreaming" => Self::Dreaming,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GenerationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GenerationState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(GenerationState::from(raw.as_str()))
    }
}

/// Kind of media a generation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
}

/// Asset URLs attached to a generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_video: Option<String>,
}

/// A remote generation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub state: GenerationState,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub assets: Option<GenerationAssets>,
    #[serde(default)]
    pub generation_type: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Generation {
    /// Result asset URL for `kind`, if the API recorded one
    pub fn asset_url(&self, kind: GenerationKind) -> Option<&str> {
        let assets = self.assets.as_ref()?;
        let url = match kind {
            GenerationKind::Image => assets.image.as_deref(),
            GenerationKind::Video => assets.video.as_deref(),
        };
        url.filter(|u| !u.is_empty())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Submit endpoints of the Dream Machine API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ImageCreate,
    ImageReframe,
    VideoCreate,
    VideoModify,
    VideoReframe,
}

impl Endpoint {
    /// Path relative to the API root
    pub fn path(&self) -> &'static str {
        match self {
            Self::ImageCreate => "/generations/image",
            Self::ImageReframe => "/generations/image/reframe",
            Self::VideoCreate => "/generations",
            Self::VideoModify => "/generations/video/modify",
            Self::VideoReframe => "/generations/video/reframe",
        }
    }

    /// Kind of asset the endpoint produces
    pub fn kind(&self) -> GenerationKind {
        match self {
            Self::ImageCreate | Self::ImageReframe => GenerationKind::Image,
            Self::VideoCreate | Self::VideoModify | Self::VideoReframe => GenerationKind::Video,
        }
    }
}

/// Status path for a generation id
pub fn status_path(id: &str) -> String {
    format!("/generations/{}", id)
}

pub const CONCEPTS_PATH: &str = "/generations/concepts/list";
pub const CAMERA_MOTIONS_PATH: &str = "/generations/camera_motion/list";

/// A request payload bound to its endpoint.
///
/// Built once, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    endpoint: Endpoint,
    payload: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(endpoint: Endpoint, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { endpoint, payload }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn kind(&self) -> GenerationKind {
        self.endpoint.kind()
    }

    pub fn payload(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.payload
    }
}
