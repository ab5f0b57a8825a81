//! Ray video generation payloads

use serde_json::{json, Value};

use super::Payload;
use crate::generation::{Endpoint, GenerationRequest};

pub const MODELS: &[&str] = &["ray-2", "ray-flash-2", "ray-1-6"];
pub const DEFAULT_MODEL: &str = "ray-2";

pub const ASPECT_RATIOS: &[&str] = &["1:1", "3:4", "4:3", "9:16", "16:9", "9:21", "21:9"];
pub const RAY16_ASPECT_RATIOS: &[&str] = &["1:1", "9:16", "16:9"];
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

pub const RESOLUTIONS: &[&str] = &["540p", "720p", "1080p", "4k"];
pub const DEFAULT_RESOLUTION: &str = "720p";

pub const DURATIONS: &[&str] = &["5s", "9s"];
pub const DEFAULT_DURATION: &str = "5s";

/// Port carrying the aspect ratio for ray-2 / ray-flash-2
pub const PORT_ASPECT_RATIO: &str = "aspect_ratio";
/// Port carrying the aspect ratio for ray-1-6
pub const PORT_ASPECT_RATIO_RAY16: &str = "aspect_ratio_ray16";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoModel {
    #[default]
    Ray2,
    RayFlash2,
    Ray16,
}

impl VideoModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ray2 => "ray-2",
            Self::RayFlash2 => "ray-flash-2",
            Self::Ray16 => "ray-1-6",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ray-2" => Some(Self::Ray2),
            "ray-flash-2" => Some(Self::RayFlash2),
            "ray-1-6" => Some(Self::Ray16),
            _ => None,
        }
    }

    pub fn supports_resolution_and_duration(&self) -> bool {
        matches!(self, Self::Ray2 | Self::RayFlash2)
    }

    /// Port whose value is sent as `aspect_ratio`
    pub fn aspect_ratio_port(&self) -> &'static str {
        match self {
            Self::Ray16 => PORT_ASPECT_RATIO_RAY16,
            Self::Ray2 | Self::RayFlash2 => PORT_ASPECT_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoGenerationParams {
    pub prompt: String,
    pub model: VideoModel,
    pub aspect_ratio: Option<String>,
    pub resolution: String,
    pub duration: String,
    pub looping: bool,
    /// Resolved public URL of the first keyframe
    pub start_frame: Option<String>,
    /// Resolved public URL of the last keyframe
    pub end_frame: Option<String>,
}

impl VideoGenerationParams {
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), Value::from(self.prompt.trim()));
        payload.insert("model".to_string(), Value::from(self.model.as_str()));

        if let Some(aspect_ratio) = self.aspect_ratio.as_deref().filter(|a| !a.is_empty()) {
            payload.insert("aspect_ratio".to_string(), Value::from(aspect_ratio));
        }

        if self.model.supports_resolution_and_duration() {
            payload.insert("resolution".to_string(), Value::from(self.resolution.as_str()));
            payload.insert("duration".to_string(), Value::from(self.duration.as_str()));
        }

        if self.looping {
            payload.insert("loop".to_string(), Value::Bool(true));
        }

        let mut keyframes = Payload::new();
        if let Some(url) = &self.start_frame {
            keyframes.insert("frame0".to_string(), json!({ "type": "image", "url": url }));
        }
        if let Some(url) = &self.end_frame {
            keyframes.insert("frame1".to_string(), json!({ "type": "image", "url": url }));
        }
        if !keyframes.is_empty() {
            payload.insert("keyframes".to_string(), Value::Object(keyframes));
        }

        payload
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(Endpoint::VideoCreate, self.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(model: VideoModel) -> VideoGenerationParams {
        VideoGenerationParams {
            prompt: "waves crashing on black sand".to_string(),
            model,
            aspect_ratio: Some("9:16".to_string()),
            resolution: "1080p".to_string(),
            duration: "9s".to_string(),
            looping: false,
            start_frame: None,
            end_frame: None,
        }
    }

    #[test]
    fn test_ray2_includes_resolution_and_duration() {
        let payload = params(VideoModel::Ray2).to_payload();
        assert_eq!(payload["resolution"], json!("1080p"));
        assert_eq!(payload["duration"], json!("9s"));
        assert_eq!(payload["aspect_ratio"], json!("9:16"));
        assert!(!payload.contains_key("loop"));
        assert!(!payload.contains_key("keyframes"));
    }

    #[test]
    fn test_ray16_omits_resolution_and_duration() {
        let payload = params(VideoModel::Ray16).to_payload();
        assert!(!payload.contains_key("resolution"));
        assert!(!payload.contains_key("duration"));
        assert_eq!(payload["model"], json!("ray-1-6"));
    }

    #[test]
    fn test_loop_and_keyframes() {
        let mut p = params(VideoModel::RayFlash2);
        p.looping = true;
        p.start_frame = Some("https://cdn.example.com/first.jpg".to_string());
        p.end_frame = Some("https://cdn.example.com/last.jpg".to_string());

        let payload = p.to_payload();
        assert_eq!(payload["loop"], json!(true));
        assert_eq!(
            payload["keyframes"],
            json!({
                "frame0": { "type": "image", "url": "https://cdn.example.com/first.jpg" },
                "frame1": { "type": "image", "url": "https://cdn.example.com/last.jpg" }
            })
        );
    }

    #[test]
    fn test_end_frame_only() {
        let mut p = params(VideoModel::Ray2);
        p.end_frame = Some("https://cdn.example.com/last.jpg".to_string());

        let keyframes = p.to_payload()["keyframes"].clone();
        assert!(keyframes.get("frame0").is_none());
        assert!(keyframes.get("frame1").is_some());
    }

    #[test]
    fn test_model_parsing_and_ports() {
        assert_eq!(VideoModel::parse("ray-flash-2"), Some(VideoModel::RayFlash2));
        assert_eq!(VideoModel::parse("ray-3"), None);
        assert_eq!(VideoModel::Ray16.aspect_ratio_port(), PORT_ASPECT_RATIO_RAY16);
        assert_eq!(VideoModel::Ray2.aspect_ratio_port(), PORT_ASPECT_RATIO);
        for model in MODELS {
            assert!(VideoModel::parse(model).is_some());
        }
    }
}
