//! Reframe payloads, shared by the image and video reframe endpoints

use serde_json::Value;

use super::{non_blank, url_object, Payload};
use crate::generation::{Endpoint, GenerationRequest};

pub const ASPECT_RATIOS: &[&str] = &["1:1", "4:3", "3:4", "16:9", "9:16", "21:9", "9:21"];
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Geometry port ids, in payload order
pub const GEOMETRY_FIELDS: [&str; 8] = [
    "grid_position_x",
    "grid_position_y",
    "x_start",
    "x_end",
    "y_start",
    "y_end",
    "resized_width",
    "resized_height",
];

/// Optional placement of the source inside the new frame.
///
/// Zero means "let the service decide" and is never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReframeGeometry {
    pub grid_position_x: i64,
    pub grid_position_y: i64,
    pub x_start: i64,
    pub x_end: i64,
    pub y_start: i64,
    pub y_end: i64,
    pub resized_width: i64,
    pub resized_height: i64,
}

impl ReframeGeometry {
    /// Build from a lookup of field name to value
    pub fn from_fields(mut value_of: impl FnMut(&str) -> i64) -> Self {
        Self {
            grid_position_x: value_of("grid_position_x"),
            grid_position_y: value_of("grid_position_y"),
            x_start: value_of("x_start"),
            x_end: value_of("x_end"),
            y_start: value_of("y_start"),
            y_end: value_of("y_end"),
            resized_width: value_of("resized_width"),
            resized_height: value_of("resized_height"),
        }
    }

    pub fn fields(&self) -> [(&'static str, i64); 8] {
        [
            ("grid_position_x", self.grid_position_x),
            ("grid_position_y", self.grid_position_y),
            ("x_start", self.x_start),
            ("x_end", self.x_end),
            ("y_start", self.y_start),
            ("y_end", self.y_end),
            ("resized_width", self.resized_width),
            ("resized_height", self.resized_height),
        ]
    }

    /// Non-zero fields only
    pub fn to_map(&self) -> Payload {
        self.fields()
            .into_iter()
            .filter(|(_, value)| *value != 0)
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| *value == 0)
    }
}

/// Which reframe endpoint a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReframeTarget {
    Image,
    Video,
}

impl ReframeTarget {
    pub fn generation_type(&self) -> &'static str {
        match self {
            Self::Image => "reframe_image",
            Self::Video => "reframe_video",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Image => Endpoint::ImageReframe,
            Self::Video => Endpoint::VideoReframe,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReframeParams {
    pub target: ReframeTarget,
    pub media_url: String,
    pub model: String,
    pub aspect_ratio: String,
    pub prompt: String,
    pub geometry: ReframeGeometry,
}

impl ReframeParams {
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("media".to_string(), url_object(&self.media_url));
        payload.insert("model".to_string(), Value::from(self.model.as_str()));
        payload.insert("aspect_ratio".to_string(), Value::from(self.aspect_ratio.as_str()));
        payload.insert(
            "generation_type".to_string(),
            Value::from(self.target.generation_type()),
        );

        if let Some(prompt) = non_blank(&self.prompt) {
            payload.insert("prompt".to_string(), Value::from(prompt));
        }

        payload.extend(self.geometry.to_map());
        payload
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(self.target.endpoint(), self.to_payload())
    }
}
