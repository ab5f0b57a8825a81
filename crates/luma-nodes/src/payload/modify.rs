//! Video modify payloads

use serde_json::Value;

use super::{url_object, Payload};
use crate::generation::{Endpoint, GenerationRequest};

/// Ray models accepted by the video edit endpoints
pub const MODELS: &[&str] = &["ray-2", "ray-flash-2"];
pub const DEFAULT_MODEL: &str = "ray-2";

/// Adhere keeps close to the source, reimagine departs furthest
pub const MODES: &[&str] = &[
    "adhere_1",
    "adhere_2",
    "adhere_3",
    "flex_1",
    "flex_2",
    "flex_3",
    "reimagine_1",
    "reimagine_2",
    "reimagine_3",
];
pub const DEFAULT_MODE: &str = "flex_1";

#[derive(Debug, Clone, PartialEq)]
pub struct VideoModifyParams {
    pub media_url: String,
    pub prompt: String,
    pub model: String,
    pub mode: String,
    pub first_frame: Option<String>,
}

impl VideoModifyParams {
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("media".to_string(), url_object(&self.media_url));
        payload.insert("model".to_string(), Value::from(self.model.as_str()));
        payload.insert("mode".to_string(), Value::from(self.mode.as_str()));
        payload.insert("generation_type".to_string(), Value::from("modify_video"));
        payload.insert("prompt".to_string(), Value::from(self.prompt.trim()));

        if let Some(url) = &self.first_frame {
            payload.insert("first_frame".to_string(), url_object(url));
        }
        payload
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(Endpoint::VideoModify, self.to_payload())
    }
}
