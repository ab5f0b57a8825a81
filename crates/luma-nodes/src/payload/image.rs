//! Photon image generation payloads

use serde_json::{json, Value};

use super::{url_object, Payload};
use crate::generation::{Endpoint, GenerationRequest};

pub const MODELS: &[&str] = &["photon-1", "photon-flash-1"];
pub const DEFAULT_MODEL: &str = "photon-1";

pub const ASPECT_RATIOS: &[&str] = &["1:1", "3:4", "4:3", "9:16", "16:9", "9:21", "21:9"];
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// How the optional reference image conditions the generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    #[default]
    None,
    ImageReference,
    StyleReference,
    CharacterReference,
    ModifyImage,
}

impl ReferenceMode {
    pub const ALL: [ReferenceMode; 5] = [
        Self::None,
        Self::ImageReference,
        Self::StyleReference,
        Self::CharacterReference,
        Self::ModifyImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ImageReference => "image_reference",
            Self::StyleReference => "style_reference",
            Self::CharacterReference => "character_reference",
            Self::ModifyImage => "modify_image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }

    pub fn choices() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::as_str).collect()
    }

    /// Weight a newly selected mode starts with
    pub fn default_weight(&self) -> Option<f64> {
        match self {
            Self::ImageReference => Some(0.85),
            Self::StyleReference => Some(0.8),
            Self::ModifyImage => Some(1.0),
            Self::None | Self::CharacterReference => None,
        }
    }

    pub fn uses_image(&self) -> bool {
        *self != Self::None
    }

    pub fn uses_weight(&self) -> bool {
        self.default_weight().is_some()
    }
}

/// A resolved reference in the shape its mode requires
#[derive(Debug, Clone, PartialEq)]
pub enum ImageReference {
    Image { url: String, weight: f64 },
    Style { url: String, weight: f64 },
    Character { url: String },
    Modify { url: String, weight: f64 },
}

impl ImageReference {
    /// `None` for `ReferenceMode::None`
    pub fn new(mode: ReferenceMode, url: impl Into<String>, weight: f64) -> Option<Self> {
        let url = url.into();
        match mode {
            ReferenceMode::None => None,
            ReferenceMode::ImageReference => Some(Self::Image { url, weight }),
            ReferenceMode::StyleReference => Some(Self::Style { url, weight }),
            ReferenceMode::CharacterReference => Some(Self::Character { url }),
            ReferenceMode::ModifyImage => Some(Self::Modify { url, weight }),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Image { url, .. }
            | Self::Style { url, .. }
            | Self::Character { url }
            | Self::Modify { url, .. } => url,
        }
    }

    /// Status line announcing the reference
    pub fn describe(&self) -> String {
        match self {
            Self::Image { url, .. } => format!("Using image reference: {}", url),
            Self::Style { url, .. } => format!("Using style reference: {}", url),
            Self::Character { url } => format!("Using character reference: {}", url),
            Self::Modify { url, .. } => format!("Modifying image: {}", url),
        }
    }

    pub fn apply(&self, payload: &mut Payload) {
        let (key, value) = match self {
            Self::Image { url, weight } => ("image_ref", json!([{ "url": url, "weight": weight }])),
            Self::Style { url, weight } => ("style_ref", json!([{ "url": url, "weight": weight }])),
            Self::Character { url } => ("character_ref", json!({ "identity0": { "images": [url] } })),
            Self::Modify { url, weight } => {
                let mut value = url_object(url);
                value["weight"] = json!(weight);
                ("modify_image_ref", value)
            }
        };
        payload.insert(key.to_string(), value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationParams {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub reference: Option<ImageReference>,
}

impl ImageGenerationParams {
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), Value::from(self.prompt.trim()));
        payload.insert("model".to_string(), Value::from(self.model.as_str()));
        payload.insert("aspect_ratio".to_string(), Value::from(self.aspect_ratio.as_str()));

        if let Some(reference) = &self.reference {
            reference.apply(&mut payload);
        }
        payload
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(Endpoint::ImageCreate, self.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(reference: Option<ImageReference>) -> ImageGenerationParams {
        ImageGenerationParams {
            prompt: "  a lighthouse at dusk \n".to_string(),
            model: DEFAULT_MODEL.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            reference,
        }
    }

    #[test]
    fn test_plain_payload_trims_prompt() {
        let payload = params(None).to_payload();
        assert_eq!(
            Value::Object(payload),
            json!({ "prompt": "a lighthouse at dusk", "model": "photon-1", "aspect_ratio": "16:9" })
        );
    }

    #[test]
    fn test_image_and_style_refs_are_single_element_lists() {
        let url = "https://cdn.example.com/ref.jpg";

        let payload = params(ImageReference::new(ReferenceMode::ImageReference, url, 0.85)).to_payload();
        assert_eq!(payload["image_ref"], json!([{ "url": url, "weight": 0.85 }]));
        assert!(!payload.contains_key("style_ref"));

        let payload = params(ImageReference::new(ReferenceMode::StyleReference, url, 0.8)).to_payload();
        assert_eq!(payload["style_ref"], json!([{ "url": url, "weight": 0.8 }]));
        assert!(!payload.contains_key("image_ref"));
    }

    #[test]
    fn test_character_ref_has_no_weight() {
        let url = "https://cdn.example.com/face.jpg";
        let payload =
            params(ImageReference::new(ReferenceMode::CharacterReference, url, 0.5)).to_payload();

        assert_eq!(payload["character_ref"]["identity0"]["images"], json!([url]));
        assert!(!payload["character_ref"].to_string().contains("weight"));
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn test_modify_ref_is_flat_object() {
        let url = "https://cdn.example.com/base.jpg";
        let payload = params(ImageReference::new(ReferenceMode::ModifyImage, url, 1.0)).to_payload();
        assert_eq!(payload["modify_image_ref"], json!({ "url": url, "weight": 1.0 }));
    }

    #[test]
    fn test_none_mode_builds_no_reference() {
        assert_eq!(ImageReference::new(ReferenceMode::None, "https://x", 0.5), None);
    }

    #[test]
    fn test_reference_mode_defaults() {
        assert_eq!(ReferenceMode::parse("style_reference"), Some(ReferenceMode::StyleReference));
        assert_eq!(ReferenceMode::parse("bogus"), None);
        assert_eq!(ReferenceMode::ImageReference.default_weight(), Some(0.85));
        assert_eq!(ReferenceMode::StyleReference.default_weight(), Some(0.8));
        assert_eq!(ReferenceMode::ModifyImage.default_weight(), Some(1.0));
        assert!(!ReferenceMode::CharacterReference.uses_weight());
        assert!(ReferenceMode::CharacterReference.uses_image());
        assert!(!ReferenceMode::None.uses_image());
        assert_eq!(ReferenceMode::choices().len(), 5);
    }

    #[test]
    fn test_describe_lines() {
        let reference = ImageReference::new(ReferenceMode::ModifyImage, "https://x/a.jpg", 1.0).unwrap();
        assert_eq!(reference.describe(), "Modifying image: https://x/a.jpg");
        assert_eq!(reference.url(), "https://x/a.jpg");
    }
}
