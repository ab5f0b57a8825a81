//! Request payload mapping
//!
//! One module per endpoint family. Payload shape depends only on the
//! parameter values passed in.

pub mod image;
pub mod modify;
pub mod reframe;
pub mod video;

/// Request body sent to a submit endpoint
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// `{"url": url}`
pub(crate) fn url_object(url: &str) -> serde_json::Value {
    serde_json::json!({ "url": url })
}

/// Trimmed text, or `None` when blank
pub(crate) fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub use image::{ImageGenerationParams, ImageReference, ReferenceMode};
pub use modify::VideoModifyParams;
pub use reframe::{ReframeGeometry, ReframeParams, ReframeTarget};
pub use video::{VideoGenerationParams, VideoModel};
