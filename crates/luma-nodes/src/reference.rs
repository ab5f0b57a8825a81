//! Reference resolution
//!
//! The remote API only accepts media it can fetch itself. A reference given
//! to a node is either raw bytes or a URL; bytes and loopback URLs are
//! re-uploaded to public storage, any other URL is passed through as is.
//! Uploads made here belong to one node invocation and are deleted by
//! `ReferenceResolver::release` when it ends.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::constants::files;
use crate::error::{LumaError, Result};
use crate::services::{ExistingFilePolicy, HttpFetcher, PublicStorage};

/// Kind of media a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Media supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// Bytes held in the workflow, with the file extension if known
    InlineBytes {
        bytes: Vec<u8>,
        extension: Option<String>,
    },
    /// A URL, possibly only reachable from this machine
    RemoteUrl(String),
}

impl MediaReference {
    pub fn url(url: impl Into<String>) -> Self {
        Self::RemoteUrl(url.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>, extension: Option<&str>) -> Self {
        Self::InlineBytes {
            bytes: bytes.into(),
            extension: extension.map(normalize_extension),
        }
    }

    /// Interpret a port value as a reference.
    ///
    /// Accepts a URL string (including `data:` URLs), an artifact object
    /// with `url` or `value`, or an object with `base64` content and an
    /// optional `extension` / `mime_type`. Empty values yield `None`.
    pub fn from_value(value: &serde_json::Value) -> Result<Option<Self>> {
        match value {
            serde_json::Value::String(s) => Self::from_str_value(s),
            serde_json::Value::Object(map) => {
                if let Some(encoded) = map.get("base64").and_then(|v| v.as_str()) {
                    let extension = map
                        .get("extension")
                        .and_then(|v| v.as_str())
                        .map(normalize_extension)
                        .or_else(|| {
                            map.get("mime_type")
                                .and_then(|v| v.as_str())
                                .and_then(extension_for_mime)
                        });
                    return decode_inline(encoded, extension);
                }

                let url = map
                    .get("url")
                    .and_then(|v| v.as_str())
                    .or_else(|| map.get("value").and_then(|v| v.as_str()));
                match url {
                    Some(url) => Self::from_str_value(url),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn from_str_value(s: &str) -> Result<Option<Self>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = s.strip_prefix("data:") {
            let (header, encoded) = rest.split_once(',').ok_or_else(|| {
                LumaError::ReferenceUnavailable("malformed data URL".to_string())
            })?;
            let mime = header.trim_end_matches(";base64");
            return decode_inline(encoded, extension_for_mime(mime));
        }

        Ok(Some(Self::RemoteUrl(s.to_string())))
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::InlineBytes { bytes, .. } => bytes.is_empty(),
            Self::RemoteUrl(url) => url.trim().is_empty(),
        }
    }
}

fn decode_inline(encoded: &str, extension: Option<String>) -> Result<Option<MediaReference>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| LumaError::ReferenceUnavailable(format!("invalid base64 content: {}", e)))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(MediaReference::InlineBytes { bytes, extension }))
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let ext = match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        _ => return None,
    };
    Some(ext.to_string())
}

/// Whether `url` points at this machine
pub fn is_loopback_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1")),
        Err(_) => false,
    }
}

/// Extension of the last path segment of `url`, if it has one
fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(normalize_extension(ext))
}

/// Turns references into public URLs and owns the uploads that required
pub struct ReferenceResolver {
    storage: Arc<dyn PublicStorage>,
    fetcher: Arc<dyn HttpFetcher>,
    fetch_timeout: Duration,
    uploads: Vec<String>,
}

impl ReferenceResolver {
    pub fn new(
        storage: Arc<dyn PublicStorage>,
        fetcher: Arc<dyn HttpFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            fetcher,
            fetch_timeout,
            uploads: Vec::new(),
        }
    }

    /// A public URL for `reference`.
    ///
    /// `slot` names the input in upload filenames.
    pub async fn resolve(
        &mut self,
        reference: Option<&MediaReference>,
        slot: &str,
        kind: MediaKind,
    ) -> Result<String> {
        let reference = reference
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LumaError::ReferenceUnavailable(format!("no {} provided", slot)))?;

        match reference {
            MediaReference::InlineBytes { bytes, extension } => {
                self.upload(bytes, slot, kind, extension.as_deref()).await
            }
            MediaReference::RemoteUrl(url) if is_loopback_url(url) => {
                log::debug!("ReferenceResolver: re-hosting loopback {} {}", slot, url);
                let bytes = self
                    .fetcher
                    .fetch(url, self.fetch_timeout)
                    .await?
                    .into_success(url)?;
                let extension = url_extension(url);
                self.upload(&bytes, slot, kind, extension.as_deref()).await
            }
            MediaReference::RemoteUrl(url) => Ok(url.clone()),
        }
    }

    async fn upload(
        &mut self,
        bytes: &[u8],
        slot: &str,
        kind: MediaKind,
        extension: Option<&str>,
    ) -> Result<String> {
        let extension = match kind {
            MediaKind::Image => files::IMAGE_REFERENCE_EXTENSION,
            MediaKind::Video => extension
                .filter(|e| !e.is_empty())
                .unwrap_or(files::DEFAULT_VIDEO_EXTENSION),
        };
        let filename = format!(
            "{}_{}_{}.{}",
            files::REFERENCE_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            slot,
            extension
        );

        let url = self
            .storage
            .save(bytes, &filename, ExistingFilePolicy::CreateNew)
            .await?;
        self.uploads.push(url.clone());
        Ok(url)
    }

    /// Public URLs uploaded so far
    pub fn uploads(&self) -> &[String] {
        &self.uploads
    }

    /// Delete every upload. Failures are logged, never returned.
    pub async fn release(&mut self) {
        for url in self.uploads.drain(..) {
            if let Err(e) = self.storage.delete(&url).await {
                log::warn!("ReferenceResolver: failed to delete uploaded reference {}: {}", url, e);
            }
        }
    }
}
