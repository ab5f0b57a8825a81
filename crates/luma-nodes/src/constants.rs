//! Luma node constants
//!
//! Single source of truth for endpoint defaults, timeouts, polling budgets
//! and output naming.

/// Default values for client configuration
pub mod defaults {
    /// Dream Machine API root
    pub const BASE_URL: &str = "https://api.lumalabs.ai/dream-machine/v1";
    /// Secret holding the API key
    pub const API_KEY_SECRET: &str = "LUMAAI_API_KEY";
    /// Environment override for the API root
    pub const BASE_URL_ENV: &str = "LUMAAI_BASE_URL";
    /// Where users obtain an API key
    pub const API_KEY_HELP_URL: &str = "https://lumalabs.ai/dream-machine/api/keys";
}

/// Timeout configuration (in seconds)
pub mod timeouts {
    /// Per-request timeout for Luma API calls
    pub const API_REQUEST_SECS: u64 = 30;
    /// Fetching a loopback reference before re-upload
    pub const REFERENCE_FETCH_SECS: u64 = 30;
    /// Downloading a generated image
    pub const IMAGE_DOWNLOAD_SECS: u64 = 30;
    /// Downloading a generated video
    pub const VIDEO_DOWNLOAD_SECS: u64 = 120;
}

/// Polling budgets per endpoint family
pub mod polling {
    /// Image generation and reframe: ~4 minutes
    pub const IMAGE_INTERVAL_SECS: u64 = 2;
    pub const IMAGE_MAX_ATTEMPTS: u32 = 120;
    /// Video generation: ~10 minutes
    pub const VIDEO_GENERATION_INTERVAL_SECS: u64 = 3;
    pub const VIDEO_GENERATION_MAX_ATTEMPTS: u32 = 200;
    /// Video modify and reframe: ~9 minutes
    pub const VIDEO_EDIT_INTERVAL_SECS: u64 = 3;
    pub const VIDEO_EDIT_MAX_ATTEMPTS: u32 = 180;
}

/// File naming for uploads and published outputs
pub mod files {
    /// Prefix for request-scoped reference uploads
    pub const REFERENCE_PREFIX: &str = "luma_ref";
    /// Extension used for every uploaded image reference
    pub const IMAGE_REFERENCE_EXTENSION: &str = "jpg";
    /// Extension used for video references with no known extension
    pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";
}
