//! Error types for Luma nodes

use thiserror::Error;

/// Result type alias using LumaError
pub type Result<T> = std::result::Result<T, LumaError>;

/// Errors raised while validating, submitting, polling or publishing
#[derive(Debug, Error)]
pub enum LumaError {
    /// API key secret is not configured
    #[error("Luma API key not found. Please set the {0} environment variable.")]
    MissingCredential(String),

    /// Empty prompt, image or video
    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    /// A choice port holds a value outside its choice list
    #[error("Invalid value '{value}' for {port}")]
    InvalidChoice { port: String, value: String },

    /// Reference input was empty or could not be interpreted
    #[error("Reference unavailable: {0}")]
    ReferenceUnavailable(String),

    /// Fetching bytes over HTTP returned a non-success status
    #[error("Failed to download {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    /// The remote job reached the failed state; `job` names it ("Reframe")
    #[error("{job} failed: {reason}")]
    GenerationFailed { job: String, reason: String },

    /// The local attempt budget ran out
    #[error("{job} timed out after {attempts} attempts")]
    GenerationTimedOut { job: String, attempts: u32 },

    /// Network or client failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Luma API answered with a non-success status
    #[error("Luma API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A completed job carried no asset of the expected kind
    #[error("Generation {0} completed without a result asset")]
    MissingAsset(String),

    /// Public storage rejected a save or delete
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pre-flight validation, every problem reported together
    #[error("{}", join_messages(.0))]
    Validation(Vec<LumaError>),
}

fn join_messages(errors: &[LumaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LumaError {
    /// Build a `Validation` error, or `None` when there is nothing to report.
    pub fn collect(errors: Vec<LumaError>) -> Option<LumaError> {
        if errors.is_empty() {
            None
        } else {
            Some(LumaError::Validation(errors))
        }
    }

    pub fn into_graph_error(self) -> graph_flow::GraphError {
        graph_flow::GraphError::TaskExecutionFailed(self.to_string())
    }
}
