//! Port and node classification types

use serde::{Deserialize, Serialize};

/// Unique identifier for a port
pub type PortId = String;

/// What a port carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDataType {
    Any,
    String,
    /// Free-form text sent to a model
    Prompt,
    Number,
    Boolean,
    Json,
    /// Image artifact: a URL, a URL artifact object, or inline base64
    Image,
    /// Video artifact, same shapes as `Image`
    Video,
    /// List of strings
    List,
}

impl PortDataType {
    /// Whether an output of this type may feed an input of type `input`
    pub fn is_compatible_with(&self, input: &PortDataType) -> bool {
        use PortDataType::*;

        match (self, input) {
            (Any, _) | (_, Any) => true,
            (Prompt, String) | (String, Prompt) => true,
            // A plain URL string is a valid media reference
            (String, Image) | (String, Video) => true,
            (a, b) => a == b,
        }
    }
}

/// Palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Remote generation and transformation
    Processing,
    /// Lookups and helpers
    Utility,
}

/// When the host should run a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Once, when the graph reaches it
    Batch,
    /// Only on an explicit user trigger
    Manual,
}
