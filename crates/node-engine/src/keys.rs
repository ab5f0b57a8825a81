//! Context key conventions and typed access helpers
//!
//! Tasks communicate via the shared graph-flow `Context`, storing inputs and
//! outputs with well-defined key patterns.
//!
//! # Key Conventions
//!
//! - Inputs: `{task_id}.input.{port_name}`
//! - Outputs: `{task_id}.output.{port_name}`
//! - Streaming: `{task_id}.stream.{port_name}`
//! - Metadata: `{task_id}.meta.{field}`
//!
//! # Example
//!
//! ```ignore
//! context.set("luma_1.input.prompt", "A red fox in the snow").await;
//!
//! // After execution
//! let status: Option<String> = context.get("luma_1.output.status").await;
//! ```

use graph_flow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{NodeEngineError, Result};

/// Helper for building context keys
pub struct ContextKeys;

impl ContextKeys {
    /// Build an input key: `{task_id}.input.{port}`
    pub fn input(task_id: &str, port: &str) -> String {
        format!("{}.input.{}", task_id, port)
    }

    /// Build an output key: `{task_id}.output.{port}`
    pub fn output(task_id: &str, port: &str) -> String {
        format!("{}.output.{}", task_id, port)
    }

    /// Build a stream key: `{task_id}.stream.{port}`
    pub fn stream(task_id: &str, port: &str) -> String {
        format!("{}.stream.{}", task_id, port)
    }

    /// Build a metadata key: `{task_id}.meta.{field}`
    pub fn meta(task_id: &str, field: &str) -> String {
        format!("{}.meta.{}", task_id, field)
    }
}

/// Read an optional input value.
pub async fn read_input<T: DeserializeOwned>(context: &Context, task_id: &str, port: &str) -> Option<T> {
    context.get(&ContextKeys::input(task_id, port)).await
}

/// Read a raw JSON input value, treating `null` as absent.
pub async fn read_raw_input(context: &Context, task_id: &str, port: &str) -> Option<serde_json::Value> {
    read_input::<serde_json::Value>(context, task_id, port)
        .await
        .filter(|v| !v.is_null())
}

/// Read a required input value.
pub async fn require_input<T: DeserializeOwned>(context: &Context, task_id: &str, port: &str) -> Result<T> {
    let key = ContextKeys::input(task_id, port);
    context
        .get(&key)
        .await
        .ok_or_else(|| NodeEngineError::MissingInput(format!("'{}' at key '{}'", port, key)))
}

/// Write an output value.
pub async fn write_output<T: Serialize + Send>(context: &Context, task_id: &str, port: &str, value: T) {
    context.set(&ContextKeys::output(task_id, port), value).await;
}
