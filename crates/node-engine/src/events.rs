//! Node lifecycle and streaming events
//!
//! A running node reports to whatever sink the host hands it: a channel to a
//! UI, a log collector, or nothing at all. Long-running nodes stream their
//! human-readable status line by line as `TaskStream` events so the host can
//! show progress before the final outputs exist.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination for node events
///
/// Sending must not block; sinks that buffer do so internally.
pub trait EventSink: Send + Sync {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// A sink refused an event
#[derive(Debug, Clone, Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn channel_closed() -> Self {
        Self::new("Channel closed")
    }
}

/// Events emitted while a node runs
///
/// Serialized with a camelCase `type` tag for hosts that forward events to
/// a web frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    #[serde(rename_all = "camelCase")]
    TaskStarted { task_id: String, execution_id: String },

    /// `output` is the node's primary output value, if it has one
    #[serde(rename_all = "camelCase")]
    TaskCompleted {
        task_id: String,
        execution_id: String,
        output: Option<serde_json::Value>,
    },

    #[serde(rename_all = "camelCase")]
    TaskFailed {
        task_id: String,
        execution_id: String,
        error: String,
    },

    /// One chunk of incremental output on `port`
    #[serde(rename_all = "camelCase")]
    TaskStream {
        task_id: String,
        execution_id: String,
        port: String,
        data: serde_json::Value,
    },
}

impl WorkflowEvent {
    pub fn task_started(task_id: &str, execution_id: &str) -> Self {
        Self::TaskStarted {
            task_id: task_id.to_string(),
            execution_id: execution_id.to_string(),
        }
    }

    pub fn task_completed(
        task_id: &str,
        execution_id: &str,
        output: Option<serde_json::Value>,
    ) -> Self {
        Self::TaskCompleted {
            task_id: task_id.to_string(),
            execution_id: execution_id.to_string(),
            output,
        }
    }

    pub fn task_failed(task_id: &str, execution_id: &str, error: impl Into<String>) -> Self {
        Self::TaskFailed {
            task_id: task_id.to_string(),
            execution_id: execution_id.to_string(),
            error: error.into(),
        }
    }

    pub fn task_stream(
        task_id: &str,
        execution_id: &str,
        port: &str,
        data: serde_json::Value,
    ) -> Self {
        Self::TaskStream {
            task_id: task_id.to_string(),
            execution_id: execution_id.to_string(),
            port: port.to_string(),
            data,
        }
    }

    /// Task the event belongs to
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::TaskStream { task_id, .. } => task_id,
        }
    }
}

/// Discards everything
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Default)]
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::new("Event buffer poisoned"))?
            .push(event);
        Ok(())
    }
}
