//! Human-readable progress log
//!
//! Append-only. Lines become the node's `status` output and, when a sink is
//! attached, are streamed as `TaskStream` events on the `status` port.

use std::sync::Arc;

use node_engine::{EventSink, WorkflowEvent};

/// Port the log is published on
pub const STATUS_PORT: &str = "status";

#[derive(Default)]
pub struct ProgressLog {
    lines: Vec<String>,
    stream: Option<StatusStream>,
}

struct StatusStream {
    sink: Arc<dyn EventSink>,
    task_id: String,
    execution_id: String,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that also streams each line to `sink`
    pub fn streaming(
        sink: Arc<dyn EventSink>,
        task_id: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            lines: Vec::new(),
            stream: Some(StatusStream {
                sink,
                task_id: task_id.into(),
                execution_id: execution_id.into(),
            }),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();

        if let Some(stream) = &self.stream {
            let event = WorkflowEvent::task_stream(
                &stream.task_id,
                &stream.execution_id,
                STATUS_PORT,
                serde_json::Value::String(line.clone()),
            );
            if let Err(e) = stream.sink.send(event) {
                log::debug!("ProgressLog {}: dropped status line: {}", stream.task_id, e);
            }
        }

        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// All lines, each newline-terminated
    pub fn text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut text, line| {
            text.push_str(line);
            text.push('\n');
            text
        })
    }
}
