//! Node Engine - contracts for workflow plugin nodes
//!
//! This crate defines what a node looks like to a host, independent of what
//! the node does:
//!
//! - `TaskDescriptor` / `TaskMetadata`: self-described ports, labels and defaults
//! - `DynamicPorts`: value-driven input visibility, evaluated as pure functions
//! - `NodeRegistry`: catalog of every node linked into the binary
//! - `ContextKeys`: key conventions for the shared graph-flow `Context`
//! - `EventSink`: generic event streaming (not tied to any UI)
//! - `ExecutorExtensions`: injection of non-serializable runtime services
//!
//! Nodes themselves implement graph-flow's `Task` trait.

pub mod descriptor;
pub mod error;
pub mod events;
pub mod extensions;
pub mod keys;
pub mod registry;
pub mod types;
pub mod visibility;

// Re-export key types
pub use descriptor::{DescriptorFn, PortMetadata, TaskDescriptor, TaskMetadata};
pub use error::{NodeEngineError, Result};
pub use events::{EventError, EventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use extensions::{extension_keys, ExecutorExtensions};
pub use keys::{read_input, read_raw_input, require_input, write_output, ContextKeys};
pub use registry::NodeRegistry;
pub use types::{ExecutionMode, NodeCategory, PortDataType, PortId};
pub use visibility::{default_visible, string_value, DynamicPorts, PortValues};

// Re-export graph-flow types that consumers will need
pub use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
