//! Self-described node metadata
//!
//! A node's `descriptor()` is the single definition of its ports: hosts
//! render editors from it, and the node itself reads defaults and choice
//! lists from the same value at run time.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionMode, NodeCategory, PortDataType};

/// Implemented by every node type
///
/// ```ignore
/// impl TaskDescriptor for LumaListConceptsTask {
///     fn descriptor() -> TaskMetadata {
///         TaskMetadata {
///             node_type: "luma-list-concepts".to_string(),
///             category: NodeCategory::Utility,
///             label: "Luma Concepts".to_string(),
///             description: "Lists the concepts available for Luma generations".to_string(),
///             inputs: vec![],
///             outputs: vec![PortMetadata::optional("concepts", "Concepts", PortDataType::List)],
///             execution_mode: ExecutionMode::Manual,
///         }
///     }
/// }
/// ```
pub trait TaskDescriptor {
    fn descriptor() -> TaskMetadata
    where
        Self: Sized;
}

/// Link-time registration, collected by `NodeRegistry::with_builtins`
///
/// ```ignore
/// inventory::submit!(node_engine::DescriptorFn(LumaListConceptsTask::descriptor));
/// ```
pub struct DescriptorFn(pub fn() -> TaskMetadata);

inventory::collect!(DescriptorFn);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Stable type id, e.g. "luma-image-generation"
    pub node_type: String,
    pub category: NodeCategory,
    pub label: String,
    pub description: String,
    pub inputs: Vec<PortMetadata>,
    pub outputs: Vec<PortMetadata>,
    pub execution_mode: ExecutionMode,
}

impl TaskMetadata {
    pub fn input(&self, id: &str) -> Option<&PortMetadata> {
        self.inputs.iter().find(|p| p.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&PortMetadata> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Descriptor default of input `id`
    pub fn default_value(&self, id: &str) -> Option<&serde_json::Value> {
        self.input(id).and_then(|p| p.default_value.as_ref())
    }
}

/// One input or output port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Used in context keys: `{task_id}.input.{id}`
    pub id: String,
    pub label: String,
    pub data_type: PortDataType,
    pub required: bool,
    /// Used when nothing is connected or set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Closed set of accepted strings; empty means free-form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Hidden until the node's visibility rules reveal it
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl PortMetadata {
    fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
            required,
            default_value: None,
            choices: Vec::new(),
            hidden: false,
            tooltip: None,
        }
    }

    pub fn required(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, true)
    }

    pub fn optional(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, false)
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Whether `value` is one of this port's choices
    pub fn accepts_choice(&self, value: &str) -> bool {
        self.choices.is_empty() || self.choices.iter().any(|c| c == value)
    }
}
