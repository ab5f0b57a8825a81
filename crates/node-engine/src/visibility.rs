//! Value-driven port visibility.
//!
//! Some nodes show or hide inputs depending on other inputs (a model that
//! does not support a parameter hides it). Instead of mutating UI state
//! imperatively, a node exposes pure functions over the current port values
//! and the host re-evaluates them after every value change.

use std::collections::{BTreeSet, HashMap};

use crate::descriptor::{TaskDescriptor, TaskMetadata};

/// Current values of a node's input ports, keyed by port id.
pub type PortValues = HashMap<String, serde_json::Value>;

/// Nodes whose visible inputs depend on their current values.
pub trait DynamicPorts: TaskDescriptor {
    /// Input port ids that should be visible for `values`.
    ///
    /// The default shows every input that is not hidden by default.
    fn visible_inputs(values: &PortValues) -> BTreeSet<String>
    where
        Self: Sized,
    {
        let _ = values;
        default_visible(&Self::descriptor())
    }

    /// Values implied by a change to `changed_port`.
    ///
    /// Returned entries should be applied by the host on top of `values`.
    fn derived_values(changed_port: &str, values: &PortValues) -> PortValues
    where
        Self: Sized,
    {
        let _ = (changed_port, values);
        PortValues::new()
    }
}

/// Inputs of `metadata` that are not hidden by default.
pub fn default_visible(metadata: &TaskMetadata) -> BTreeSet<String> {
    metadata
        .inputs
        .iter()
        .filter(|p| !p.hidden)
        .map(|p| p.id.clone())
        .collect()
}

/// Look up a string value, falling back to the descriptor default.
pub fn string_value<'a>(
    values: &'a PortValues,
    metadata: &'a TaskMetadata,
    port: &str,
) -> Option<&'a str> {
    values
        .get(port)
        .and_then(|v| v.as_str())
        .or_else(|| metadata.default_value(port).and_then(|v| v.as_str()))
}
