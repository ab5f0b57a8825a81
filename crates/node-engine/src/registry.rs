//! Catalog of node types
//!
//! Hosts build one with [`NodeRegistry::with_builtins`] to populate a node
//! palette and to validate saved graphs against the node types actually
//! linked in. Listing order is by node type so palettes stay stable between
//! runs.
//!
//! ```ignore
//! let registry = node_engine::NodeRegistry::with_builtins();
//! let meta = registry.require_metadata("luma-image-generation")?;
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::descriptor::{DescriptorFn, TaskMetadata};
use crate::error::{NodeEngineError, Result};
use crate::types::NodeCategory;

#[derive(Default)]
pub struct NodeRegistry {
    entries: BTreeMap<String, TaskMetadata>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every descriptor submitted with `inventory::submit!(DescriptorFn(..))`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in inventory::iter::<DescriptorFn> {
            registry.register_metadata((descriptor.0)());
        }
        log::debug!("NodeRegistry: collected {} built-in nodes", registry.entries.len());
        registry
    }

    /// Add or replace the entry for `metadata.node_type`
    pub fn register_metadata(&mut self, metadata: TaskMetadata) {
        if self.entries.contains_key(&metadata.node_type) {
            log::debug!("NodeRegistry: replacing {}", metadata.node_type);
        }
        self.entries.insert(metadata.node_type.clone(), metadata);
    }

    pub fn get_metadata(&self, node_type: &str) -> Option<&TaskMetadata> {
        self.entries.get(node_type)
    }

    pub fn require_metadata(&self, node_type: &str) -> Result<&TaskMetadata> {
        self.get_metadata(node_type)
            .ok_or_else(|| NodeEngineError::UnknownNodeType(node_type.to_string()))
    }

    pub fn all_metadata(&self) -> Vec<&TaskMetadata> {
        self.entries.values().collect()
    }

    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&TaskMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&TaskMetadata>> = HashMap::new();
        for metadata in self.entries.values() {
            grouped.entry(metadata.category).or_default().push(metadata);
        }
        grouped
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Absorb `other`; its entries win on conflicting node types
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }
}
