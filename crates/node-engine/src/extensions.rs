//! Injection of non-serializable runtime services
//!
//! `graph_flow::Context` only holds JSON values, so HTTP clients, storage
//! backends and secret stores travel separately: the host fills an
//! `ExecutorExtensions` at startup and node factories pull what they need
//! out of it by well-known key.

use std::any::Any;
use std::collections::HashMap;

/// Typed map of `Send + Sync` values
#[derive(Default)]
pub struct ExecutorExtensions {
    inner: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ExecutorExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value under `key`
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        if self.inner.insert(key.to_string(), Box::new(value)).is_some() {
            log::debug!("ExecutorExtensions: replaced '{}'", key);
        }
    }

    /// `None` when the key is absent or holds another type
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.inner.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

/// Well-known extension keys
pub mod extension_keys {
    /// `Arc<luma_nodes::LumaServices>`
    pub const LUMA_SERVICES: &str = "luma_services";
}
