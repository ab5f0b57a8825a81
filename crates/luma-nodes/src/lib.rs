//! Luma Nodes
//!
//! Workflow nodes for the Luma Dream Machine API: Photon image generation
//! and reframing, Ray video generation, modification and reframing, and
//! lookups of supported camera motions and concepts.
//!
//! Nodes are `graph_flow::Task`s. They read their inputs from the shared
//! `Context` under `{task_id}.input.{port}` and write `{task_id}.output.{port}`.
//! Host collaborators (secrets, public file storage, HTTP) are bundled in
//! [`LumaServices`], registered with [`setup_extensions`].

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod generation;
pub mod nodes;
pub mod payload;
pub mod poller;
pub mod progress;
pub mod reference;
pub mod services;
pub mod setup;

#[cfg(test)]
mod test_support;

pub use client::{ApiConnector, LumaApi, LumaClient, LumaClientConnector};
pub use config::{ConfigError, LumaConfig, PollConfig, PollingProfiles};
pub use error::{LumaError, Result};
pub use generation::{Endpoint, Generation, GenerationKind, GenerationRequest, GenerationState};
pub use nodes::*;
pub use poller::GenerationPoller;
pub use progress::ProgressLog;
pub use reference::{MediaKind, MediaReference, ReferenceResolver};
pub use services::{
    EnvSecretStore, ExistingFilePolicy, FetchedBytes, HttpFetcher, LumaServices, PublicStorage,
    ReqwestFetcher, SecretStore, StaticFileStorage, StaticSecretStore,
};
pub use setup::{setup_extensions, setup_extensions_with_path};

#[cfg(test)]
mod tests {
    use node_engine::NodeRegistry;

    #[test]
    fn test_inventory_collects_all_luma_nodes() {
        let registry = NodeRegistry::with_builtins();

        for node_type in [
            "luma-image-generation",
            "luma-image-reframe",
            "luma-video-generation",
            "luma-video-modify",
            "luma-video-reframe",
            "luma-list-camera-motions",
            "luma-list-concepts",
        ] {
            assert!(registry.has_node_type(node_type), "missing {}", node_type);
        }

        for metadata in registry.all_metadata() {
            assert!(
                metadata.output("status").is_some(),
                "{} has no status output",
                metadata.node_type
            );
        }
    }
}
