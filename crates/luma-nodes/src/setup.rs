//! Extensions setup for host applications.
//!
//! Hosts call [`setup_extensions`] at startup to place the shared
//! [`LumaServices`] in `ExecutorExtensions`. Node factories then pull it out
//! with [`LumaServices::from_extensions`], so host crates never construct
//! HTTP clients or secret stores themselves.

use std::path::Path;
use std::sync::Arc;

use node_engine::{extension_keys, ExecutorExtensions};

use crate::client::LumaClientConnector;
use crate::config::{ConfigError, LumaConfig};
use crate::services::{EnvSecretStore, LumaServices, PublicStorage, ReqwestFetcher};

/// Store `services` under `extension_keys::LUMA_SERVICES`.
///
/// # Example
///
/// ```ignore
/// let mut extensions = node_engine::ExecutorExtensions::new();
/// let storage = Arc::new(StaticFileStorage::new("/srv/static", "http://localhost:8124/static"));
/// luma_nodes::setup_extensions(&mut extensions, Arc::new(LumaServices::from_config(config, storage)));
/// ```
pub fn setup_extensions(extensions: &mut ExecutorExtensions, services: Arc<LumaServices>) {
    log::info!("Luma services registered (API root {})", services.config.api_root());
    extensions.set(extension_keys::LUMA_SERVICES, services);
}

/// Load configuration from `config_path` (defaults if missing), apply
/// environment overrides, and register the default services.
pub async fn setup_extensions_with_path(
    extensions: &mut ExecutorExtensions,
    config_path: &Path,
    storage: Arc<dyn PublicStorage>,
) -> Result<(), ConfigError> {
    let config = LumaConfig::load(config_path).await?.with_env_overrides();
    setup_extensions(extensions, Arc::new(LumaServices::from_config(config, storage)));
    Ok(())
}

impl LumaServices {
    /// Default collaborators: process-environment secrets, reqwest fetcher
    /// and one reqwest client per invocation
    pub fn from_config(config: LumaConfig, storage: Arc<dyn PublicStorage>) -> Self {
        let connector = Arc::new(LumaClientConnector::new(config.clone()));
        Self::new(
            config,
            Arc::new(EnvSecretStore),
            storage,
            Arc::new(ReqwestFetcher::new()),
            connector,
        )
    }

    /// Services registered by [`setup_extensions`], if any
    pub fn from_extensions(extensions: &ExecutorExtensions) -> Option<Arc<LumaServices>> {
        extensions
            .get::<Arc<LumaServices>>(extension_keys::LUMA_SERVICES)
            .cloned()
    }
}
