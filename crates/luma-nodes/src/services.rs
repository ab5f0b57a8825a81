//! Host collaborators
//!
//! Secrets, public file storage and plain HTTP fetching are owned by the
//! host. Nodes only see these traits; the default implementations cover a
//! standalone process (environment secrets, a served directory, reqwest).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use node_engine::{EventSink, NullEventSink};
use tokio::io::AsyncWriteExt;

use crate::client::ApiConnector;
use crate::config::LumaConfig;
use crate::error::{LumaError, Result};

/// Read-only access to configured secrets
pub trait SecretStore: Send + Sync {
    /// Value of `key`, or `None` when unset or empty
    fn get_secret(&self, key: &str) -> Option<String>;
}

/// Secrets from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Secrets held in memory
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn get_secret(&self, key: &str) -> Option<String> {
        self.secrets
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// What to do when a file with the same name already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingFilePolicy {
    #[default]
    Overwrite,
    /// Keep the existing file and pick `name_1.ext`, `name_2.ext`, ...
    CreateNew,
}

/// Storage whose files are reachable by the remote API
#[async_trait]
pub trait PublicStorage: Send + Sync {
    /// Store `bytes` and return the public URL
    async fn save(&self, bytes: &[u8], filename: &str, policy: ExistingFilePolicy) -> Result<String>;

    /// Remove a file previously returned by `save`
    async fn delete(&self, url: &str) -> Result<()>;
}

/// Files written to a directory that a web server exposes at `public_base_url`
#[derive(Debug, Clone)]
pub struct StaticFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl StaticFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_base_url, filename)
    }

    fn check_filename(filename: &str) -> Result<()> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(LumaError::Storage(format!("invalid filename '{}'", filename)));
        }
        Ok(())
    }

    /// `filename` for `n == 0`, otherwise `stem_n.ext`
    fn numbered(filename: &str, n: u32) -> String {
        if n == 0 {
            return filename.to_string();
        }
        match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, n, ext),
            _ => format!("{}_{}", filename, n),
        }
    }

    /// Claim the first free name with `create_new`, so concurrent savers of
    /// the same filename never share a file
    async fn write_new(&self, bytes: &[u8], filename: &str) -> Result<String> {
        let mut n: u32 = 0;
        loop {
            let candidate = Self::numbered(filename, n);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&candidate))
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl PublicStorage for StaticFileStorage {
    async fn save(&self, bytes: &[u8], filename: &str, policy: ExistingFilePolicy) -> Result<String> {
        Self::check_filename(filename)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let name = match policy {
            ExistingFilePolicy::Overwrite => {
                tokio::fs::write(self.root.join(filename), bytes).await?;
                filename.to_string()
            }
            ExistingFilePolicy::CreateNew => self.write_new(bytes, filename).await?,
        };

        log::debug!("StaticFileStorage: saved {} bytes as {}", bytes.len(), name);
        Ok(self.public_url(&name))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let filename = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| LumaError::Storage(format!("'{}' is not served by this storage", url)))?;
        Self::check_filename(filename)?;

        match tokio::fs::remove_file(self.root.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("StaticFileStorage: {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Bytes and status of a plain HTTP GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl FetchedBytes {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body, or `DownloadFailed` for a non-2xx status
    pub fn into_success(self, url: &str) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.bytes)
        } else {
            Err(LumaError::DownloadFailed {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Unauthenticated HTTP GET
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBytes>;
}

/// reqwest-backed fetcher
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBytes> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedBytes { status, bytes })
    }
}

/// Everything a Luma node needs from its host
#[derive(Clone)]
pub struct LumaServices {
    pub config: LumaConfig,
    pub secrets: Arc<dyn SecretStore>,
    pub storage: Arc<dyn PublicStorage>,
    pub fetcher: Arc<dyn HttpFetcher>,
    pub connector: Arc<dyn ApiConnector>,
    pub events: Arc<dyn EventSink>,
}

impl LumaServices {
    pub fn new(
        config: LumaConfig,
        secrets: Arc<dyn SecretStore>,
        storage: Arc<dyn PublicStorage>,
        fetcher: Arc<dyn HttpFetcher>,
        connector: Arc<dyn ApiConnector>,
    ) -> Self {
        Self {
            config,
            secrets,
            storage,
            fetcher,
            connector,
            events: Arc::new(NullEventSink),
        }
    }

    /// Stream status lines to `events`
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The configured API key, if any
    pub fn api_key(&self) -> Option<String> {
        self.secrets.get_secret(&self.config.api_key_secret)
    }

    /// The configured API key, or `MissingCredential`
    pub fn require_api_key(&self) -> Result<String> {
        self.api_key()
            .ok_or_else(|| LumaError::MissingCredential(self.config.api_key_secret.clone()))
    }
}
