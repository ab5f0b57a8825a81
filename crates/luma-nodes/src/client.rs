//! Dream Machine API client
//!
//! `LumaApi` is the seam nodes talk through; `LumaClient` is the reqwest
//! implementation. A client holds one credential and is created per node
//! invocation through an `ApiConnector`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::LumaConfig;
use crate::error::{LumaError, Result};
use crate::generation::{
    status_path, Generation, GenerationRequest, CAMERA_MOTIONS_PATH, CONCEPTS_PATH,
};

/// Operations the nodes need from the remote API
#[async_trait]
pub trait LumaApi: Send + Sync {
    /// Create a generation job
    async fn submit(&self, request: &GenerationRequest) -> Result<Generation>;

    /// Re-read a generation job by id
    async fn get_generation(&self, id: &str) -> Result<Generation>;

    /// Names of visual concepts usable in video prompts
    async fn list_concepts(&self) -> Result<Vec<String>>;

    /// Camera motion phrases usable in video prompts
    async fn list_camera_motions(&self) -> Result<Vec<String>>;
}

/// Builds an API handle for a credential
pub trait ApiConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn LumaApi>>;
}

/// HTTP client for the Dream Machine API
#[derive(Clone)]
pub struct LumaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LumaClient {
    pub fn new(config: &LumaConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_root().to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::debug!("LumaClient: failed to read {} error body: {}", status, e);
                    String::new()
                }
            };
            return Err(LumaError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        log::debug!("LumaClient: GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::decode(response).await
    }
}

#[async_trait]
impl LumaApi for LumaClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Generation> {
        let url = self.url(request.endpoint().path());
        log::debug!(
            "LumaClient: POST {} with keys {:?}",
            url,
            request.payload().keys().collect::<Vec<_>>()
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request.payload())
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn get_generation(&self, id: &str) -> Result<Generation> {
        self.get_json(&status_path(id)).await
    }

    async fn list_concepts(&self) -> Result<Vec<String>> {
        let value: serde_json::Value = self.get_json(CONCEPTS_PATH).await?;
        Ok(string_list(&value))
    }

    async fn list_camera_motions(&self) -> Result<Vec<String>> {
        let value: serde_json::Value = self.get_json(CAMERA_MOTIONS_PATH).await?;
        Ok(string_list(&value))
    }
}

/// Flatten a list response into strings.
///
/// Entries may be bare strings or objects carrying a `key` or `name`.
fn string_list(value: &serde_json::Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("key")
                .or_else(|| map.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Connector producing `LumaClient`s from a shared configuration
pub struct LumaClientConnector {
    config: LumaConfig,
}

impl LumaClientConnector {
    pub fn new(config: LumaConfig) -> Self {
        Self { config }
    }
}

impl ApiConnector for LumaClientConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn LumaApi>> {
        Ok(Arc::new(LumaClient::new(&self.config, api_key)?))
    }
}
