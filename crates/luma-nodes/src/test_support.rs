//! In-process fakes for the host collaborators and the remote API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ApiConnector, LumaApi};
use crate::config::{LumaConfig, PollConfig, PollingProfiles};
use crate::error::{LumaError, Result};
use crate::generation::{Generation, GenerationAssets, GenerationRequest, GenerationState};
use crate::services::{
    ExistingFilePolicy, FetchedBytes, HttpFetcher, LumaServices, PublicStorage, StaticSecretStore,
};

pub const API_KEY: &str = "test-key";

pub fn generation(id: &str, state: &str) -> Generation {
    Generation {
        id: id.to_string(),
        state: GenerationState::from(state),
        failure_reason: None,
        assets: None,
        generation_type: None,
        model: None,
        created_at: None,
    }
}

pub fn completed_image(id: &str, url: &str) -> Generation {
    Generation {
        assets: Some(GenerationAssets {
            image: Some(url.to_string()),
            ..GenerationAssets::default()
        }),
        ..generation(id, "completed")
    }
}

pub fn completed_video(id: &str, url: &str) -> Generation {
    Generation {
        assets: Some(GenerationAssets {
            video: Some(url.to_string()),
            ..GenerationAssets::default()
        }),
        ..generation(id, "completed")
    }
}

pub fn failed(id: &str, reason: &str) -> Generation {
    Generation {
        failure_reason: Some(reason.to_string()),
        ..generation(id, "failed")
    }
}

/// Poll outcome scripted for `ScriptedApi`
pub enum Poll {
    Job(Generation),
    Error(u16),
}

/// Remote API that replays a script of poll results.
///
/// Once the script runs out every poll reports `dreaming`.
#[derive(Default)]
pub struct ScriptedApi {
    polls: Mutex<VecDeque<Poll>>,
    submitted: Mutex<Vec<GenerationRequest>>,
    poll_count: Mutex<u32>,
    pub concepts: Vec<String>,
    pub camera_motions: Vec<String>,
    pub fail_lists: bool,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(polls: Vec<Poll>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            ..Self::default()
        }
    }

    pub fn with_lists(concepts: &[&str], camera_motions: &[&str]) -> Self {
        Self {
            concepts: concepts.iter().map(|c| c.to_string()).collect(),
            camera_motions: camera_motions.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_lists() -> Self {
        Self {
            fail_lists: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<GenerationRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> u32 {
        *self.poll_count.lock().unwrap()
    }
}

#[async_trait]
impl LumaApi for ScriptedApi {
    async fn submit(&self, request: &GenerationRequest) -> Result<Generation> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(generation("gen-1", "queued"))
    }

    async fn get_generation(&self, id: &str) -> Result<Generation> {
        *self.poll_count.lock().unwrap() += 1;
        match self.polls.lock().unwrap().pop_front() {
            Some(Poll::Job(job)) => Ok(job),
            Some(Poll::Error(status)) => Err(LumaError::Api {
                status,
                body: "upstream unavailable".to_string(),
            }),
            None => Ok(generation(id, "dreaming")),
        }
    }

    async fn list_concepts(&self) -> Result<Vec<String>> {
        if self.fail_lists {
            return Err(LumaError::Api { status: 401, body: "unauthorized".to_string() });
        }
        Ok(self.concepts.clone())
    }

    async fn list_camera_motions(&self) -> Result<Vec<String>> {
        if self.fail_lists {
            return Err(LumaError::Api { status: 401, body: "unauthorized".to_string() });
        }
        Ok(self.camera_motions.clone())
    }
}

/// Connector that always hands out the same `ScriptedApi`
pub struct ScriptedConnector {
    pub api: Arc<ScriptedApi>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new(api: Arc<ScriptedApi>) -> Self {
        Self { api, keys: Mutex::new(Vec::new()) }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl ApiConnector for ScriptedConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn LumaApi>> {
        self.keys.lock().unwrap().push(api_key.to_string());
        Ok(self.api.clone())
    }
}

/// A `save` call seen by `RecordingStorage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub policy: ExistingFilePolicy,
}

/// Storage that records saves and deletes instead of writing files
#[derive(Default)]
pub struct RecordingStorage {
    saved: Mutex<Vec<SavedFile>>,
    deleted: Mutex<Vec<String>>,
    pub fail_deletes: bool,
}

pub const PUBLIC_BASE: &str = "https://public.example.com/files";

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<SavedFile> {
        self.saved.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PublicStorage for RecordingStorage {
    async fn save(&self, bytes: &[u8], filename: &str, policy: ExistingFilePolicy) -> Result<String> {
        self.saved.lock().unwrap().push(SavedFile {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
            policy,
        });
        Ok(format!("{}/{}", PUBLIC_BASE, filename))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(url.to_string());
        if self.fail_deletes {
            return Err(LumaError::Storage("delete refused".to_string()));
        }
        Ok(())
    }
}

/// Fetcher answering from a fixed table; unknown URLs are 404
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, FetchedBytes>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, status: u16, bytes: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedBytes { status, bytes: bytes.to_vec() },
        );
        self
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBytes> {
        self.calls.lock().unwrap().push((url.to_string(), timeout));
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or(FetchedBytes { status: 404, bytes: Vec::new() }))
    }
}

/// Configuration with zero-length poll intervals and small budgets
pub fn fast_config() -> LumaConfig {
    let poll = PollConfig::new(Duration::ZERO, 5);
    LumaConfig {
        polling: PollingProfiles {
            image: poll,
            video_generation: poll,
            video_edit: poll,
        },
        ..LumaConfig::default()
    }
}

/// Fakes wired together for one test
pub struct Harness {
    pub api: Arc<ScriptedApi>,
    pub connector: Arc<ScriptedConnector>,
    pub storage: Arc<RecordingStorage>,
    pub fetcher: Arc<ScriptedFetcher>,
}

impl Harness {
    pub fn new(api: ScriptedApi, storage: RecordingStorage, fetcher: ScriptedFetcher) -> Self {
        let api = Arc::new(api);
        Self {
            connector: Arc::new(ScriptedConnector::new(api.clone())),
            api,
            storage: Arc::new(storage),
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn services(&self) -> LumaServices {
        self.services_with_secrets(StaticSecretStore::new().with_secret("LUMAAI_API_KEY", API_KEY))
    }

    pub fn services_without_key(&self) -> LumaServices {
        self.services_with_secrets(StaticSecretStore::new())
    }

    fn services_with_secrets(&self, secrets: StaticSecretStore) -> LumaServices {
        LumaServices::new(
            fast_config(),
            Arc::new(secrets),
            self.storage.clone(),
            self.fetcher.clone(),
            self.connector.clone(),
        )
    }
}
