//! Plumbing shared by the Luma nodes: input access, pre-flight validation,
//! and the per-invocation run state (status log, reference uploads, output
//! publishing).

use std::sync::Arc;

use graph_flow::{Context, NextAction, TaskResult};
use node_engine::{
    read_raw_input, write_output, ContextKeys, PortValues, TaskMetadata, WorkflowEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::LumaApi;
use crate::config::PollConfig;
use crate::error::{LumaError, Result};
use crate::poller::GenerationPoller;
use crate::progress::{ProgressLog, STATUS_PORT};
use crate::reference::{MediaKind, MediaReference, ReferenceResolver};
use crate::services::{ExistingFilePolicy, LumaServices};

/// Status output port shared by every node
pub const PORT_STATUS: &str = STATUS_PORT;

/// Context meta field holding the host's execution id
pub const EXECUTION_ID_FIELD: &str = "execution_id";

/// A published output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub kind: MediaKind,
    pub url: String,
    pub name: String,
}

/// Input values of one invocation, backed by descriptor defaults
#[derive(Debug, Clone)]
pub struct NodeInputs {
    metadata: TaskMetadata,
    values: PortValues,
}

impl NodeInputs {
    /// Read every declared input from `{task_id}.input.{port}`
    pub async fn read(context: &Context, task_id: &str, metadata: TaskMetadata) -> Self {
        let mut values = PortValues::new();
        for port in &metadata.inputs {
            if let Some(value) = read_raw_input(context, task_id, &port.id).await {
                values.insert(port.id.clone(), value);
            }
        }
        Self { metadata, values }
    }

    pub fn from_values(metadata: TaskMetadata, values: PortValues) -> Self {
        Self { metadata, values }
    }

    pub fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    /// Values set on the node, without defaults
    pub fn values(&self) -> &PortValues {
        &self.values
    }

    /// Value set on the node, without defaults
    pub fn explicit(&self, port: &str) -> Option<&Value> {
        self.values.get(port)
    }

    fn value(&self, port: &str) -> Option<&Value> {
        self.values
            .get(port)
            .or_else(|| self.metadata.default_value(port))
    }

    pub fn text(&self, port: &str) -> String {
        match self.value(port) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    pub fn integer(&self, port: &str) -> i64 {
        match self.value(port) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn number(&self, port: &str) -> Option<f64> {
        number_of(self.value(port)?)
    }

    pub fn flag(&self, port: &str) -> bool {
        match self.value(port) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn media(&self, port: &str) -> Result<Option<MediaReference>> {
        match self.values.get(port) {
            Some(value) => MediaReference::from_value(value),
            None => Ok(None),
        }
    }
}

pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Collects every pre-flight problem before anything remote happens
#[derive(Default)]
pub struct Validation {
    errors: Vec<LumaError>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_text(&mut self, inputs: &NodeInputs, port: &str) {
        if inputs.text(port).trim().is_empty() {
            self.errors
                .push(LumaError::MissingRequiredInput(port.to_string()));
        }
    }

    pub fn require_media(&mut self, inputs: &NodeInputs, port: &str) -> Option<MediaReference> {
        match inputs.media(port) {
            Ok(Some(reference)) => Some(reference),
            Ok(None) => {
                self.errors
                    .push(LumaError::MissingRequiredInput(port.to_string()));
                None
            }
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    pub fn optional_media(&mut self, inputs: &NodeInputs, port: &str) -> Option<MediaReference> {
        match inputs.media(port) {
            Ok(reference) => reference,
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    /// Every input with a choice list must hold one of its choices
    pub fn check_choices(&mut self, inputs: &NodeInputs) {
        for port in inputs.metadata().inputs.iter().filter(|p| !p.choices.is_empty()) {
            let value = inputs.text(&port.id);
            if !value.is_empty() && !port.accepts_choice(&value) {
                self.errors.push(LumaError::InvalidChoice {
                    port: port.id.clone(),
                    value,
                });
            }
        }
    }

    /// Add the credential check and return the API key, or every error found
    pub fn finish(mut self, services: &LumaServices) -> Result<String> {
        let api_key = services.api_key();
        if api_key.is_none() {
            self.errors
                .push(LumaError::MissingCredential(services.config.api_key_secret.clone()));
        }

        if let Some(err) = LumaError::collect(self.errors) {
            return Err(err);
        }
        api_key.ok_or_else(|| LumaError::MissingCredential(services.config.api_key_secret.clone()))
    }
}

/// Log and convert a pre-flight rejection
pub(crate) fn rejected(node: &str, task_id: &str, err: LumaError) -> graph_flow::GraphError {
    log::warn!("{} {}: rejected before submission: {}", node, task_id, err);
    err.into_graph_error()
}

async fn execution_id(task_id: &str, context: &Context) -> String {
    context
        .get(&ContextKeys::meta(task_id, EXECUTION_ID_FIELD))
        .await
        .unwrap_or_else(|| task_id.to_string())
}

/// Status log for one invocation, streamed to the configured event sink
pub(crate) async fn status_log(task_id: &str, services: &LumaServices, context: &Context) -> ProgressLog {
    let execution_id = execution_id(task_id, context).await;
    ProgressLog::streaming(services.events.clone(), task_id, execution_id)
}

/// Result of downloading a generated asset and re-publishing it
#[derive(Debug, Clone)]
pub struct Published {
    pub artifact: MediaArtifact,
    /// Where the remote service hosted the asset
    pub source_url: String,
}

/// State of one generation node invocation
pub struct NodeRun {
    node: &'static str,
    task_id: String,
    execution_id: String,
    services: Arc<LumaServices>,
    pub log: ProgressLog,
    resolver: ReferenceResolver,
}

impl NodeRun {
    pub async fn start(
        node: &'static str,
        task_id: &str,
        services: &Arc<LumaServices>,
        context: &Context,
    ) -> Self {
        let resolver = ReferenceResolver::new(
            services.storage.clone(),
            services.fetcher.clone(),
            services.config.reference_fetch_timeout(),
        );
        let run = Self {
            node,
            task_id: task_id.to_string(),
            execution_id: execution_id(task_id, context).await,
            services: services.clone(),
            log: status_log(task_id, services, context).await,
            resolver,
        };
        run.emit(WorkflowEvent::task_started(&run.task_id, &run.execution_id));
        run
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.services.events.send(event) {
            log::debug!("{} {}: event dropped: {}", self.node, self.task_id, e);
        }
    }

    /// One API handle per invocation
    pub fn connect(&self, api_key: &str) -> Result<Arc<dyn LumaApi>> {
        self.services.connector.connect(api_key)
    }

    pub fn poller(
        &self,
        api: Arc<dyn LumaApi>,
        config: PollConfig,
        noun: &'static str,
    ) -> GenerationPoller {
        GenerationPoller::new(api, config).with_noun(noun)
    }

    pub fn config(&self) -> &crate::config::LumaConfig {
        &self.services.config
    }

    pub async fn resolve(
        &mut self,
        reference: Option<&MediaReference>,
        slot: &str,
        kind: MediaKind,
    ) -> Result<String> {
        self.resolver.resolve(reference, slot, kind).await
    }

    /// Download the asset at `source_url` and save it as
    /// `{prefix}_{millis}.{extension}` in public storage
    pub async fn publish(
        &mut self,
        source_url: &str,
        kind: MediaKind,
        prefix: &str,
        extension: &str,
    ) -> Result<Published> {
        let timeout = match kind {
            MediaKind::Image => self.services.config.image_download_timeout(),
            MediaKind::Video => self.services.config.video_download_timeout(),
        };
        let bytes = self
            .services
            .fetcher
            .fetch(source_url, timeout)
            .await?
            .into_success(source_url)?;

        let name = format!("{}_{}", prefix, chrono::Utc::now().timestamp_millis());
        let filename = format!("{}.{}", name, extension);
        let url = self
            .services
            .storage
            .save(&bytes, &filename, ExistingFilePolicy::CreateNew)
            .await?;

        log::debug!(
            "{} {}: saved {} bytes from {} as {}",
            self.node,
            self.task_id,
            bytes.len(),
            source_url,
            url
        );

        Ok(Published {
            artifact: MediaArtifact { kind, url, name },
            source_url: source_url.to_string(),
        })
    }

    /// Release reference uploads, then write outputs for `outcome`
    pub async fn finish(
        mut self,
        context: &Context,
        outcome: Result<Published>,
        noun: &str,
        output_port: &str,
    ) -> graph_flow::Result<TaskResult> {
        self.resolver.release().await;

        match outcome {
            Ok(published) => {
                self.log.push(format!("✅ {} completed successfully!", noun));
                self.log.push(format!("Original URL: {}", published.source_url));

                write_output(context, &self.task_id, output_port, &published.artifact).await;
                write_output(context, &self.task_id, PORT_STATUS, self.log.text()).await;
                self.emit(WorkflowEvent::task_completed(
                    &self.task_id,
                    &self.execution_id,
                    serde_json::to_value(&published.artifact).ok(),
                ));

                log::info!(
                    "{} {}: published {}",
                    self.node,
                    self.task_id,
                    published.artifact.url
                );
                Ok(TaskResult::new(Some(published.artifact.url), NextAction::Continue))
            }
            Err(e) => {
                self.log.push(format!("❌ {} failed: {}", noun, e));
                write_output(context, &self.task_id, PORT_STATUS, self.log.text()).await;
                self.emit(WorkflowEvent::task_failed(
                    &self.task_id,
                    &self.execution_id,
                    e.to_string(),
                ));

                log::warn!("{} {}: {}", self.node, self.task_id, e);
                Err(e.into_graph_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::{ExecutionMode, NodeCategory, PortDataType, PortMetadata, VecEventSink};
    use serde_json::json;

    use crate::test_support::{Harness, RecordingStorage, ScriptedApi, ScriptedFetcher};

    fn metadata() -> TaskMetadata {
        TaskMetadata {
            node_type: "test".to_string(),
            category: NodeCategory::Processing,
            label: "Test".to_string(),
            description: String::new(),
            inputs: vec![
                PortMetadata::required("prompt", "Prompt", PortDataType::Prompt),
                PortMetadata::optional("model", "Model", PortDataType::String)
                    .with_default(json!("ray-2"))
                    .with_choices(&["ray-2", "ray-flash-2"]),
                PortMetadata::optional("x_start", "X Start", PortDataType::Number)
                    .with_default(json!(0)),
                PortMetadata::optional("loop", "Loop", PortDataType::Boolean)
                    .with_default(json!(false)),
                PortMetadata::optional("image", "Image", PortDataType::Image),
            ],
            outputs: vec![],
            execution_mode: ExecutionMode::Batch,
        }
    }

    #[tokio::test]
    async fn test_inputs_fall_back_to_defaults() {
        let context = Context::new();
        context.set(&ContextKeys::input("t", "x_start"), 12.7).await;
        context.set(&ContextKeys::input("t", "loop"), true).await;

        let inputs = NodeInputs::read(&context, "t", metadata()).await;
        assert_eq!(inputs.text("model"), "ray-2");
        assert_eq!(inputs.integer("x_start"), 12);
        assert!(inputs.flag("loop"));
        assert_eq!(inputs.text("prompt"), "");
        assert!(inputs.explicit("model").is_none());
        assert_eq!(inputs.media("image").unwrap(), None);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let harness = Harness::new(ScriptedApi::new(), RecordingStorage::new(), ScriptedFetcher::new());
        let mut values = PortValues::new();
        values.insert("model".to_string(), json!("ray-9"));
        let inputs = NodeInputs::from_values(metadata(), values);

        let mut validation = Validation::new();
        validation.require_text(&inputs, "prompt");
        validation.require_media(&inputs, "image");
        validation.check_choices(&inputs);

        match validation.finish(&harness.services_without_key()) {
            Err(LumaError::Validation(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(matches!(errors[0], LumaError::MissingRequiredInput(ref p) if p == "prompt"));
                assert!(matches!(errors[2], LumaError::InvalidChoice { .. }));
                assert!(matches!(errors[3], LumaError::MissingCredential(_)));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_passes_with_key() {
        let harness = Harness::new(ScriptedApi::new(), RecordingStorage::new(), ScriptedFetcher::new());
        let mut values = PortValues::new();
        values.insert("prompt".to_string(), json!("a cat"));
        let inputs = NodeInputs::from_values(metadata(), values);

        let mut validation = Validation::new();
        validation.require_text(&inputs, "prompt");
        validation.check_choices(&inputs);

        assert_eq!(validation.finish(&harness.services()).unwrap(), crate::test_support::API_KEY);
    }

    #[tokio::test]
    async fn test_publish_download_failure() {
        let harness = Harness::new(ScriptedApi::new(), RecordingStorage::new(), ScriptedFetcher::new());
        let services = Arc::new(harness.services());
        let context = Context::new();

        let mut run = NodeRun::start("TestTask", "t", &services, &context).await;
        let err = run
            .publish("https://cdn.example.com/gone.jpg", MediaKind::Image, "luma_photon", "jpg")
            .await
            .unwrap_err();

        assert!(matches!(err, LumaError::DownloadFailed { status: 404, .. }));
        assert!(harness.storage.saved().is_empty());
    }

    #[tokio::test]
    async fn test_run_reports_lifecycle_events() {
        let harness = Harness::new(ScriptedApi::new(), RecordingStorage::new(), ScriptedFetcher::new());
        let sink = Arc::new(VecEventSink::new());
        let services = Arc::new(harness.services().with_events(sink.clone()));
        let context = Context::new();
        context.set("t.meta.execution_id", "exec-3").await;

        let run = NodeRun::start("TestTask", "t", &services, &context).await;
        let outcome = Err(LumaError::GenerationFailed {
            job: "Generation".to_string(),
            reason: "nsfw".to_string(),
        });
        assert!(run.finish(&context, outcome, "Test", "image").await.is_err());

        let events = sink.events();
        assert_eq!(events.first(), Some(&WorkflowEvent::task_started("t", "exec-3")));
        assert_eq!(
            events.last(),
            Some(&WorkflowEvent::task_failed("t", "exec-3", "Generation failed: nsfw"))
        );
        assert!(events.iter().any(|e| matches!(
            e,
            WorkflowEvent::TaskStream { data, .. } if data == "❌ Test failed: Generation failed: nsfw"
        )));
    }
}
