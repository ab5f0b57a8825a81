//! Ray Video Reframe Task

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task, TaskResult};
use node_engine::{
    DynamicPorts, ExecutionMode, NodeCategory, PortDataType, PortMetadata, TaskDescriptor,
    TaskMetadata,
};
use serde_json::json;

use super::common::{rejected, NodeInputs, NodeRun, Validation, PORT_STATUS};
use super::reframe::{geometry_ports, ReframeJob, PORT_ASPECT_RATIO, PORT_MODEL, PORT_PROMPT};
use crate::error::LumaError;
use crate::payload::modify::{DEFAULT_MODEL, MODELS};
use crate::payload::reframe::{ReframeTarget, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO};
use crate::services::LumaServices;

/// Luma Ray video reframe
///
/// Same inputs as the image reframe, with `input_video` as the source and
/// `output_video` as the result.
#[derive(Clone)]
pub struct LumaVideoReframeTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaVideoReframeTask {
    pub const NODE_TYPE: &'static str = "luma-video-reframe";

    pub const PORT_INPUT_VIDEO: &'static str = "input_video";
    pub const PORT_OUTPUT_VIDEO: &'static str = "output_video";

    const JOB: ReframeJob = ReframeJob {
        target: ReframeTarget::Video,
        input_port: Self::PORT_INPUT_VIDEO,
        media_label: "video",
    };

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }
}

impl TaskDescriptor for LumaVideoReframeTask {
    fn descriptor() -> TaskMetadata {
        let mut inputs = vec![
            PortMetadata::required(Self::PORT_INPUT_VIDEO, "Input Video", PortDataType::Video)
                .with_tooltip("Video to reframe"),
            PortMetadata::optional(PORT_MODEL, "Model", PortDataType::String)
                .with_default(json!(DEFAULT_MODEL))
                .with_choices(MODELS),
            PortMetadata::optional(PORT_ASPECT_RATIO, "Aspect Ratio", PortDataType::String)
                .with_default(json!(DEFAULT_ASPECT_RATIO))
                .with_choices(ASPECT_RATIOS),
            PortMetadata::optional(PORT_PROMPT, "Prompt", PortDataType::Prompt).with_default(json!("")),
        ];
        inputs.extend(geometry_ports());

        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Processing,
            label: "Luma Video Reframe".to_string(),
            description: "Extends a video to a new aspect ratio with Luma Ray".to_string(),
            inputs,
            outputs: vec![
                PortMetadata::optional(Self::PORT_OUTPUT_VIDEO, "Output Video", PortDataType::Video),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaVideoReframeTask::descriptor));

impl DynamicPorts for LumaVideoReframeTask {}

#[async_trait]
impl Task for LumaVideoReframeTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::read(&context, &self.task_id, Self::descriptor()).await;

        let mut validation = Validation::new();
        let source = validation.require_media(&inputs, Self::PORT_INPUT_VIDEO);
        validation.check_choices(&inputs);
        let api_key = validation
            .finish(&self.services)
            .map_err(|e| rejected("LumaVideoReframeTask", &self.task_id, e))?;
        let Some(source) = source else {
            return Err(rejected(
                "LumaVideoReframeTask",
                &self.task_id,
                LumaError::MissingRequiredInput(Self::PORT_INPUT_VIDEO.to_string()),
            ));
        };

        let mut run = NodeRun::start("LumaVideoReframeTask", &self.task_id, &self.services, &context).await;
        let outcome = Self::JOB.run(&inputs, &source, &api_key, &mut run).await;
        run.finish(&context, outcome, "Reframe", Self::PORT_OUTPUT_VIDEO).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::ContextKeys;

    use crate::nodes::common::MediaArtifact;
    use crate::reference::MediaKind;
    use crate::test_support::{
        completed_video, generation, Harness, Poll, RecordingStorage, ScriptedApi, ScriptedFetcher,
        PUBLIC_BASE,
    };

    const LOCAL_SOURCE: &str = "http://127.0.0.1:8124/static/clip.webm";
    const RESULT_URL: &str = "https://cdn.lumalabs.ai/gen-1.mp4";

    #[test]
    fn test_descriptor_uses_ray_models() {
        let meta = LumaVideoReframeTask::descriptor();
        assert_eq!(meta.node_type, "luma-video-reframe");
        assert_eq!(meta.input("model").unwrap().choices, vec!["ray-2", "ray-flash-2"]);
        assert_eq!(meta.input("input_video").unwrap().data_type, PortDataType::Video);
        assert!(meta.output("output_video").is_some());
    }

    #[tokio::test]
    async fn test_local_source_is_rehosted_and_released() {
        let harness = Harness::new(
            ScriptedApi::with_polls(vec![
                Poll::Job(generation("gen-1", "queued")),
                Poll::Job(generation("gen-1", "dreaming")),
                Poll::Job(completed_video("gen-1", RESULT_URL)),
            ]),
            RecordingStorage::new(),
            ScriptedFetcher::new()
                .with(LOCAL_SOURCE, 200, b"webm")
                .with(RESULT_URL, 200, b"mp4"),
        );
        let task = LumaVideoReframeTask::new("vr", Arc::new(harness.services()));
        let context = Context::new();
        context
            .set(&ContextKeys::input("vr", "input_video"), json!({ "value": LOCAL_SOURCE, "name": "clip" }))
            .await;
        context.set(&ContextKeys::input("vr", "y_end"), 300).await;

        task.run(context.clone()).await.unwrap();

        let saved = harness.storage.saved();
        assert_eq!(saved.len(), 2);
        assert!(saved[0].filename.ends_with("_input_video.webm"));
        assert!(saved[1].filename.starts_with("luma_reframe_"));
        assert!(saved[1].filename.ends_with(".mp4"));

        let rehosted = format!("{}/{}", PUBLIC_BASE, saved[0].filename);
        let payload = harness.api.submitted()[0].payload().clone();
        assert_eq!(payload["media"], json!({ "url": rehosted.clone() }));
        assert_eq!(payload["generation_type"], json!("reframe_video"));
        assert_eq!(payload["model"], json!("ray-2"));
        assert_eq!(payload["y_end"], json!(300));
        assert_eq!(harness.storage.deleted(), vec![rehosted.clone()]);

        let artifact: MediaArtifact = context.get("vr.output.output_video").await.unwrap();
        assert_eq!(artifact.kind, MediaKind::Video);

        let status: String = context.get("vr.output.status").await.unwrap();
        assert!(status.starts_with(&format!("Using input video: {}\n", rehosted)));
        assert!(status.contains("Attempt 1: queued\nAttempt 2: dreaming\nAttempt 3: Completed!\n"));
        assert!(status.contains("Downloading reframed video...\n"));
    }

    #[tokio::test]
    async fn test_timeout_reports_attempt_budget() {
        let harness = Harness::new(ScriptedApi::new(), RecordingStorage::new(), ScriptedFetcher::new());
        let task = LumaVideoReframeTask::new("vr", Arc::new(harness.services()));
        let context = Context::new();
        context
            .set(&ContextKeys::input("vr", "input_video"), "https://cdn.example.com/clip.mp4")
            .await;

        let err = task.run(context.clone()).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 5 attempts"));
        assert_eq!(harness.api.poll_count(), 5);

        let status: String = context.get("vr.output.status").await.unwrap();
        assert!(status.ends_with("❌ Reframe failed: Reframe timed out after 5 attempts\n"));
        assert!(harness.storage.saved().is_empty());
    }
}
