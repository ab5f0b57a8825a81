//! Ray Video Modify Task
//!
//! Restyles an existing video from a prompt. The mode controls how far the
//! result may depart from the source.

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task, TaskResult};
use node_engine::{
    DynamicPorts, ExecutionMode, NodeCategory, PortDataType, PortMetadata, TaskDescriptor,
    TaskMetadata,
};
use serde_json::json;

use super::common::{rejected, NodeInputs, NodeRun, Published, Validation, PORT_STATUS};
use crate::error::{LumaError, Result};
use crate::payload::modify::{VideoModifyParams, DEFAULT_MODE, DEFAULT_MODEL, MODELS, MODES};
use crate::reference::{MediaKind, MediaReference};
use crate::services::LumaServices;

/// Luma Ray video modification
///
/// # Inputs (from context)
/// - `{task_id}.input.input_video` - Video to modify (required)
/// - `{task_id}.input.prompt` - Desired change (required)
/// - `{task_id}.input.model`, `mode`
/// - `{task_id}.input.first_frame` - Optional modified first frame
///
/// # Outputs (to context)
/// - `{task_id}.output.output_video`
/// - `{task_id}.output.status`
#[derive(Clone)]
pub struct LumaVideoModifyTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaVideoModifyTask {
    pub const NODE_TYPE: &'static str = "luma-video-modify";

    pub const PORT_INPUT_VIDEO: &'static str = "input_video";
    pub const PORT_PROMPT: &'static str = "prompt";
    pub const PORT_MODEL: &'static str = "model";
    pub const PORT_MODE: &'static str = "mode";
    pub const PORT_FIRST_FRAME: &'static str = "first_frame";
    pub const PORT_OUTPUT_VIDEO: &'static str = "output_video";

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }

    async fn modify(
        &self,
        inputs: &NodeInputs,
        source: &MediaReference,
        first_frame: Option<MediaReference>,
        api_key: &str,
        run: &mut NodeRun,
    ) -> Result<Published> {
        let api = run.connect(api_key)?;

        let media_url = run.resolve(Some(source), Self::PORT_INPUT_VIDEO, MediaKind::Video).await?;
        run.log.push(format!("Using input video: {}", media_url));
        run.log.push("Creating modification request...");

        let mut params = VideoModifyParams {
            media_url,
            prompt: inputs.text(Self::PORT_PROMPT),
            model: inputs.text(Self::PORT_MODEL),
            mode: inputs.text(Self::PORT_MODE),
            first_frame: None,
        };
        run.log.push(format!("Using prompt: {}", params.prompt.trim()));
        run.log.push(format!("Using mode: {}", params.mode));

        if let Some(frame) = &first_frame {
            let url = run.resolve(Some(frame), Self::PORT_FIRST_FRAME, MediaKind::Image).await?;
            run.log.push(format!("Using first frame: {}", url));
            params.first_frame = Some(url);
        }

        let poll = run.config().polling.video_edit;
        let video_url = run
            .poller(api, poll, "modification")
            .submit_and_wait(&params.to_request(), &mut run.log)
            .await?;

        run.log.push("Downloading modified video...");
        run.publish(&video_url, MediaKind::Video, "luma_modify", "mp4").await
    }
}

impl TaskDescriptor for LumaVideoModifyTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Processing,
            label: "Luma Video Modify".to_string(),
            description: "Modifies an existing video with Luma Ray".to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_INPUT_VIDEO, "Input Video", PortDataType::Video),
                PortMetadata::required(Self::PORT_PROMPT, "Prompt", PortDataType::Prompt)
                    .with_tooltip("How the video should change"),
                PortMetadata::optional(Self::PORT_MODEL, "Model", PortDataType::String)
                    .with_default(json!(DEFAULT_MODEL))
                    .with_choices(MODELS),
                PortMetadata::optional(Self::PORT_MODE, "Mode", PortDataType::String)
                    .with_default(json!(DEFAULT_MODE))
                    .with_choices(MODES)
                    .with_tooltip("adhere stays close to the source, flex balances, reimagine departs furthest"),
                PortMetadata::optional(Self::PORT_FIRST_FRAME, "First Frame", PortDataType::Image)
                    .with_tooltip("Optional modified first frame to guide the result"),
            ],
            outputs: vec![
                PortMetadata::optional(Self::PORT_OUTPUT_VIDEO, "Output Video", PortDataType::Video),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaVideoModifyTask::descriptor));

impl DynamicPorts for LumaVideoModifyTask {}

#[async_trait]
impl Task for LumaVideoModifyTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::read(&context, &self.task_id, Self::descriptor()).await;

        let mut validation = Validation::new();
        let source = validation.require_media(&inputs, Self::PORT_INPUT_VIDEO);
        validation.require_text(&inputs, Self::PORT_PROMPT);
        validation.check_choices(&inputs);
        let first_frame = validation.optional_media(&inputs, Self::PORT_FIRST_FRAME);
        let api_key = validation
            .finish(&self.services)
            .map_err(|e| rejected("LumaVideoModifyTask", &self.task_id, e))?;
        let Some(source) = source else {
            return Err(rejected(
                "LumaVideoModifyTask",
                &self.task_id,
                LumaError::MissingRequiredInput(Self::PORT_INPUT_VIDEO.to_string()),
            ));
        };

        let mut run = NodeRun::start("LumaVideoModifyTask", &self.task_id, &self.services, &context).await;
        let outcome = self.modify(&inputs, &source, first_frame, &api_key, &mut run).await;
        run.finish(&context, outcome, "Modification", Self::PORT_OUTPUT_VIDEO).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::ContextKeys;

    use crate::nodes::common::MediaArtifact;
    use crate::test_support::{
        completed_video, Harness, Poll, RecordingStorage, ScriptedApi, ScriptedFetcher,
    };

    const SOURCE_URL: &str = "https://cdn.example.com/street.mp4";
    const RESULT_URL: &str = "https://cdn.lumalabs.ai/gen-1.mp4";

    fn harness(polls: Vec<Poll>) -> Harness {
        Harness::new(
            ScriptedApi::with_polls(polls),
            RecordingStorage::new(),
            ScriptedFetcher::new().with(RESULT_URL, 200, b"mp4"),
        )
    }

    async fn context_with(pairs: &[(&str, serde_json::Value)]) -> Context {
        let context = Context::new();
        for (port, value) in pairs {
            context.set(&ContextKeys::input("mod", port), value.clone()).await;
        }
        context
    }

    #[tokio::test]
    async fn test_modify_run() {
        let harness = harness(vec![Poll::Job(completed_video("gen-1", RESULT_URL))]);
        let task = LumaVideoModifyTask::new("mod", Arc::new(harness.services()));
        let context = context_with(&[
            ("input_video", json!({ "url": SOURCE_URL })),
            ("prompt", json!(" make it snow ")),
            ("mode", json!("adhere_2")),
            ("first_frame", json!("https://cdn.example.com/frame.jpg")),
        ])
        .await;

        task.run(context.clone()).await.unwrap();

        assert_eq!(
            serde_json::Value::Object(harness.api.submitted()[0].payload().clone()),
            json!({
                "media": { "url": SOURCE_URL },
                "model": "ray-2",
                "mode": "adhere_2",
                "generation_type": "modify_video",
                "prompt": "make it snow",
                "first_frame": { "url": "https://cdn.example.com/frame.jpg" }
            })
        );

        let artifact: MediaArtifact = context.get("mod.output.output_video").await.unwrap();
        assert!(artifact.name.starts_with("luma_modify_"));

        let status: String = context.get("mod.output.status").await.unwrap();
        assert!(status.starts_with(&format!(
            "Using input video: {}\nCreating modification request...\nUsing prompt: make it snow\nUsing mode: adhere_2\nUsing first frame: https://cdn.example.com/frame.jpg\n",
            SOURCE_URL
        )));
        assert!(status.contains("Waiting for modification to complete...\n"));
        assert!(status.contains("✅ Modification completed successfully!\n"));
    }

    #[tokio::test]
    async fn test_missing_inputs_reported_in_order() {
        let harness = harness(vec![]);
        let task = LumaVideoModifyTask::new("mod", Arc::new(harness.services_without_key()));
        let context = context_with(&[]).await;

        let message = task.run(context).await.unwrap_err().to_string();
        let video = message.find("input_video").unwrap();
        let prompt = message.find("Missing required input: prompt").unwrap();
        let key = message.find("LUMAAI_API_KEY").unwrap();
        assert!(video < prompt && prompt < key);
    }

    #[tokio::test]
    async fn test_api_error_while_polling_is_fatal() {
        let harness = harness(vec![Poll::Error(503)]);
        let task = LumaVideoModifyTask::new("mod", Arc::new(harness.services()));
        let context = context_with(&[("input_video", json!(SOURCE_URL)), ("prompt", json!("dusk"))]).await;

        let err = task.run(context.clone()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(harness.api.poll_count(), 1);

        let status: String = context.get("mod.output.status").await.unwrap();
        assert!(status.ends_with("❌ Modification failed: Luma API error (503): upstream unavailable\n"));
    }
}
