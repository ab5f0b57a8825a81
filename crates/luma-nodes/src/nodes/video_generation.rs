//! Ray Video Generation Task
//!
//! Text-to-video, optionally anchored by start and end keyframes.
//! `ray-1-6` has its own aspect ratio list and no resolution/duration
//! controls, so the visible ports follow the selected model.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task, TaskResult};
use node_engine::{
    default_visible, string_value, DynamicPorts, ExecutionMode, NodeCategory, PortDataType,
    PortMetadata, PortValues, TaskDescriptor, TaskMetadata,
};
use serde_json::json;

use super::common::{rejected, NodeInputs, NodeRun, Published, Validation, PORT_STATUS};
use crate::error::Result;
use crate::payload::non_blank;
use crate::payload::video::{
    VideoGenerationParams, VideoModel, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, DEFAULT_DURATION,
    DEFAULT_MODEL, DEFAULT_RESOLUTION, DURATIONS, MODELS, PORT_ASPECT_RATIO,
    PORT_ASPECT_RATIO_RAY16, RAY16_ASPECT_RATIOS, RESOLUTIONS,
};
use crate::reference::{MediaKind, MediaReference};
use crate::services::LumaServices;

/// Keyframe references picked up during validation
#[derive(Default)]
struct Keyframes {
    start: Option<MediaReference>,
    end: Option<MediaReference>,
}

/// Luma Ray video generation
///
/// # Inputs (from context)
/// - `{task_id}.input.prompt` - Description of the video (required)
/// - `{task_id}.input.model` - `ray-2`, `ray-flash-2` or `ray-1-6`
/// - `{task_id}.input.aspect_ratio` / `aspect_ratio_ray16` - Read per model
/// - `{task_id}.input.resolution`, `duration` - Ray 2 models only
/// - `{task_id}.input.start_frame`, `end_frame` - Optional keyframes
/// - `{task_id}.input.loop` - Seamless loop
///
/// # Outputs (to context)
/// - `{task_id}.output.video` - Published `MediaArtifact`
/// - `{task_id}.output.status` - Progress log
#[derive(Clone)]
pub struct LumaVideoGenerationTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaVideoGenerationTask {
    pub const NODE_TYPE: &'static str = "luma-video-generation";

    pub const PORT_PROMPT: &'static str = "prompt";
    pub const PORT_MODEL: &'static str = "model";
    pub const PORT_ASPECT_RATIO: &'static str = PORT_ASPECT_RATIO;
    pub const PORT_ASPECT_RATIO_RAY16: &'static str = PORT_ASPECT_RATIO_RAY16;
    pub const PORT_RESOLUTION: &'static str = "resolution";
    pub const PORT_DURATION: &'static str = "duration";
    pub const PORT_START_FRAME: &'static str = "start_frame";
    pub const PORT_END_FRAME: &'static str = "end_frame";
    pub const PORT_LOOP: &'static str = "loop";
    pub const PORT_VIDEO: &'static str = "video";

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }

    async fn generate(
        &self,
        inputs: &NodeInputs,
        keyframes: Keyframes,
        api_key: &str,
        run: &mut NodeRun,
    ) -> Result<Published> {
        let api = run.connect(api_key)?;
        let model = VideoModel::parse(&inputs.text(Self::PORT_MODEL)).unwrap_or_default();
        let looping = inputs.flag(Self::PORT_LOOP);

        run.log.push("Creating generation request...");
        if looping {
            run.log.push("Loop mode enabled");
        }

        let mut start_frame = None;
        if let Some(frame) = &keyframes.start {
            let url = run.resolve(Some(frame), Self::PORT_START_FRAME, MediaKind::Image).await?;
            run.log.push(format!("Using start frame: {}", url));
            start_frame = Some(url);
        }
        let mut end_frame = None;
        if let Some(frame) = &keyframes.end {
            let url = run.resolve(Some(frame), Self::PORT_END_FRAME, MediaKind::Image).await?;
            run.log.push(format!("Using end frame: {}", url));
            end_frame = Some(url);
        }

        let aspect_ratio = inputs.text(model.aspect_ratio_port());
        let params = VideoGenerationParams {
            prompt: inputs.text(Self::PORT_PROMPT),
            model,
            aspect_ratio: non_blank(&aspect_ratio).map(str::to_string),
            resolution: inputs.text(Self::PORT_RESOLUTION),
            duration: inputs.text(Self::PORT_DURATION),
            looping,
            start_frame,
            end_frame,
        };
        log::debug!(
            "LumaVideoGenerationTask {}: model '{}', aspect ratio {:?}",
            self.task_id,
            model.as_str(),
            params.aspect_ratio
        );

        let poll = run.config().polling.video_generation;
        let video_url = run
            .poller(api, poll, "generation")
            .submit_and_wait(&params.to_request(), &mut run.log)
            .await?;

        run.log.push("Downloading generated video...");
        run.publish(&video_url, MediaKind::Video, "luma_ray2", "mp4").await
    }
}

impl TaskDescriptor for LumaVideoGenerationTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Processing,
            label: "Luma Video Generation".to_string(),
            description: "Generates a video with Luma Ray from a prompt and optional keyframes"
                .to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_PROMPT, "Prompt", PortDataType::Prompt)
                    .with_tooltip("Text description of the desired video"),
                PortMetadata::optional(Self::PORT_MODEL, "Model", PortDataType::String)
                    .with_default(json!(DEFAULT_MODEL))
                    .with_choices(MODELS)
                    .with_tooltip("ray-2 is default, ray-flash-2 is faster, ray-1-6 is the previous generation"),
                PortMetadata::optional(Self::PORT_ASPECT_RATIO_RAY16, "Aspect Ratio", PortDataType::String)
                    .with_default(json!(DEFAULT_ASPECT_RATIO))
                    .with_choices(RAY16_ASPECT_RATIOS)
                    .hidden(),
                PortMetadata::optional(Self::PORT_ASPECT_RATIO, "Aspect Ratio", PortDataType::String)
                    .with_default(json!(DEFAULT_ASPECT_RATIO))
                    .with_choices(ASPECT_RATIOS),
                PortMetadata::optional(Self::PORT_RESOLUTION, "Resolution", PortDataType::String)
                    .with_default(json!(DEFAULT_RESOLUTION))
                    .with_choices(RESOLUTIONS),
                PortMetadata::optional(Self::PORT_DURATION, "Duration", PortDataType::String)
                    .with_default(json!(DEFAULT_DURATION))
                    .with_choices(DURATIONS),
                PortMetadata::optional(Self::PORT_START_FRAME, "Start Frame", PortDataType::Image)
                    .with_tooltip("Optional image the video starts from"),
                PortMetadata::optional(Self::PORT_END_FRAME, "End Frame", PortDataType::Image)
                    .with_tooltip("Optional image the video ends on"),
                PortMetadata::optional(Self::PORT_LOOP, "Loop", PortDataType::Boolean)
                    .with_default(json!(false))
                    .with_tooltip("Create a seamless loop"),
            ],
            outputs: vec![
                PortMetadata::optional(Self::PORT_VIDEO, "Video", PortDataType::Video),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaVideoGenerationTask::descriptor));

impl DynamicPorts for LumaVideoGenerationTask {
    fn visible_inputs(values: &PortValues) -> BTreeSet<String> {
        let metadata = Self::descriptor();
        let model = string_value(values, &metadata, Self::PORT_MODEL)
            .and_then(VideoModel::parse)
            .unwrap_or_default();

        let mut visible = default_visible(&metadata);
        if !model.supports_resolution_and_duration() {
            visible.remove(Self::PORT_ASPECT_RATIO);
            visible.remove(Self::PORT_RESOLUTION);
            visible.remove(Self::PORT_DURATION);
            visible.insert(Self::PORT_ASPECT_RATIO_RAY16.to_string());
        }
        visible
    }
}

#[async_trait]
impl Task for LumaVideoGenerationTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::read(&context, &self.task_id, Self::descriptor()).await;

        let mut validation = Validation::new();
        validation.require_text(&inputs, Self::PORT_PROMPT);
        validation.check_choices(&inputs);
        let keyframes = Keyframes {
            start: validation.optional_media(&inputs, Self::PORT_START_FRAME),
            end: validation.optional_media(&inputs, Self::PORT_END_FRAME),
        };
        let api_key = validation
            .finish(&self.services)
            .map_err(|e| rejected("LumaVideoGenerationTask", &self.task_id, e))?;

        let mut run = NodeRun::start("LumaVideoGenerationTask", &self.task_id, &self.services, &context).await;
        let outcome = self.generate(&inputs, keyframes, &api_key, &mut run).await;
        run.finish(&context, outcome, "Generation", Self::PORT_VIDEO).await
    }
}
