//! Photon Image Reframe Task
//!
//! Outpaints an existing image to a new aspect ratio.

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
use crate::payload::image::{DEFAULT_MODEL, MODELS};
use crate::payload::reframe::{ReframeTarget, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO};
use crate::services::LumaServices;

/// Luma Photon image reframe
///
/// # Inputs (from context)
/// - `{task_id}.input.input_image` - Image to reframe (required)
/// - `{task_id}.input.model`, `aspect_ratio`, `prompt`
/// - `{task_id}.input.{grid_position_x..resized_height}` - Optional placement
///
/// # Outputs (to context)
/// - `{task_id}.output.output_image`
/// - `{task_id}.output.status`
#[derive(Clone)]
pub struct LumaImageReframeTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaImageReframeTask {
    pub const NODE_TYPE: &'static str = "luma-image-reframe";

    pub const PORT_INPUT_IMAGE: &'static str = "input_image";
    pub const PORT_OUTPUT_IMAGE: &'static str = "output_image";

    const JOB: ReframeJob = ReframeJob {
        target: ReframeTarget::Image,
        input_port: Self::PORT_INPUT_IMAGE,
        media_label: "image",
    };

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }
}

impl TaskDescriptor for LumaImageReframeTask {
    fn descriptor() -> TaskMetadata {
        let mut inputs = vec![
            PortMetadata::required(Self::PORT_INPUT_IMAGE, "Input Image", PortDataType::Image)
                .with_tooltip("Image to reframe"),
            PortMetadata::optional(PORT_MODEL, "Model", PortDataType::String)
                .with_default(json!(DEFAULT_MODEL))
                .with_choices(MODELS),
            PortMetadata::optional(PORT_ASPECT_RATIO, "Aspect Ratio", PortDataType::String)
                .with_default(json!(DEFAULT_ASPECT_RATIO))
                .with_choices(ASPECT_RATIOS)
                .with_tooltip("Target aspect ratio"),
            PortMetadata::optional(PORT_PROMPT, "Prompt", PortDataType::Prompt)
                .with_default(json!(""))
                .with_tooltip("Optional guidance for the newly generated areas"),
        ];
        inputs.extend(geometry_ports());

        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Processing,
            label: "Luma Image Reframe".to_string(),
            description: "Extends an image to a new aspect ratio with Luma Photon".to_string(),
            inputs,
            outputs: vec![
                PortMetadata::optional(Self::PORT_OUTPUT_IMAGE, "Output Image", PortDataType::Image),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaImageReframeTask::descriptor));

impl DynamicPorts for LumaImageReframeTask {}

#[async_trait]
impl Task for LumaImageReframeTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::read(&context, &self.task_id, Self::descriptor()).await;

        let mut validation = Validation::new();
        let source = validation.require_media(&inputs, Self::PORT_INPUT_IMAGE);
        validation.check_choices(&inputs);
        let api_key = validation
            .finish(&self.services)
            .map_err(|e| rejected("LumaImageReframeTask", &self.task_id, e))?;
        let Some(source) = source else {
            return Err(rejected(
                "LumaImageReframeTask",
                &self.task_id,
                LumaError::MissingRequiredInput(Self::PORT_INPUT_IMAGE.to_string()),
            ));
        };

        let mut run = NodeRun::start("LumaImageReframeTask", &self.task_id, &self.services, &context).await;
        let outcome = Self::JOB.run(&inputs, &source, &api_key, &mut run).await;
        run.finish(&context, outcome, "Reframe", Self::PORT_OUTPUT_IMAGE).await
    }
}
