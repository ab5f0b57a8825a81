//! Photon Image Generation Task
//!
//! Text-to-image with an optional reference image. The reference can steer
//! content, style, a character's identity, or be the image to modify.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task, TaskResult};
use node_engine::{
    default_visible, string_value, DynamicPorts, ExecutionMode, NodeCategory, PortDataType,
    PortMetadata, PortValues, TaskDescriptor, TaskMetadata,
};
use serde_json::json;

use super::common::{number_of, rejected, NodeInputs, NodeRun, Published, Validation, PORT_STATUS};
use crate::error::Result;
use crate::payload::image::{
    ImageGenerationParams, ImageReference, ReferenceMode, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO,
    DEFAULT_MODEL, MODELS,
};
use crate::reference::{MediaKind, MediaReference};
use crate::services::LumaServices;

/// Luma Photon image generation
///
/// # Inputs (from context)
/// - `{task_id}.input.prompt` - Description of the image (required)
/// - `{task_id}.input.model` - `photon-1` or `photon-flash-1`
/// - `{task_id}.input.aspect_ratio`
/// - `{task_id}.input.reference_type` - none / image / style / character / modify
/// - `{task_id}.input.reference_image` - Reference image (optional)
/// - `{task_id}.input.reference_weight` - 0.0 to 1.0, unused for character references
///
/// # Outputs (to context)
/// - `{task_id}.output.image` - Published `MediaArtifact`
/// - `{task_id}.output.status` - Progress log
#[derive(Clone)]
pub struct LumaImageGenerationTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaImageGenerationTask {
    pub const NODE_TYPE: &'static str = "luma-image-generation";

    pub const PORT_PROMPT: &'static str = "prompt";
    pub const PORT_MODEL: &'static str = "model";
    pub const PORT_ASPECT_RATIO: &'static str = "aspect_ratio";
    pub const PORT_REFERENCE_TYPE: &'static str = "reference_type";
    pub const PORT_REFERENCE_IMAGE: &'static str = "reference_image";
    pub const PORT_REFERENCE_WEIGHT: &'static str = "reference_weight";
    pub const PORT_IMAGE: &'static str = "image";

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    fn reference_mode(inputs: &NodeInputs) -> ReferenceMode {
        ReferenceMode::parse(&inputs.text(Self::PORT_REFERENCE_TYPE)).unwrap_or_default()
    }

    /// Weight set on the node, or the selected mode's default
    fn reference_weight(inputs: &NodeInputs, mode: ReferenceMode) -> f64 {
        inputs
            .explicit(Self::PORT_REFERENCE_WEIGHT)
            .and_then(number_of)
            .or_else(|| mode.default_weight())
            .or_else(|| inputs.number(Self::PORT_REFERENCE_WEIGHT))
            .unwrap_or(0.85)
    }

    async fn generate(
        &self,
        inputs: &NodeInputs,
        reference: Option<MediaReference>,
        api_key: &str,
        run: &mut NodeRun,
    ) -> Result<Published> {
        let api = run.connect(api_key)?;
        run.log.push("Creating generation request...");

        let mode = Self::reference_mode(inputs);
        let reference = match reference {
            Some(reference) if mode.uses_image() => {
                let url = run
                    .resolve(Some(&reference), Self::PORT_REFERENCE_IMAGE, MediaKind::Image)
                    .await?;
                ImageReference::new(mode, url, Self::reference_weight(inputs, mode))
            }
            _ => None,
        };
        if let Some(reference) = &reference {
            run.log.push(reference.describe());
        }

        let params = ImageGenerationParams {
            prompt: inputs.text(Self::PORT_PROMPT),
            model: inputs.text(Self::PORT_MODEL),
            aspect_ratio: inputs.text(Self::PORT_ASPECT_RATIO),
            reference,
        };
        log::debug!(
            "LumaImageGenerationTask {}: model '{}', reference mode '{}'",
            self.task_id,
            params.model,
            mode.as_str()
        );

        let poll = run.config().polling.image;
        let image_url = run
            .poller(api, poll, "generation")
            .submit_and_wait(&params.to_request(), &mut run.log)
            .await?;

        run.log.push("Downloading generated image...");
        run.publish(&image_url, MediaKind::Image, "luma_photon", "jpg").await
    }
}

impl TaskDescriptor for LumaImageGenerationTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Processing,
            label: "Luma Image Generation".to_string(),
            description: "Generates an image with Luma Photon, optionally guided by a reference image"
                .to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_PROMPT, "Prompt", PortDataType::Prompt)
                    .with_tooltip("Text description of the desired image"),
                PortMetadata::optional(Self::PORT_MODEL, "Model", PortDataType::String)
                    .with_default(json!(DEFAULT_MODEL))
                    .with_choices(MODELS)
                    .with_tooltip("Photon model to use. photon-1 is default, photon-flash-1 is faster."),
                PortMetadata::optional(Self::PORT_ASPECT_RATIO, "Aspect Ratio", PortDataType::String)
                    .with_default(json!(DEFAULT_ASPECT_RATIO))
                    .with_choices(ASPECT_RATIOS),
                PortMetadata::optional(Self::PORT_REFERENCE_TYPE, "Reference Type", PortDataType::String)
                    .with_default(json!(ReferenceMode::None.as_str()))
                    .with_choices(&ReferenceMode::choices())
                    .with_tooltip("Type of reference image to use for generation"),
                PortMetadata::optional(Self::PORT_REFERENCE_IMAGE, "Reference Image", PortDataType::Image)
                    .hidden()
                    .with_tooltip("Reference image, used as selected by Reference Type"),
                PortMetadata::optional(Self::PORT_REFERENCE_WEIGHT, "Reference Weight", PortDataType::Number)
                    .with_default(json!(0.85))
                    .hidden()
                    .with_tooltip("Influence of the reference image (0.0-1.0). Not used for character reference."),
            ],
            outputs: vec![
                PortMetadata::optional(Self::PORT_IMAGE, "Image", PortDataType::Image),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaImageGenerationTask::descriptor));

impl DynamicPorts for LumaImageGenerationTask {
    fn visible_inputs(values: &PortValues) -> BTreeSet<String> {
        let metadata = Self::descriptor();
        let mode = string_value(values, &metadata, Self::PORT_REFERENCE_TYPE)
            .and_then(ReferenceMode::parse)
            .unwrap_or_default();

        let mut visible = default_visible(&metadata);
        if mode.uses_image() {
            visible.insert(Self::PORT_REFERENCE_IMAGE.to_string());
        }
        if mode.uses_weight() {
            visible.insert(Self::PORT_REFERENCE_WEIGHT.to_string());
        }
        visible
    }

    fn derived_values(changed_port: &str, values: &PortValues) -> PortValues {
        let mut derived = PortValues::new();
        if changed_port != Self::PORT_REFERENCE_TYPE {
            return derived;
        }

        let weight = values
            .get(Self::PORT_REFERENCE_TYPE)
            .and_then(|v| v.as_str())
            .and_then(ReferenceMode::parse)
            .and_then(|mode| mode.default_weight());
        if let Some(weight) = weight {
            derived.insert(Self::PORT_REFERENCE_WEIGHT.to_string(), json!(weight));
        }
        derived
    }
}

#[async_trait]
impl Task for LumaImageGenerationTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::read(&context, &self.task_id, Self::descriptor()).await;

        let mut validation = Validation::new();
        validation.require_text(&inputs, Self::PORT_PROMPT);
        validation.check_choices(&inputs);
        let reference = validation.optional_media(&inputs, Self::PORT_REFERENCE_IMAGE);
        let api_key = validation
            .finish(&self.services)
            .map_err(|e| rejected("LumaImageGenerationTask", &self.task_id, e))?;

        let mut run = NodeRun::start("LumaImageGenerationTask", &self.task_id, &self.services, &context).await;
        let outcome = self.generate(&inputs, reference, &api_key, &mut run).await;
        run.finish(&context, outcome, "Generation", Self::PORT_IMAGE).await
    }
}
