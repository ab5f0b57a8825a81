//! Pieces shared by the image and video reframe tasks.

use node_engine::{PortDataType, PortMetadata};
use serde_json::{json, Value};

use super::common::{NodeInputs, NodeRun, Published};
use crate::error::Result;
use crate::payload::non_blank;
use crate::payload::reframe::{ReframeGeometry, ReframeParams, ReframeTarget, GEOMETRY_FIELDS};
use crate::reference::{MediaKind, MediaReference};

pub const PORT_MODEL: &str = "model";
pub const PORT_ASPECT_RATIO: &str = "aspect_ratio";
pub const PORT_PROMPT: &str = "prompt";

fn geometry_label(field: &str) -> &'static str {
    match field {
        "grid_position_x" => "Grid Position X",
        "grid_position_y" => "Grid Position Y",
        "x_start" => "X Start",
        "x_end" => "X End",
        "y_start" => "Y Start",
        "y_end" => "Y End",
        "resized_width" => "Resized Width",
        _ => "Resized Height",
    }
}

/// One Number port per geometry field, defaulting to 0 (unset)
pub fn geometry_ports() -> Vec<PortMetadata> {
    GEOMETRY_FIELDS
        .iter()
        .map(|field| {
            PortMetadata::optional(*field, geometry_label(field), PortDataType::Number)
                .with_default(json!(0))
                .with_tooltip("Pixels. 0 leaves placement to the service.")
        })
        .collect()
}

pub fn geometry(inputs: &NodeInputs) -> ReframeGeometry {
    ReframeGeometry::from_fields(|field| inputs.integer(field))
}

/// What differs between the two reframe tasks
pub struct ReframeJob {
    pub target: ReframeTarget,
    pub input_port: &'static str,
    pub media_label: &'static str,
}

impl ReframeJob {
    fn kind(&self) -> MediaKind {
        match self.target {
            ReframeTarget::Image => MediaKind::Image,
            ReframeTarget::Video => MediaKind::Video,
        }
    }

    /// Resolve the source, submit the reframe and publish the result
    pub async fn run(
        &self,
        inputs: &NodeInputs,
        source: &MediaReference,
        api_key: &str,
        run: &mut NodeRun,
    ) -> Result<Published> {
        let api = run.connect(api_key)?;
        let kind = self.kind();

        let media_url = run.resolve(Some(source), self.input_port, kind).await?;
        run.log.push(format!("Using input {}: {}", self.media_label, media_url));
        run.log.push("Creating reframe request...");

        let params = ReframeParams {
            target: self.target,
            media_url,
            model: inputs.text(PORT_MODEL),
            aspect_ratio: inputs.text(PORT_ASPECT_RATIO),
            prompt: inputs.text(PORT_PROMPT),
            geometry: geometry(inputs),
        };

        if let Some(prompt) = non_blank(&params.prompt) {
            run.log.push(format!("Using prompt: {}", prompt));
        }
        if !params.geometry.is_empty() {
            run.log.push(format!(
                "Using advanced parameters: {}",
                Value::Object(params.geometry.to_map())
            ));
        }

        let (poll, extension) = match self.target {
            ReframeTarget::Image => (run.config().polling.image, "jpg"),
            ReframeTarget::Video => (run.config().polling.video_edit, "mp4"),
        };
        let asset_url = run
            .poller(api, poll, "reframe")
            .submit_and_wait(&params.to_request(), &mut run.log)
            .await?;

        run.log.push(format!("Downloading reframed {}...", self.media_label));
        run.publish(&asset_url, kind, "luma_reframe", extension).await
    }
}
