//! List Camera Motions Task
//!
//! Fetches the camera motion phrases the video models understand. No inputs
//! and no polling.

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    write_output, DynamicPorts, ExecutionMode, NodeCategory, PortDataType, PortMetadata,
    TaskDescriptor, TaskMetadata,
};

use super::common::{rejected, status_log, Validation, PORT_STATUS};
use crate::error::LumaError;
use crate::services::LumaServices;

#[derive(Clone)]
pub struct LumaListCameraMotionsTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaListCameraMotionsTask {
    pub const NODE_TYPE: &'static str = "luma-list-camera-motions";

    pub const PORT_CAMERA_MOTIONS: &'static str = "camera_motions";

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }
}

impl TaskDescriptor for LumaListCameraMotionsTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Utility,
            label: "Luma Camera Motions".to_string(),
            description: "Lists the camera motion phrases supported in Luma video prompts".to_string(),
            inputs: vec![],
            outputs: vec![
                PortMetadata::optional(Self::PORT_CAMERA_MOTIONS, "Camera Motions", PortDataType::List),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Manual,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaListCameraMotionsTask::descriptor));

impl DynamicPorts for LumaListCameraMotionsTask {}

#[async_trait]
impl Task for LumaListCameraMotionsTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let api_key = Validation::new()
            .finish(&self.services)
            .map_err(|e| rejected("LumaListCameraMotionsTask", &self.task_id, e))?;

        let mut log = status_log(&self.task_id, &self.services, &context).await;
        log.push("Fetching supported camera motions...");

        let fetched = match self.services.connector.connect(&api_key) {
            Ok(api) => api.list_camera_motions().await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(motions) => {
                log.push(format!(
                    "✅ Successfully retrieved {} camera motion(s):",
                    motions.len()
                ));
                for motion in &motions {
                    log.push(format!("  - {}", motion));
                }
                log.push("");
                log.push("Note: These camera motion strings can be used in prompts.");
                log.push("Syntactically similar phrases also work, though there can be mismatches sometimes.");

                log::info!(
                    "LumaListCameraMotionsTask {}: {} camera motions",
                    self.task_id,
                    motions.len()
                );
                let summary = format!("{} camera motion(s)", motions.len());
                write_output(&context, &self.task_id, Self::PORT_CAMERA_MOTIONS, &motions).await;
                write_output(&context, &self.task_id, PORT_STATUS, log.text()).await;
                Ok(TaskResult::new(Some(summary), NextAction::Continue))
            }
            Err(e) => {
                match &e {
                    LumaError::Api { status, body } => {
                        log.push(format!("❌ HTTP error {}: {}", status, body))
                    }
                    _ => log.push(format!("❌ Failed to fetch camera motions: {}", e)),
                }
                write_output(&context, &self.task_id, PORT_STATUS, log.text()).await;

                log::warn!("LumaListCameraMotionsTask {}: {}", self.task_id, e);
                Err(e.into_graph_error())
            }
        }
    }
}
