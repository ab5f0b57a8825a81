//! List Concepts Task

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    write_output, DynamicPorts, ExecutionMode, NodeCategory, PortDataType, PortMetadata,
    TaskDescriptor, TaskMetadata,
};

use super::common::{rejected, status_log, Validation, PORT_STATUS};
use crate::services::LumaServices;

/// Fetches the named visual concepts that can be applied to generations
#[derive(Clone)]
pub struct LumaListConceptsTask {
    task_id: String,
    services: Arc<LumaServices>,
}

impl LumaListConceptsTask {
    pub const NODE_TYPE: &'static str = "luma-list-concepts";

    pub const PORT_CONCEPTS: &'static str = "concepts";

    pub fn new(task_id: impl Into<String>, services: Arc<LumaServices>) -> Self {
        Self {
            task_id: task_id.into(),
            services,
        }
    }
}

impl TaskDescriptor for LumaListConceptsTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: Self::NODE_TYPE.to_string(),
            category: NodeCategory::Utility,
            label: "Luma Concepts".to_string(),
            description: "Lists the concepts available for Luma generations".to_string(),
            inputs: vec![],
            outputs: vec![
                PortMetadata::optional(Self::PORT_CONCEPTS, "Concepts", PortDataType::List),
                PortMetadata::optional(PORT_STATUS, "Status", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Manual,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LumaListConceptsTask::descriptor));

impl DynamicPorts for LumaListConceptsTask {}

#[async_trait]
impl Task for LumaListConceptsTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let api_key = Validation::new()
            .finish(&self.services)
            .map_err(|e| rejected("LumaListConceptsTask", &self.task_id, e))?;

        let mut log = status_log(&self.task_id, &self.services, &context).await;
        log.push("Fetching available concepts...");

        let fetched = match self.services.connector.connect(&api_key) {
            Ok(api) => api.list_concepts().await,
            Err(e) => Err(e),
        };

        let concepts = match fetched {
            Ok(concepts) => concepts,
            Err(e) => {
                log.push(format!("❌ Failed to fetch concepts: {}", e));
                write_output(&context, &self.task_id, PORT_STATUS, log.text()).await;
                log::warn!("LumaListConceptsTask {}: {}", self.task_id, e);
                return Err(e.into_graph_error());
            }
        };

        log.push(format!("✅ Successfully retrieved {} concept(s):", concepts.len()));
        for concept in &concepts {
            log.push(format!("  - {}", concept));
        }

        log::info!("LumaListConceptsTask {}: {} concepts", self.task_id, concepts.len());
        let summary = format!("{} concept(s)", concepts.len());
        write_output(&context, &self.task_id, Self::PORT_CONCEPTS, &concepts).await;
        write_output(&context, &self.task_id, PORT_STATUS, log.text()).await;

        Ok(TaskResult::new(Some(summary), NextAction::Continue))
    }
}
