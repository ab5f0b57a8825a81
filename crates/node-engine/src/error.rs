//! Node engine errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeEngineError>;

#[derive(Debug, Error)]
pub enum NodeEngineError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// No descriptor registered for a node type
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
}

impl From<NodeEngineError> for graph_flow::GraphError {
    fn from(err: NodeEngineError) -> Self {
        graph_flow::GraphError::TaskExecutionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_graph_error_keeps_message() {
        let err = NodeEngineError::UnknownNodeType("luma-audio".to_string());
        let graph_err: graph_flow::GraphError = err.into();
        assert!(graph_err.to_string().contains("Unknown node type: luma-audio"));
    }
}
