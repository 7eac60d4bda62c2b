use thiserror::Error;

/// Errors raised while building or running a step graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for GraphError {
    fn from(err: sqlx::Error) -> Self {
        GraphError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::ContextError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
