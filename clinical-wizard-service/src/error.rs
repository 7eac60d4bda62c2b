use thiserror::Error;

use crate::refinement::TestStatus;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Deleting note {0} requires confirmation")]
    DeletionNotConfirmed(String),

    #[error("Unknown test: {0}")]
    UnknownTest(String),

    #[error("Test {test} cannot move from {from:?} to {to:?}")]
    InvalidTestTransition {
        test: String,
        from: TestStatus,
        to: TestStatus,
    },

    #[error("A result value is required to complete {0}")]
    MissingResult(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Flow(#[from] wizard_flow::GraphError),
}

pub type Result<T> = std::result::Result<T, WizardError>;
