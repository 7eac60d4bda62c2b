use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{context::Context, error::Result};

/// Result of a single step execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Response to show to the user (a prompt, a question, a summary)
    pub response: Option<String>,
    /// Next action to take
    pub next_action: NextAction,
    /// Short human readable status stored on the session
    pub status_message: Option<String>,
    /// Id of the task that produced this result, filled in by the graph
    #[serde(default)]
    pub task_id: String,
}

impl TaskResult {
    pub fn new(response: Option<String>, next_action: NextAction) -> Self {
        Self {
            response,
            next_action,
            status_message: None,
            task_id: String::new(),
        }
    }

    pub fn new_with_status(
        response: Option<String>,
        next_action: NextAction,
        status_message: Option<String>,
    ) -> Self {
        Self {
            response,
            next_action,
            status_message,
            task_id: String::new(),
        }
    }
}

/// Defines what should happen after a step completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Move to the next step and hand control back to the caller
    Continue,
    /// Move to the next step and run it immediately
    ContinueAndExecute,
    /// The wizard is finished
    End,
    /// Stay on this step until the user submits more input
    WaitForInput,
}

/// A single wizard step
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique identifier for this step. Defaults to the type name.
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Execute the step against the shared session context
    async fn run(&self, context: Context) -> Result<TaskResult>;
}
