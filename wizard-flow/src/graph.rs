use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    context::Context,
    error::{GraphError, Result},
    storage::Session,
    task::{NextAction, Task, TaskResult},
};

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Edge between steps in the graph
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
}

/// A graph of wizard steps
pub struct Graph {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    task_order: Vec<String>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            task_order: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a step. Re-adding an id replaces the step but keeps its position.
    pub fn add_task(&mut self, task: Arc<dyn Task>) -> &mut Self {
        let task_id = task.id().to_string();
        if self.tasks.insert(task_id.clone(), task).is_none() {
            self.task_order.push(task_id);
        }
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition: None,
        });
        self
    }

    /// Branch from `from` to `yes` when `condition` holds, otherwise to `no`
    pub fn add_conditional_edge<F>(
        &mut self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> &mut Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        let from = from.into();
        self.edges.push(Edge {
            from: from.clone(),
            to: yes.into(),
            condition: Some(Arc::new(condition)),
        });
        self.edges.push(Edge {
            from,
            to: no.into(),
            condition: None,
        });
        self
    }

    /// Execute the current step of a session and move the session accordingly.
    ///
    /// Runs exactly one step unless the step asks for `ContinueAndExecute`.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        let result = self
            .execute_single_task(&session.current_task_id, session.context.clone())
            .await?;

        session.status_message = result.status_message.clone();

        match &result.next_action {
            NextAction::Continue => {
                if let Some(next_task_id) = self.find_next_task(&result.task_id, &session.context) {
                    info!(session_id = %session.id, from = %result.task_id, to = %next_task_id, "Advancing step");
                    session.advance_to(next_task_id);
                }
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                })
            }
            NextAction::ContinueAndExecute => {
                if let Some(next_task_id) = self.find_next_task(&result.task_id, &session.context) {
                    info!(session_id = %session.id, from = %result.task_id, to = %next_task_id, "Advancing step and executing");
                    session.advance_to(next_task_id);
                    return Box::pin(self.execute_session(session)).await;
                }
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                })
            }
            NextAction::WaitForInput => Ok(ExecutionResult {
                response: result.response,
                status: ExecutionStatus::WaitingForInput,
            }),
            NextAction::End => {
                info!(session_id = %session.id, task_id = %result.task_id, "Workflow completed");
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::Completed,
                })
            }
        }
    }

    /// Rewind a session to the step it visited before the current one.
    ///
    /// Returns false (and leaves the session on its step) when there is
    /// nothing to go back to.
    pub fn rewind_session(&self, session: &mut Session) -> bool {
        let moved = session.rewind();
        debug!(session_id = %session.id, current = %session.current_task_id, moved, "Rewind requested");
        moved
    }

    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        let mut result = task.run(context).await?;
        result.task_id = task_id.to_string();

        Ok(result)
    }

    /// Find the next step based on edges and their conditions.
    ///
    /// Edges are checked in insertion order; the first matching edge wins.
    pub fn find_next_task(&self, current_task_id: &str, context: &Context) -> Option<String> {
        self.edges
            .iter()
            .filter(|edge| edge.from == current_task_id)
            .find(|edge| match &edge.condition {
                Some(condition) => condition(context),
                None => true,
            })
            .map(|edge| edge.to.clone())
    }

    /// Step ids in the order they were added
    pub fn task_ids(&self) -> &[String] {
        &self.task_order
    }

    /// 1-based position of a step in insertion order
    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.task_order.iter().position(|id| id == task_id).map(|i| i + 1)
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.graph.add_task(task);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.graph.add_conditional_edge(from, condition, yes, no);
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Status of graph execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// Workflow completed successfully
    Completed,
}
