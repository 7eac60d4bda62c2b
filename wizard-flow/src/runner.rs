//! FlowRunner: loads a session, executes exactly **one** wizard step (or rewinds one step), and
//! persists the updated session back to storage.
//!
//! Use it from request handlers so each submission is a single load → execute → save round
//! trip. Use `Graph::execute_session` directly when you need to inspect the session before it is
//! saved.

use std::sync::Arc;

use crate::{
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    storage::{Session, SessionStorage},
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { graph, storage }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Execute the current step for `session_id` and persist the updated session.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self.load(session_id).await?;
        let result = self.graph.execute_session(&mut session).await?;
        self.storage.save(session).await?;
        Ok(result)
    }

    /// Rewind `session_id` by one step and persist it. Returns the session after the move.
    pub async fn back(&self, session_id: &str) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        self.graph.rewind_session(&mut session);
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| GraphError::SessionNotFound(session_id.to_string()))
    }
}
