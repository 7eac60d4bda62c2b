use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Context, error::Result};

/// One wizard run: where it is, how it got there, and its shared state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub graph_id: String,
    pub current_task_id: String,
    pub status_message: Option<String>,
    /// Steps visited before the current one, oldest first
    #[serde(default)]
    pub history: Vec<String>,
    pub context: Context,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new_from_task(sid: String, task_name: &str) -> Self {
        Self {
            id: sid,
            graph_id: "default".to_string(),
            current_task_id: task_name.to_string(),
            status_message: None,
            history: Vec::new(),
            context: Context::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_graph_id(mut self, graph_id: impl Into<String>) -> Self {
        self.graph_id = graph_id.into();
        self
    }

    /// Move to `next`, remembering the current step so it can be rewound to
    pub(crate) fn advance_to(&mut self, next: String) {
        if next != self.current_task_id {
            let previous = std::mem::replace(&mut self.current_task_id, next);
            self.history.push(previous);
        }
        self.updated_at = Utc::now();
    }

    /// Return to the previously visited step. Stays put on the first step.
    pub(crate) fn rewind(&mut self) -> bool {
        self.updated_at = Utc::now();
        match self.history.pop() {
            Some(previous) => {
                self.current_task_id = previous;
                true
            }
            None => false,
        }
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
