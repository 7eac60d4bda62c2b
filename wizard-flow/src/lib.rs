pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod storage_postgres;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
pub use storage_postgres::PostgresSessionStorage;
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FormStep {
        id: String,
        field: &'static str,
    }

    #[async_trait]
    impl Task for FormStep {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            match context.get::<String>(self.field).await {
                Some(_) => Ok(TaskResult::new(None, NextAction::Continue)),
                None => Ok(TaskResult::new(
                    Some(format!("Please provide {}", self.field)),
                    NextAction::WaitForInput,
                )),
            }
        }
    }

    struct DoneStep;

    #[async_trait]
    impl Task for DoneStep {
        async fn run(&self, _context: Context) -> Result<TaskResult> {
            Ok(TaskResult::new(Some("done".to_string()), NextAction::End))
        }
    }

    fn form_graph() -> Graph {
        let done = Arc::new(DoneStep);
        let done_id = done.id().to_string();
        GraphBuilder::new("form")
            .add_task(Arc::new(FormStep {
                id: "name".to_string(),
                field: "name",
            }))
            .add_task(Arc::new(FormStep {
                id: "complaint".to_string(),
                field: "complaint",
            }))
            .add_task(done)
            .add_edge("name", "complaint")
            .add_edge("complaint", done_id)
            .build()
    }

    #[test]
    fn default_task_id_is_type_name() {
        assert!(DoneStep.id().ends_with("DoneStep"));
    }

    #[tokio::test]
    async fn waits_until_input_is_present() {
        let graph = form_graph();
        let mut session = Session::new_from_task("s1".to_string(), "name");

        let result = graph.execute_session(&mut session).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(result.response.as_deref(), Some("Please provide name"));
        assert_eq!(session.current_task_id, "name");
        assert!(session.history.is_empty());

        session.context.set("name", "Ada").await;
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "complaint");
        assert_eq!(session.history, vec!["name".to_string()]);
    }

    #[tokio::test]
    async fn rewind_returns_to_previous_step_and_stops_at_start() {
        let graph = form_graph();
        let mut session = Session::new_from_task("s1".to_string(), "name");
        session.context.set("name", "Ada").await;
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "complaint");

        assert!(graph.rewind_session(&mut session));
        assert_eq!(session.current_task_id, "name");

        assert!(!graph.rewind_session(&mut session));
        assert_eq!(session.current_task_id, "name");
    }

    #[tokio::test]
    async fn conditional_edge_picks_branch() {
        let graph = GraphBuilder::new("branch")
            .add_task(Arc::new(FormStep {
                id: "start".to_string(),
                field: "start",
            }))
            .add_task(Arc::new(FormStep {
                id: "urgent".to_string(),
                field: "x",
            }))
            .add_task(Arc::new(FormStep {
                id: "routine".to_string(),
                field: "y",
            }))
            .add_conditional_edge(
                "start",
                |ctx| ctx.get_sync::<bool>("urgent").unwrap_or(false),
                "urgent",
                "routine",
            )
            .build();

        let context = Context::new();
        assert_eq!(graph.find_next_task("start", &context).as_deref(), Some("routine"));
        context.set("urgent", true).await;
        assert_eq!(graph.find_next_task("start", &context).as_deref(), Some("urgent"));
    }

    #[tokio::test]
    async fn runner_persists_each_step() {
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(Arc::new(form_graph()), storage.clone());

        let session = Session::new_from_task("s2".to_string(), "name");
        session.context.set("name", "Ada").await;
        session.context.set("complaint", "cough").await;
        storage.save(session).await.unwrap();

        runner.run("s2").await.unwrap();
        runner.run("s2").await.unwrap();
        let result = runner.run("s2").await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);

        let back = runner.back("s2").await.unwrap();
        assert_eq!(back.current_task_id, "complaint");
        let stored = storage.get("s2").await.unwrap().unwrap();
        assert_eq!(stored.current_task_id, "complaint");
    }

    #[tokio::test]
    async fn runner_reports_missing_session() {
        let runner = FlowRunner::new(
            Arc::new(form_graph()),
            Arc::new(InMemorySessionStorage::new()),
        );
        let err = runner.run("missing").await.unwrap_err();
        assert!(matches!(err, GraphError::SessionNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn in_memory_session_storage_saves_and_deletes() {
        let session_storage = InMemorySessionStorage::new();

        let session = Session::new_from_task("session1".to_string(), "task1");
        session_storage.save(session.clone()).await.unwrap();
        assert!(session_storage.get("session1").await.unwrap().is_some());

        session_storage.delete("session1").await.unwrap();
        assert!(session_storage.get("session1").await.unwrap().is_none());
    }
}
