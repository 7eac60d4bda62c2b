use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, types::Json};
use tracing::info;

use crate::{
    Context,
    error::Result,
    storage::{Session, SessionStorage},
};

/// Session storage backed by a single PostgreSQL table.
///
/// Each save overwrites the whole row; the latest writer wins.
pub struct PostgresSessionStorage {
    pool: PgPool,
}

impl PostgresSessionStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        info!("Connected to PostgreSQL session storage");
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wizard_sessions (
                id TEXT PRIMARY KEY,
                graph_id TEXT NOT NULL,
                current_task_id TEXT NOT NULL,
                status_message TEXT,
                history JSONB NOT NULL DEFAULT '[]'::jsonb,
                context JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for PostgresSessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wizard_sessions
                (id, graph_id, current_task_id, status_message, history, context, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                graph_id = EXCLUDED.graph_id,
                current_task_id = EXCLUDED.current_task_id,
                status_message = EXCLUDED.status_message,
                history = EXCLUDED.history,
                context = EXCLUDED.context,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.graph_id)
        .bind(&session.current_task_id)
        .bind(&session.status_message)
        .bind(Json(session.history.clone()))
        .bind(Json(session.context.clone()))
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, graph_id, current_task_id, status_message, history, context, updated_at
            FROM wizard_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Json(history): Json<Vec<String>> = row.try_get("history")?;
        let Json(context): Json<Context> = row.try_get("context")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(Session {
            id: row.try_get("id")?,
            graph_id: row.try_get("graph_id")?,
            current_task_id: row.try_get("current_task_id")?,
            status_message: row.try_get("status_message")?,
            history,
            context,
            updated_at,
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM wizard_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
