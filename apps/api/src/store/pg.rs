use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::session::{PipelineRunRow, StageEventRow};
use crate::store::{RunStatus, StateStore};

/// PostgreSQL-backed session state store.
///
/// State rows and events are INSERT-only. The "current value" of a state key
/// is the concatenation of its rows in `seq` order; `replace_state` is the
/// one exception and only ever targets a key owned by the calling stage.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn next_seq(&self, session_id: Uuid, key: &str) -> Result<i64> {
        let current_max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(seq) FROM session_state WHERE session_id = $1 AND state_key = $2",
        )
        .bind(session_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(current_max.unwrap_or(0) + 1)
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn create_session(&self, user_id: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        info!("Created session {id} for user {user_id}");
        Ok(id)
    }

    async fn append_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()> {
        let seq = self.next_seq(session_id, key).await?;
        sqlx::query(
            "INSERT INTO session_state (session_id, state_key, seq, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(key)
        .bind(seq)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM session_state WHERE session_id = $1 AND state_key = $2")
            .bind(session_id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO session_state (session_id, state_key, seq, content) VALUES ($1, $2, 1, $3)",
        )
        .bind(session_id)
        .bind(key)
        .bind(content)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn read_state(&self, session_id: Uuid, key: &str) -> Result<Option<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT content FROM session_state WHERE session_id = $1 AND state_key = $2 ORDER BY seq ASC",
        )
        .bind(session_id)
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.join("\n\n")))
        }
    }

    async fn record_event(
        &self,
        session_id: Uuid,
        author: &str,
        text_parts: &[String],
    ) -> Result<i64> {
        let current_max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(ordinal) FROM stage_events WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        let ordinal = current_max.unwrap_or(0) + 1;

        sqlx::query(
            "INSERT INTO stage_events (id, session_id, author, ordinal, text_parts) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(author)
        .bind(ordinal)
        .bind(serde_json::json!(text_parts))
        .execute(&self.pool)
        .await?;
        Ok(ordinal)
    }

    async fn read_events(&self, session_id: Uuid) -> Result<Vec<StageEventRow>> {
        Ok(sqlx::query_as::<_, StageEventRow>(
            "SELECT * FROM stage_events WHERE session_id = $1 ORDER BY ordinal ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn begin_run(&self, session_id: Uuid) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO pipeline_runs (id, session_id, status) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(session_id)
            .bind(RunStatus::Running.as_str())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        last_completed_stage: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE pipeline_runs SET status = $1, last_completed_stage = COALESCE($2, last_completed_stage) WHERE id = $3",
        )
        .bind(status.as_str())
        .bind(last_completed_stage)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, failed_stage: &str) -> Result<()> {
        sqlx::query("UPDATE pipeline_runs SET status = $1, failed_stage = $2 WHERE id = $3")
            .bind(RunStatus::Failed.as_str())
            .bind(failed_stage)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete_run(&self, run_id: Uuid, status: RunStatus) -> Result<()> {
        sqlx::query("UPDATE pipeline_runs SET status = $1, completed_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<PipelineRunRow>> {
        Ok(sqlx::query_as::<_, PipelineRunRow>(
            "SELECT * FROM pipeline_runs ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?)
    }
}
