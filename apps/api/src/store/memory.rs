//! In-memory state store used by pipeline and assembly tests.
//! Mirrors the append-only discipline of the PostgreSQL store.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::session::{PipelineRunRow, StageEventRow};
use crate::store::{RunStatus, StateStore};

#[derive(Default)]
struct SessionData {
    state: HashMap<String, Vec<String>>,
    events: Vec<StageEventRow>,
}

#[derive(Default)]
pub struct MemoryStateStore {
    sessions: Mutex<HashMap<Uuid, SessionData>>,
    runs: Mutex<Vec<PipelineRunRow>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn create_session(&self, _user_id: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .await
            .insert(id, SessionData::default());
        Ok(id)
    }

    async fn append_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(session_id).or_default();
        session
            .state
            .entry(key.to_string())
            .or_default()
            .push(content.to_string());
        Ok(())
    }

    async fn replace_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(session_id).or_default();
        session.state.insert(key.to_string(), vec![content.to_string()]);
        Ok(())
    }

    async fn read_state(&self, session_id: Uuid, key: &str) -> Result<Option<String>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(&session_id)
            .and_then(|s| s.state.get(key))
            .filter(|rows| !rows.is_empty())
            .map(|rows| rows.join("\n\n")))
    }

    async fn record_event(
        &self,
        session_id: Uuid,
        author: &str,
        text_parts: &[String],
    ) -> Result<i64> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(session_id).or_default();
        let ordinal = session.events.len() as i64 + 1;
        session.events.push(StageEventRow {
            id: Uuid::new_v4(),
            session_id,
            author: author.to_string(),
            ordinal,
            text_parts: serde_json::json!(text_parts),
            created_at: Utc::now(),
        });
        Ok(ordinal)
    }

    async fn read_events(&self, session_id: Uuid) -> Result<Vec<StageEventRow>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(&session_id)
            .map(|s| s.events.clone())
            .unwrap_or_default())
    }

    async fn begin_run(&self, session_id: Uuid) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.runs.lock().await.push(PipelineRunRow {
            id,
            session_id,
            status: RunStatus::Running.as_str().to_string(),
            last_completed_stage: None,
            failed_stage: None,
            started_at: Utc::now(),
            completed_at: None,
        });
        Ok(id)
    }

    async fn update_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        last_completed_stage: Option<&str>,
    ) -> Result<()> {
        let mut runs = self.runs.lock().await;
        if let Some(run) = runs.iter_mut().find(|r| r.id == run_id) {
            run.status = status.as_str().to_string();
            if let Some(stage) = last_completed_stage {
                run.last_completed_stage = Some(stage.to_string());
            }
        }
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, failed_stage: &str) -> Result<()> {
        let mut runs = self.runs.lock().await;
        if let Some(run) = runs.iter_mut().find(|r| r.id == run_id) {
            run.status = RunStatus::Failed.as_str().to_string();
            run.failed_stage = Some(failed_stage.to_string());
        }
        Ok(())
    }

    async fn complete_run(&self, run_id: Uuid, status: RunStatus) -> Result<()> {
        let mut runs = self.runs.lock().await;
        if let Some(run) = runs.iter_mut().find(|r| r.id == run_id) {
            run.status = status.as_str().to_string();
            run.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<PipelineRunRow>> {
        Ok(self.runs.lock().await.last().cloned())
    }
}
