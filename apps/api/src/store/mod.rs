//! Session state store — append-only event log plus latest-state snapshot,
//! keyed by session. The pipeline controller holds a read/append handle for
//! the duration of a run; the per-session lock registry guarantees at most
//! one in-flight writer per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::session::{PipelineRunRow, StageEventRow};

pub mod pg;

#[cfg(test)]
pub mod memory;

/// Well-known session state keys written by the pipeline stages.
pub mod keys {
    pub const CURRICULUM: &str = "curriculum";
    pub const COURSE_PLAN: &str = "course_plan";
    pub const COURSE_CONTENT: &str = "course_content";
    pub const DEEP_COURSE_CONTENT: &str = "deep_course_content";
}

/// Pipeline run state machine, persisted on `pipeline_runs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    LoopRunning,
    LoopComplete,
    LoopExhausted,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::LoopRunning => "loop-running",
            RunStatus::LoopComplete => "loop-complete",
            RunStatus::LoopExhausted => "loop-exhausted",
            RunStatus::Finished => "finished",
            RunStatus::Failed => "failed",
        }
    }
}

/// Durable session state. `append_state` never rewrites earlier rows for a
/// key; `read_state` returns the rows concatenated in append order. Events
/// are immutable and carry a per-session monotonic ordinal.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn create_session(&self, user_id: &str) -> Result<Uuid>;

    async fn append_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()>;
    async fn replace_state(&self, session_id: Uuid, key: &str, content: &str) -> Result<()>;
    async fn read_state(&self, session_id: Uuid, key: &str) -> Result<Option<String>>;

    async fn record_event(
        &self,
        session_id: Uuid,
        author: &str,
        text_parts: &[String],
    ) -> Result<i64>;
    async fn read_events(&self, session_id: Uuid) -> Result<Vec<StageEventRow>>;

    async fn begin_run(&self, session_id: Uuid) -> Result<Uuid>;
    async fn update_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        last_completed_stage: Option<&str>,
    ) -> Result<()>;
    async fn fail_run(&self, run_id: Uuid, failed_stage: &str) -> Result<()>;
    async fn complete_run(&self, run_id: Uuid, status: RunStatus) -> Result<()>;
    async fn latest_run(&self) -> Result<Option<PipelineRunRow>>;
}

/// Per-session writer locks. The store itself does not serialize writers;
/// callers take the session lock for the whole run.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, session_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .lock()
            .expect("session lock registry poisoned")
            .entry(session_id)
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_registry_returns_same_lock_per_session() {
        let locks = SessionLocks::new();
        let id = Uuid::new_v4();
        let a = locks.lock_for(id);
        let b = locks.lock_for(id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_lock_registry_distinct_sessions_get_distinct_locks() {
        let locks = SessionLocks::new();
        let a = locks.lock_for(Uuid::new_v4());
        let b = locks.lock_for(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_session_lock_serializes_writers() {
        let locks = SessionLocks::new();
        let id = Uuid::new_v4();
        let lock = locks.lock_for(id);
        let guard = lock.lock().await;
        let second = locks.lock_for(id);
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }
}
