//! Pipeline runner — executes the stage program against one session.
//!
//! Stages are strictly serialized: each generation call is awaited before
//! the next stage reads its output. The caller holds the session writer lock
//! for the whole run, so every iteration of the loop stage sees its own
//! accumulated output exactly as it existed at iteration start.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::models::course::CourseConfigRow;
use crate::pipeline::{
    sequential_stages, LoopOutcome, PipelineError, Stage, WriteMode, DEEP_CONTENT, DONE_SENTINEL,
    MAX_STAGE_RETRIES,
};
use crate::store::{RunStatus, StateStore};

/// Delay between in-stage retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// A read/append handle on one session for the duration of a run.
pub struct PipelineRun<'a> {
    pub llm: &'a dyn GenerationClient,
    pub store: &'a dyn StateStore,
    pub session_id: Uuid,
    pub run_id: Uuid,
    /// Course parameters prepended to every stage call.
    pub context_header: String,
}

impl PipelineRun<'_> {
    /// Executes stages strictly in order. Fails fast when a stage's declared
    /// input key was never written; a stage whose retries are exhausted
    /// halts the run with a stage-identified error, and the last completed
    /// stage stays recorded so callers can report where the run stopped.
    pub async fn run_sequential(&self, stages: &[Stage]) -> Result<(), PipelineError> {
        for stage in stages {
            self.store
                .update_run(self.run_id, RunStatus::Running, None)
                .await?;
            info!("Running stage '{}'", stage.name);

            let output = self.execute_stage(stage, Vec::new()).await?;

            match stage.write_mode {
                WriteMode::Replace => {
                    self.store
                        .replace_state(self.session_id, stage.writes, &output)
                        .await?
                }
                WriteMode::Append => {
                    self.store
                        .append_state(self.session_id, stage.writes, &output)
                        .await?
                }
            }

            self.store
                .update_run(self.run_id, RunStatus::Running, Some(stage.name))
                .await?;
            info!("Stage '{}' complete ({} chars)", stage.name, output.len());
        }
        Ok(())
    }

    /// Repeats one stage up to `max_iterations` times. Each iteration is
    /// supplied the stage's entire accumulated output so the model can pick
    /// the next week number itself; fresh output is appended, never
    /// overwritten, and a partially-written iteration is never rolled back.
    /// Stops early the iteration `termination` matches the new text.
    pub async fn run_loop(
        &self,
        stage: &Stage,
        max_iterations: u32,
        termination: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> Result<LoopOutcome, PipelineError> {
        self.store
            .update_run(self.run_id, RunStatus::LoopRunning, None)
            .await?;

        for iteration in 1..=max_iterations {
            let accumulated = self
                .store
                .read_state(self.session_id, stage.writes)
                .await?
                .unwrap_or_default();

            let existing_part = format!(
                "=== EXISTING {} (continue from the next week number; append only) ===\n{}",
                stage.writes.to_uppercase(),
                accumulated
            );

            let output = self.execute_stage(stage, vec![existing_part]).await?;

            self.store
                .append_state(self.session_id, stage.writes, &output)
                .await?;
            info!(
                "Loop stage '{}' iteration {}/{} appended {} chars",
                stage.name,
                iteration,
                max_iterations,
                output.len()
            );

            if termination(&output) {
                self.store
                    .update_run(self.run_id, RunStatus::LoopComplete, Some(stage.name))
                    .await?;
                return Ok(LoopOutcome::Completed { iterations: iteration });
            }
        }

        // Cap reached without the sentinel: a valid terminal state, not an
        // error. Whatever was produced proceeds to segmentation.
        self.store
            .update_run(self.run_id, RunStatus::LoopExhausted, Some(stage.name))
            .await?;
        Ok(LoopOutcome::Exhausted {
            iterations: max_iterations,
        })
    }

    /// One stage execution with bounded retry on the same inputs.
    /// Successful responses are recorded as immutable stage events.
    async fn execute_stage(
        &self,
        stage: &Stage,
        extra_parts: Vec<String>,
    ) -> Result<String, PipelineError> {
        let mut parts = vec![self.context_header.clone()];
        for &key in stage.reads {
            let Some(content) = self.store.read_state(self.session_id, key).await? else {
                return Err(PipelineError::MissingInput {
                    stage: stage.name,
                    key,
                });
            };
            parts.push(format!("=== {} ===\n{}", key.to_uppercase(), content));
        }
        parts.extend(extra_parts);

        let mut attempts = 0;
        loop {
            attempts += 1;
            let request = GenerationRequest {
                system: stage.system.to_string(),
                parts: parts.clone(),
                grounding: stage.grounding,
            };

            match self.llm.generate(request).await {
                Ok(result) => {
                    self.store
                        .record_event(self.session_id, stage.name, &[result.text.clone()])
                        .await?;
                    return Ok(result.text);
                }
                Err(e) if e.is_retryable() && attempts < MAX_STAGE_RETRIES => {
                    warn!(
                        "Stage '{}' attempt {}/{} failed: {e}; retrying with the same inputs",
                        stage.name, attempts, MAX_STAGE_RETRIES
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => {
                    return Err(PipelineError::StageFailed {
                        stage: stage.name,
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Runs the full default program: planner → content generator → deep-content
/// loop. The loop cap is the configured duration when known, bounded by the
/// service-wide iteration limit.
pub async fn run_course_pipeline(
    llm: &dyn GenerationClient,
    store: &dyn StateStore,
    session_id: Uuid,
    run_id: Uuid,
    config: &CourseConfigRow,
    max_loop_iterations: u32,
) -> Result<LoopOutcome, PipelineError> {
    let run = PipelineRun {
        llm,
        store,
        session_id,
        run_id,
        context_header: config.prompt_header(),
    };

    run.run_sequential(&sequential_stages()).await?;

    let cap = config
        .duration()
        .map(|weeks| weeks.min(max_loop_iterations))
        .unwrap_or(max_loop_iterations);

    run.run_loop(&DEEP_CONTENT, cap, &|text: &str| text.contains(DONE_SENTINEL))
        .await
}
