//! POST /generate-content — runs the full pipeline synchronously and
//! reports produced artifacts with an explicit completion flag.

use std::time::Duration;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assembly::{assemble_course, RenderReport};
use crate::courses::store::latest_config;
use crate::errors::AppError;
use crate::materials;
use crate::pipeline::runner::run_course_pipeline;
use crate::state::AppState;
use crate::storage::RenderedArtifact;
use crate::store::{keys, RunStatus};

#[derive(Debug, Serialize)]
pub struct GenerateContentResponse {
    pub message: String,
    pub session_id: Uuid,
    pub run_id: Uuid,
    /// True only when the pipeline finished AND every artifact rendered.
    pub completed: bool,
    /// True when the pipeline itself ran to its terminal state, even if
    /// some artifacts failed to render.
    pub process_completed: bool,
    pub status: String,
    pub last_completed_stage: Option<String>,
    pub failed_stage: Option<String>,
    pub loop_iterations: Option<u32>,
    pub artifacts: Vec<RenderedArtifact>,
    pub total_artifacts: usize,
    pub failed_items: Vec<RenderReport>,
}

/// Triggers the full pipeline: stage sequence → deep-content loop →
/// segmentation → rendering. Requires a previously uploaded config and
/// curriculum. Generation failures are reported with the failing stage name
/// and whatever artifacts earlier stages made possible remain listable.
pub async fn handle_generate_content(
    State(state): State<AppState>,
) -> Result<Json<GenerateContentResponse>, AppError> {
    let config = latest_config(&state.db).await?.ok_or_else(|| {
        AppError::Validation(
            "No user configuration found. Please upload a curriculum first.".to_string(),
        )
    })?;
    if config.curriculum_text.trim().is_empty() {
        return Err(AppError::Validation(
            "No curriculum found. Please upload a curriculum first.".to_string(),
        ));
    }

    let store = state.store.as_ref();
    let session_id = store.create_session(&config.user_id).await?;

    // Single writer per session for the whole run.
    let lock = state.locks.lock_for(session_id);
    let _writer = lock.lock().await;

    store
        .replace_state(session_id, keys::CURRICULUM, &config.curriculum_text)
        .await?;
    let run_id = store.begin_run(session_id).await?;
    info!("Starting pipeline run {run_id} (session {session_id})");

    let run_timeout = Duration::from_secs(state.config.run_timeout_secs);
    let pipeline = run_course_pipeline(
        state.llm.as_ref(),
        store,
        session_id,
        run_id,
        &config,
        state.config.loop_max_iterations,
    );

    let loop_outcome = match tokio::time::timeout(run_timeout, pipeline).await {
        Err(_) => {
            store.fail_run(run_id, "run-timeout").await?;
            let last = store
                .latest_run()
                .await?
                .and_then(|r| r.last_completed_stage);
            warn!(
                "Run {run_id} hit the {}s run-level timeout; last completed stage: {}",
                state.config.run_timeout_secs,
                last.as_deref().unwrap_or("none")
            );
            return Ok(Json(GenerateContentResponse {
                message: format!(
                    "Pipeline run timed out; last completed stage: {}. Remaining stages were not executed.",
                    last.as_deref().unwrap_or("none")
                ),
                session_id,
                run_id,
                completed: false,
                process_completed: false,
                status: RunStatus::Failed.as_str().to_string(),
                last_completed_stage: last,
                failed_stage: Some("run-timeout".to_string()),
                loop_iterations: None,
                artifacts: vec![],
                total_artifacts: 0,
                failed_items: vec![],
            }));
        }
        Ok(Err(e)) => {
            let stage = e.stage_name().unwrap_or("unknown");
            store.fail_run(run_id, stage).await?;
            let last = store
                .latest_run()
                .await?
                .and_then(|r| r.last_completed_stage);
            warn!("Run {run_id} failed at stage '{stage}': {e}");
            return Ok(Json(GenerateContentResponse {
                message: format!("Generation failed at stage '{stage}': {e}"),
                session_id,
                run_id,
                completed: false,
                process_completed: false,
                status: RunStatus::Failed.as_str().to_string(),
                last_completed_stage: last,
                failed_stage: Some(stage.to_string()),
                loop_iterations: None,
                artifacts: vec![],
                total_artifacts: 0,
                failed_items: vec![],
            }));
        }
        Ok(Ok(outcome)) => outcome,
    };

    // Segmentation input order: planning output, then deep elaboration.
    let plan = store
        .read_state(session_id, keys::COURSE_PLAN)
        .await?
        .unwrap_or_default();
    let deep = store
        .read_state(session_id, keys::DEEP_COURSE_CONTENT)
        .await?
        .unwrap_or_default();
    let corpus = format!("{plan}\n\n{deep}");

    let document = assemble_course(
        state.llm.as_ref(),
        &config,
        &corpus,
        state.config.builder_grounding,
    )
    .await;
    info!(
        "Assembled course '{}' with {} weeks",
        document.title,
        document.weeks.len()
    );

    let reports = materials::render_all(
        state.llm.clone(),
        state.sink.clone(),
        state.artifacts.clone(),
        config,
        document,
        corpus,
    )
    .await;

    let artifacts: Vec<RenderedArtifact> = reports
        .iter()
        .filter(|r| r.ok)
        .filter_map(|r| r.artifact.clone())
        .collect();
    let failed_items: Vec<RenderReport> = reports.into_iter().filter(|r| !r.ok).collect();

    store.complete_run(run_id, RunStatus::Finished).await?;

    let total_artifacts = artifacts.len();
    let completed = failed_items.is_empty();
    let message = if completed {
        format!("Course generation completed: {total_artifacts} artifacts produced.")
    } else {
        format!(
            "Course generation partially completed: {total_artifacts} artifacts produced, {} items failed.",
            failed_items.len()
        )
    };
    info!("Run {run_id}: {message}");

    Ok(Json(GenerateContentResponse {
        message,
        session_id,
        run_id,
        completed,
        process_completed: true,
        status: RunStatus::Finished.as_str().to_string(),
        last_completed_stage: store
            .latest_run()
            .await?
            .and_then(|r| r.last_completed_stage),
        failed_stage: None,
        loop_iterations: Some(loop_outcome.iterations()),
        artifacts,
        total_artifacts,
        failed_items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LoopOutcome;

    #[test]
    fn test_loop_outcome_iterations_accessor() {
        assert_eq!(LoopOutcome::Completed { iterations: 2 }.iterations(), 2);
        assert_eq!(LoopOutcome::Exhausted { iterations: 8 }.iterations(), 8);
    }

    #[test]
    fn test_response_serializes_counts_and_flags() {
        let response = GenerateContentResponse {
            message: "partial".to_string(),
            session_id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            completed: false,
            process_completed: true,
            status: "finished".to_string(),
            last_completed_stage: Some("deep_content".to_string()),
            failed_stage: None,
            loop_iterations: Some(3),
            artifacts: vec![],
            total_artifacts: 0,
            failed_items: vec![RenderReport::failure("quiz-2", "rate limited")],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["completed"], false);
        assert_eq!(json["process_completed"], true);
        assert_eq!(json["failed_items"][0]["item"], "quiz-2");
    }
}
