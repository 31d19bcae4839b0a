//! Stage pipeline — the ordered sequence of generation stages plus the
//! bounded deep-content loop that accumulates one week per iteration.

pub mod handlers;
pub mod prompts;
pub mod runner;

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::store::keys;

/// Completion sentinel: its presence in fresh loop output ends the loop
/// early. Fragile against model phrasing drift, so the iteration cap is the
/// real bound.
pub const DONE_SENTINEL: &str = "DONE and DUSTED";

/// Attempts per stage (same inputs) before a transient error escalates to a
/// stage-identified fatal failure.
pub const MAX_STAGE_RETRIES: u32 = 3;

/// How a stage's output lands in session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    /// Loop-stage writes never overwrite earlier iterations.
    Append,
}

/// One discrete generation step: declared inputs, one output key, and
/// whether the call is search-grounded.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub system: &'static str,
    pub reads: &'static [&'static str],
    pub writes: &'static str,
    pub write_mode: WriteMode,
    pub grounding: bool,
}

/// Plans the course from the curriculum and configuration.
pub const COURSE_DESIGNER: Stage = Stage {
    name: "course_designer",
    system: prompts::COURSE_DESIGNER_SYSTEM,
    reads: &[keys::CURRICULUM],
    writes: keys::COURSE_PLAN,
    write_mode: WriteMode::Replace,
    grounding: true,
};

/// Expands the plan into module-level course content with curated resources.
pub const CONTENT_GENERATOR: Stage = Stage {
    name: "content_generator",
    system: prompts::CONTENT_GENERATOR_SYSTEM,
    reads: &[keys::CURRICULUM, keys::COURSE_PLAN],
    writes: keys::COURSE_CONTENT,
    write_mode: WriteMode::Replace,
    grounding: true,
};

/// Loop stage: one fully elaborated week per iteration, appended to its own
/// accumulated output.
pub const DEEP_CONTENT: Stage = Stage {
    name: "deep_content",
    system: prompts::DEEP_CONTENT_SYSTEM,
    reads: &[keys::COURSE_PLAN, keys::COURSE_CONTENT],
    writes: keys::DEEP_COURSE_CONTENT,
    write_mode: WriteMode::Append,
    grounding: true,
};

/// The default stage program, in data-dependency order.
pub fn sequential_stages() -> [Stage; 2] {
    [COURSE_DESIGNER, CONTENT_GENERATOR]
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{stage}' is missing required input '{key}'")]
    MissingInput {
        stage: &'static str,
        key: &'static str,
    },

    #[error("Stage '{stage}' failed after {attempts} attempts: {source}")]
    StageFailed {
        stage: &'static str,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("State store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl PipelineError {
    /// The stage this error identifies, so callers can report precisely
    /// where the run stopped.
    pub fn stage_name(&self) -> Option<&'static str> {
        match self {
            PipelineError::MissingInput { stage, .. } => Some(stage),
            PipelineError::StageFailed { stage, .. } => Some(stage),
            PipelineError::Store(_) => None,
        }
    }
}

/// How the loop stage ended. Exhaustion (cap hit without the sentinel) is a
/// valid non-error terminal state; segmentation still runs on whatever was
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Completed { iterations: u32 },
    Exhausted { iterations: u32 },
}

impl LoopOutcome {
    pub fn iterations(&self) -> u32 {
        match self {
            LoopOutcome::Completed { iterations } => *iterations,
            LoopOutcome::Exhausted { iterations } => *iterations,
        }
    }
}
