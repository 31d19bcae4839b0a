//! Document assembly: turns the accumulated generation corpus into one
//! structured course document (title, overview, weekly summary, ordered week
//! blocks) and renders it through pluggable sinks.

pub mod builder;
pub mod prompts;
pub mod sink;
pub mod structure;

use serde::Serialize;
use tracing::info;

use crate::llm_client::GenerationClient;
use crate::models::course::CourseConfigRow;
use crate::segmentation::{segment_weeks, WeekBlock};
use crate::storage::{slugify, RenderedArtifact};

/// The fully assembled input contract for every sink: a title, an overview,
/// one summary bullet per week, and the ordered week blocks.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDocument {
    pub title: String,
    pub slug: String,
    pub overview: String,
    pub weekly_summary: Vec<String>,
    pub weeks: Vec<WeekBlock>,
}

/// Per-item render outcome. A failed item never aborts its siblings.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub item: String,
    pub ok: bool,
    pub artifact: Option<RenderedArtifact>,
    pub error: Option<String>,
}

impl RenderReport {
    pub fn success(item: impl Into<String>, artifact: RenderedArtifact) -> Self {
        Self {
            item: item.into(),
            ok: true,
            artifact: Some(artifact),
            error: None,
        }
    }

    pub fn failure(item: impl Into<String>, error: impl ToString) -> Self {
        Self {
            item: item.into(),
            ok: false,
            artifact: None,
            error: Some(error.to_string()),
        }
    }
}

/// Assembles the course document from the accumulated corpus.
///
/// The corpus is segmented directly; when that only yields the synthetic
/// fallback, the builder's normalized document is segmented instead — its
/// skeleton guarantees at least one parseable week even with the generation
/// capability entirely absent.
pub async fn assemble_course(
    llm: &dyn GenerationClient,
    config: &CourseConfigRow,
    corpus: &str,
    grounding: bool,
) -> CourseDocument {
    let normalized = builder::build_structured_text(llm, config, corpus, grounding).await;
    let outline = builder::parse_outline(&normalized);

    let mut segmentation = segment_weeks(corpus);
    if segmentation.is_synthetic() {
        let from_normalized = segment_weeks(&normalized);
        if !from_normalized.is_synthetic() {
            info!("Corpus had no week markers; using weeks from the normalized document");
            segmentation = from_normalized;
        }
    }

    let title = if outline.title.is_empty() {
        config.course_topic.clone()
    } else {
        outline.title
    };

    let weekly_summary = if outline.weekly_summary.is_empty() {
        segmentation
            .weeks
            .iter()
            .map(|w| format!("Week {}: {}", w.week_number, w.title))
            .collect()
    } else {
        outline.weekly_summary
    };

    CourseDocument {
        // The slug comes from the configured topic, not the generated title,
        // so repeated runs land in the same course directory.
        slug: slugify(&config.course_topic),
        title,
        overview: outline.overview,
        weekly_summary,
        weeks: segmentation.weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::ScriptedClient;
    use crate::models::course::testing::sample_config;

    #[tokio::test]
    async fn test_assemble_prefers_corpus_weeks() {
        let corpus = "# Week 1: Basics\nalpha\n=== WEEK 1 COMPLETED ===\n\
                      # Week 2: More\nbeta\n=== WEEK 2 COMPLETED ===";
        let normalized = "# Rust Basics\n\n## Course Overview\nA course.\n\n## Weekly Summary\n- Week 1: Basics\n- Week 2: More\n\n# Week 1: Basics\nx\n=== WEEK 1 COMPLETED ===";
        let llm = ScriptedClient::new(vec![Ok(normalized.to_string())]);
        let config = sample_config("Rust Basics");

        let document = assemble_course(&llm, &config, corpus, false).await;
        assert_eq!(document.title, "Rust Basics");
        assert_eq!(document.weeks.len(), 2);
        assert_eq!(document.weekly_summary.len(), 2);
        assert_eq!(document.slug, "rust-basics");
    }

    #[tokio::test]
    async fn test_assemble_without_generation_capability_still_yields_a_week() {
        let llm = ScriptedClient::unreachable();
        let config = sample_config("Compilers");

        let document = assemble_course(&llm, &config, "", false).await;
        assert_eq!(document.title, "Compilers");
        assert_eq!(document.weeks.len(), 1);
        assert_eq!(document.weeks[0].week_number, 1);
        assert_eq!(document.weekly_summary.len(), 1);
    }
}
