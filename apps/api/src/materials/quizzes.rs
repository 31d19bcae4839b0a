//! Quiz generation: three themed quiz papers, one model call each.

use tracing::warn;

use crate::assembly::RenderReport;
use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::materials::prompts::{QUIZ_SYSTEM_TEMPLATE, QUIZ_TASK_TEMPLATE};
use crate::models::course::CourseConfigRow;
use crate::storage::{slugify, ArtifactStore, Category};

pub const QUIZ_THEMES: [&str; 3] = [
    "Foundation and Analysis",
    "Application and Synthesis",
    "Evaluation and Innovation",
];

/// Generates one quiz paper per theme. Themes fail independently; each
/// outcome is its own report.
pub async fn generate_quizzes(
    llm: &dyn GenerationClient,
    store: &ArtifactStore,
    config: &CourseConfigRow,
    corpus: &str,
    slug: &str,
) -> Vec<RenderReport> {
    let system = QUIZ_SYSTEM_TEMPLATE.replace("{difficulty}", config.difficulty().as_str());
    let mut reports = Vec::with_capacity(QUIZ_THEMES.len());

    for (index, theme) in QUIZ_THEMES.iter().enumerate() {
        let number = index + 1;
        let item = format!("quiz-{number}");
        let task = QUIZ_TASK_TEMPLATE
            .replace("{number}", &number.to_string())
            .replace("{theme}", theme);

        let request = GenerationRequest {
            system: system.clone(),
            parts: vec![
                config.prompt_header(),
                format!("COURSE CONTENT:\n{corpus}"),
                format!("TASK: {task}"),
            ],
            grounding: true,
        };

        let report = match llm.generate(request).await {
            Ok(result) => {
                let quiz = extract_single_quiz(&result.text, number);
                let filename = format!("{slug}-quiz-{number}-{}.md", slugify(theme));
                match store
                    .write_text(Category::Quizzes, slug, &filename, None, &quiz)
                    .await
                {
                    Ok(artifact) => RenderReport::success(item, artifact),
                    Err(e) => RenderReport::failure(item, e),
                }
            }
            Err(e) => {
                warn!("Quiz {number} ({theme}) generation failed: {e}");
                RenderReport::failure(item, e)
            }
        };
        reports.push(report);
    }

    reports
}

/// The model occasionally returns several quiz papers despite the single-quiz
/// instruction; keep only the requested one.
fn extract_single_quiz(text: &str, number: usize) -> String {
    let next_marker = format!("Quiz Paper {}", number + 1);
    if !text.contains(&next_marker) {
        return text.trim().to_string();
    }

    let start_marker = format!("Quiz Paper {number}");
    let mut collected = Vec::new();
    let mut found = false;
    for line in text.lines() {
        if !found {
            if line.contains(&start_marker) {
                found = true;
                collected.push(line);
            }
            continue;
        }
        if line.contains(&next_marker) {
            break;
        }
        collected.push(line);
    }

    if collected.is_empty() {
        text.trim().to_string()
    } else {
        collected.join("\n").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::ScriptedClient;
    use crate::models::course::testing::sample_config;

    #[test]
    fn test_extract_keeps_single_quiz_untouched() {
        let text = "Quiz Paper 1: Foundations\n1. What is ownership?";
        assert_eq!(extract_single_quiz(text, 1), text);
    }

    #[test]
    fn test_extract_cuts_at_the_next_quiz() {
        let text = "Quiz Paper 1: Foundations\nQ1\nQ2\nQuiz Paper 2: Applications\nQ1";
        let extracted = extract_single_quiz(text, 1);
        assert!(extracted.contains("Foundations"));
        assert!(extracted.contains("Q2"));
        assert!(!extracted.contains("Applications"));
    }

    #[test]
    fn test_extract_without_start_marker_falls_back_to_full_text() {
        let text = "No markers here at all\nQuiz Paper 2 mentioned only";
        assert_eq!(extract_single_quiz(text, 1), text.trim());
    }

    #[tokio::test]
    async fn test_failed_theme_does_not_abort_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let llm = ScriptedClient::new(vec![
            Ok("Quiz Paper 1\nQ1".to_string()),
            Err(crate::llm_client::LlmError::EmptyContent),
            Ok("Quiz Paper 3\nQ1".to_string()),
        ]);
        let config = sample_config("Rust");

        let reports = generate_quizzes(&llm, &store, &config, "corpus", "rust").await;
        assert_eq!(reports.len(), 3);
        assert!(reports[0].ok);
        assert!(!reports[1].ok);
        assert!(reports[2].ok);
    }

    #[tokio::test]
    async fn test_quiz_filenames_are_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let llm = ScriptedClient::new(vec![
            Ok("q1".to_string()),
            Ok("q2".to_string()),
            Ok("q3".to_string()),
        ]);
        let config = sample_config("Rust");

        let reports = generate_quizzes(&llm, &store, &config, "corpus", "rust").await;
        let names: Vec<_> = reports
            .iter()
            .filter_map(|r| r.artifact.as_ref().map(|a| a.filename.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                "rust-quiz-1-foundation-and-analysis.md",
                "rust-quiz-2-application-and-synthesis.md",
                "rust-quiz-3-evaluation-and-innovation.md",
            ]
        );
    }
}
