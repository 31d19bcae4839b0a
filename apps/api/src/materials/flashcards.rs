//! Flashcard deck generation: one model call returning a JSON array of
//! cards, salvaged leniently from fenced or comment-polluted output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::assembly::{CourseDocument, RenderReport};
use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::materials::prompts::FLASHCARD_SYSTEM;
use crate::models::course::CourseConfigRow;
use crate::storage::{ArtifactStore, Category};

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*//.*$").expect("Invalid comment regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Generates the flashcard deck for a course. One item, one report.
pub async fn generate_flashcards(
    llm: &dyn GenerationClient,
    store: &ArtifactStore,
    config: &CourseConfigRow,
    corpus: &str,
    document: &CourseDocument,
) -> Vec<RenderReport> {
    let request = GenerationRequest {
        system: FLASHCARD_SYSTEM.to_string(),
        parts: vec![
            config.prompt_header(),
            format!("COURSE CONTENT:\n{corpus}"),
        ],
        grounding: false,
    };

    let cards = match llm.generate(request).await {
        Ok(result) => match salvage_cards(&result.text) {
            Some(cards) if !cards.is_empty() => cards,
            _ => {
                warn!("Flashcard output was not a usable JSON array");
                return vec![RenderReport::failure(
                    "flashcard-deck",
                    "model output was not a usable JSON card array",
                )];
            }
        },
        Err(e) => {
            warn!("Flashcard generation failed: {e}");
            return vec![RenderReport::failure("flashcard-deck", e)];
        }
    };

    let filename = format!("{}-flashcards.md", document.slug);
    let content = deck_markdown(&document.title, &cards);
    match store
        .write_text(Category::Flashcards, &document.slug, &filename, None, &content)
        .await
    {
        Ok(artifact) => vec![RenderReport::success("flashcard-deck", artifact)],
        Err(e) => vec![RenderReport::failure("flashcard-deck", e)],
    }
}

/// Extracts a card array from model output that may be wrapped in code
/// fences, preceded by prose, or polluted with `//` comments.
pub fn salvage_cards(text: &str) -> Option<Vec<Flashcard>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    let candidate = LINE_COMMENT.replace_all(&text[start..=end], "");
    serde_json::from_str(&candidate).ok()
}

fn deck_markdown(title: &str, cards: &[Flashcard]) -> String {
    let mut out = format!("# Flashcards — {title}\n\nTotal cards: {}\n", cards.len());
    for (i, card) in cards.iter().enumerate() {
        out.push_str(&format!(
            "\n## Card {}\n**Front:** {}\n\n**Back:** {}\n",
            i + 1,
            card.front,
            card.back
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::ScriptedClient;
    use crate::models::course::testing::sample_config;
    use crate::segmentation::WeekBlock;

    const DECK_JSON: &str = r#"[
        {"front": "What is ownership?", "back": "Each value has one owner."},
        {"front": "What is borrowing?", "back": "A reference without ownership."}
    ]"#;

    fn sample_document() -> CourseDocument {
        CourseDocument {
            title: "Rust".to_string(),
            slug: "rust".to_string(),
            overview: String::new(),
            weekly_summary: vec![],
            weeks: vec![WeekBlock {
                week_number: 1,
                title: "Ownership".to_string(),
                raw_body: "body".to_string(),
                source_span: (0, 4),
            }],
        }
    }

    #[test]
    fn test_salvage_plain_array() {
        let cards = salvage_cards(DECK_JSON).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "What is ownership?");
    }

    #[test]
    fn test_salvage_fenced_and_commented_array() {
        let text = format!("Here are your cards:\n```json\n{DECK_JSON}\n```");
        assert_eq!(salvage_cards(&text).unwrap().len(), 2);

        let commented = "[\n// the first card\n{\"front\": \"a\", \"back\": \"b\"}\n]";
        assert_eq!(salvage_cards(commented).unwrap().len(), 1);
    }

    #[test]
    fn test_salvage_rejects_non_arrays() {
        assert!(salvage_cards("no json here").is_none());
        assert!(salvage_cards("{\"front\": \"a\"}").is_none());
    }

    #[tokio::test]
    async fn test_deck_renders_one_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let llm = ScriptedClient::new(vec![Ok(DECK_JSON.to_string())]);

        let reports = generate_flashcards(
            &llm,
            &store,
            &sample_config("Rust"),
            "corpus",
            &sample_document(),
        )
        .await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].ok);
        assert_eq!(
            reports[0].artifact.as_ref().unwrap().filename,
            "rust-flashcards.md"
        );

        let content = std::fs::read_to_string(
            tmp.path().join("flashcards/rust/rust-flashcards.md"),
        )
        .unwrap();
        assert!(content.contains("Total cards: 2"));
        assert!(content.contains("What is borrowing?"));
    }

    #[tokio::test]
    async fn test_unusable_output_is_a_single_failure_report() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let llm = ScriptedClient::new(vec![Ok("sorry, I cannot".to_string())]);

        let reports = generate_flashcards(
            &llm,
            &store,
            &sample_config("Rust"),
            "corpus",
            &sample_document(),
        )
        .await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].ok);
    }
}
