//! Per-week slide outlines: a model-authored outline when available, with a
//! deterministic section/sentence fallback so slides always render.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::assembly::structure::{parse_blocks, Block};
use crate::assembly::{CourseDocument, RenderReport};
use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::materials::prompts::SLIDES_SYSTEM;
use crate::segmentation::WeekBlock;
use crate::storage::{ArtifactStore, Category};

const MAX_BULLETS_PER_SLIDE: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub bullets: Vec<String>,
}

/// Generates one slide-outline artifact per week.
pub async fn generate_slides(
    llm: &dyn GenerationClient,
    store: &ArtifactStore,
    document: &CourseDocument,
) -> Vec<RenderReport> {
    let mut reports = Vec::with_capacity(document.weeks.len());

    for week in &document.weeks {
        let item = format!("slides-week-{}", week.week_number);
        let slides = match llm_outline(llm, document, week).await {
            Some(slides) => slides,
            None => {
                warn!(
                    "Week {} slide outline unavailable from the model; using section fallback",
                    week.week_number
                );
                fallback_outline(&week.raw_body)
            }
        };

        let filename = format!("{}-week-{:02}-slides.md", document.slug, week.week_number);
        let content = outline_markdown(&document.title, week, &slides);
        let report = match store
            .write_text(
                Category::Ppts,
                &document.slug,
                &filename,
                Some(week.week_number),
                &content,
            )
            .await
        {
            Ok(artifact) => RenderReport::success(item, artifact),
            Err(e) => RenderReport::failure(item, e),
        };
        reports.push(report);
    }

    reports
}

async fn llm_outline(
    llm: &dyn GenerationClient,
    document: &CourseDocument,
    week: &WeekBlock,
) -> Option<Vec<Slide>> {
    let request = GenerationRequest {
        system: SLIDES_SYSTEM.to_string(),
        parts: vec![format!(
            "COURSE TITLE: {}\nWEEK TITLE: {}\n\nWEEK RAW TEXT:\n{}",
            document.title, week.title, week.raw_body
        )],
        grounding: false,
    };

    let text = llm.generate(request).await.ok()?.text;
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    let slides: Vec<Slide> = serde_json::from_str(&text[start..=end]).ok()?;

    let cleaned: Vec<Slide> = slides
        .into_iter()
        .filter_map(|s| {
            let bullets: Vec<String> = s
                .bullets
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .take(MAX_BULLETS_PER_SLIDE)
                .collect();
            if bullets.is_empty() {
                return None;
            }
            Some(Slide {
                title: if s.title.trim().is_empty() {
                    "Section".to_string()
                } else {
                    s.title.trim().to_string()
                },
                bullets,
            })
        })
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Deterministic outline: one slide group per `##`/`###` section, bodies
/// normalized to sentence-sized bullets, chunked to presentable size.
pub fn fallback_outline(body: &str) -> Vec<Slide> {
    let mut slides = Vec::new();
    let mut heading = "Overview".to_string();
    let mut bucket: Vec<String> = Vec::new();

    let flush = |heading: &str, bucket: &mut Vec<String>, slides: &mut Vec<Slide>| {
        for chunk in chunk_bullets(std::mem::take(bucket), MAX_BULLETS_PER_SLIDE) {
            slides.push(Slide {
                title: heading.to_string(),
                bullets: chunk,
            });
        }
    };

    for block in parse_blocks(body) {
        match block {
            Block::Heading { text, .. } => {
                flush(&heading, &mut bucket, &mut slides);
                heading = text;
            }
            Block::Bullet(text) | Block::Numbered(text) => bucket.extend(text_to_bullets(&text)),
            Block::Paragraph(text) => bucket.extend(text_to_bullets(&text)),
            Block::Code(_) | Block::Rule => {}
        }
    }
    flush(&heading, &mut bucket, &mut slides);

    if slides.is_empty() {
        slides.push(Slide {
            title: "Overview".to_string(),
            bullets: vec!["Content for this week is not yet available.".to_string()],
        });
    }
    slides
}

/// Normalizes a paragraph into bullet-sized lines by splitting sentences.
pub fn text_to_bullets(text: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    for line in text.split('\n') {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        if line.is_empty() {
            continue;
        }
        for sentence in split_sentences(line) {
            if !sentence.is_empty() {
                bullets.push(sentence);
            }
        }
    }
    bullets
}

/// Splits on sentence terminators followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map(|n| n.is_whitespace()).unwrap_or(true)
        {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

fn chunk_bullets(bullets: Vec<String>, max: usize) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for bullet in bullets {
        current.push(bullet);
        if current.len() >= max {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn outline_markdown(course_title: &str, week: &WeekBlock, slides: &[Slide]) -> String {
    let mut out = format!(
        "# {} — Week {}: {}\n",
        course_title, week.week_number, week.title
    );
    for (i, slide) in slides.iter().enumerate() {
        out.push_str(&format!("\n## Slide {}: {}\n", i + 1, slide.title));
        for bullet in &slide.bullets {
            out.push_str(&format!("- {bullet}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::ScriptedClient;

    fn sample_document() -> CourseDocument {
        CourseDocument {
            title: "Rust".to_string(),
            slug: "rust".to_string(),
            overview: String::new(),
            weekly_summary: vec![],
            weeks: vec![WeekBlock {
                week_number: 1,
                title: "Ownership".to_string(),
                raw_body: "## Concepts\nValues have one owner. Borrows are temporary.\n\
                           ## Exercise\n- Write a function taking &str"
                    .to_string(),
                source_span: (0, 10),
            }],
        }
    }

    #[test]
    fn test_sentence_split() {
        assert_eq!(
            split_sentences("One. Two! Three?"),
            vec!["One.", "Two!", "Three?"]
        );
        assert_eq!(split_sentences("No terminator"), vec!["No terminator"]);
        // A decimal point is not a sentence boundary.
        assert_eq!(split_sentences("Version 1.5 shipped"), vec!["Version 1.5 shipped"]);
    }

    #[test]
    fn test_fallback_outline_sections_by_heading() {
        let slides = fallback_outline(
            "## Concepts\nValues have one owner. Borrows are temporary.\n## Tips\n- go slow",
        );
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Concepts");
        assert_eq!(slides[0].bullets.len(), 2);
        assert_eq!(slides[1].title, "Tips");
        assert_eq!(slides[1].bullets, vec!["go slow"]);
    }

    #[test]
    fn test_fallback_outline_chunks_long_sections() {
        let body = (1..=20)
            .map(|i| format!("- bullet number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let slides = fallback_outline(&body);
        assert!(slides.len() >= 3);
        assert!(slides.iter().all(|s| s.bullets.len() <= MAX_BULLETS_PER_SLIDE));
    }

    #[test]
    fn test_fallback_outline_never_empty() {
        let slides = fallback_outline("");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "Overview");
    }

    #[tokio::test]
    async fn test_model_outline_is_preferred() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let outline = r#"[{"title": "Core Ideas", "bullets": ["one", "two", "three", "four"]}]"#;
        let llm = ScriptedClient::new(vec![Ok(outline.to_string())]);

        let reports = generate_slides(&llm, &store, &sample_document()).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].ok);

        let content =
            std::fs::read_to_string(tmp.path().join("ppts/rust/rust-week-01-slides.md")).unwrap();
        assert!(content.contains("## Slide 1: Core Ideas"));
        assert!(content.contains("- one"));
    }

    #[tokio::test]
    async fn test_unusable_model_output_falls_back_deterministically() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let llm = ScriptedClient::new(vec![Ok("not json".to_string())]);

        let reports = generate_slides(&llm, &store, &sample_document()).await;
        assert!(reports[0].ok);
        let content =
            std::fs::read_to_string(tmp.path().join("ppts/rust/rust-week-01-slides.md")).unwrap();
        assert!(content.contains("Concepts"));
        assert!(content.contains("Values have one owner."));
    }
}
