//! Document sink — renders an assembled course document into artifacts.
//!
//! The core's responsibility ends at producing well-formed, correctly
//! ordered structured text; format fidelity beyond that lives behind the
//! trait so alternative writers can be plugged in without touching the
//! pipeline.

use async_trait::async_trait;

use crate::assembly::structure::{parse_blocks, render_markdown};
use crate::assembly::{CourseDocument, RenderReport};
use crate::storage::{ArtifactStore, Category};

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Renders the course-material artifacts: one overview document plus one
    /// document per week. Individual failures are reported per item and
    /// never abort sibling renders.
    async fn render(&self, document: &CourseDocument) -> Vec<RenderReport>;
}

/// Filesystem sink writing markdown into the category/slug tree.
pub struct MarkdownSink {
    store: ArtifactStore,
}

impl MarkdownSink {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    fn overview_markdown(document: &CourseDocument) -> String {
        let mut out = format!("# {}\n\n## Course Overview\n\n", document.title);
        if !document.overview.is_empty() {
            out.push_str(&document.overview);
            out.push_str("\n\n");
        }
        out.push_str("## Weekly Summary\n\n");
        for bullet in &document.weekly_summary {
            out.push_str(&format!("- {bullet}\n"));
        }
        out
    }

    fn week_markdown(title: &str, week_number: u32, body: &str) -> String {
        format!(
            "# Week {week_number}: {title}\n\n{}\n",
            render_markdown(&parse_blocks(body))
        )
    }
}

#[async_trait]
impl DocumentSink for MarkdownSink {
    async fn render(&self, document: &CourseDocument) -> Vec<RenderReport> {
        let mut reports = Vec::with_capacity(document.weeks.len() + 1);

        let overview_name = format!("{}-course-overview.md", document.slug);
        let report = match self
            .store
            .write_text(
                Category::CourseMaterial,
                &document.slug,
                &overview_name,
                None,
                &Self::overview_markdown(document),
            )
            .await
        {
            Ok(artifact) => RenderReport::success("course-overview", artifact),
            Err(e) => RenderReport::failure("course-overview", e),
        };
        reports.push(report);

        for week in &document.weeks {
            let item = format!("week-{}", week.week_number);
            let filename = format!("{}-week-{:02}.md", document.slug, week.week_number);
            let content = Self::week_markdown(&week.title, week.week_number, &week.raw_body);
            let report = match self
                .store
                .write_text(
                    Category::CourseMaterial,
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::WeekBlock;

    fn sample_document() -> CourseDocument {
        CourseDocument {
            title: "Rust Basics".to_string(),
            slug: "rust-basics".to_string(),
            overview: "A short course.".to_string(),
            weekly_summary: vec!["Week 1: Syntax".to_string(), "Week 2: Ownership".to_string()],
            weeks: vec![
                WeekBlock {
                    week_number: 1,
                    title: "Syntax".to_string(),
                    raw_body: "## Goals\n- read code\n- write code".to_string(),
                    source_span: (0, 10),
                },
                WeekBlock {
                    week_number: 2,
                    title: "Ownership".to_string(),
                    raw_body: "Moves and borrows.".to_string(),
                    source_span: (10, 30),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_renders_overview_plus_one_file_per_week() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = MarkdownSink::new(ArtifactStore::new(tmp.path()));

        let reports = sink.render(&sample_document()).await;
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.ok));

        let names: Vec<String> = reports
            .iter()
            .filter_map(|r| r.artifact.as_ref().map(|a| a.filename.clone()))
            .collect();
        assert!(names.contains(&"rust-basics-course-overview.md".to_string()));
        assert!(names.contains(&"rust-basics-week-01.md".to_string()));
        assert!(names.contains(&"rust-basics-week-02.md".to_string()));
    }

    #[tokio::test]
    async fn test_week_files_carry_structured_content() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = MarkdownSink::new(ArtifactStore::new(tmp.path()));
        sink.render(&sample_document()).await;

        let week1 = tmp
            .path()
            .join("course-material/rust-basics/rust-basics-week-01.md");
        let content = std::fs::read_to_string(week1).unwrap();
        assert!(content.starts_with("# Week 1: Syntax"));
        assert!(content.contains("## Goals"));
        assert!(content.contains("- read code"));
    }
}
