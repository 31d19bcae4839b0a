//! Post-generation material jobs: quizzes, flashcards, and slide outlines.
//!
//! Each job reads the finalized, immutable course document and corpus, so
//! the jobs are independent and run concurrently. A failed item is reported
//! per category and never aborts the others.

pub mod flashcards;
pub mod prompts;
pub mod quizzes;
pub mod slides;

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use crate::assembly::sink::DocumentSink;
use crate::assembly::{CourseDocument, RenderReport};
use crate::llm_client::GenerationClient;
use crate::models::course::CourseConfigRow;
use crate::storage::ArtifactStore;

/// Renders every artifact category for one assembled course: course
/// material through the sink, plus the quiz, flashcard, and slide jobs.
pub async fn render_all(
    llm: Arc<dyn GenerationClient>,
    sink: Arc<dyn DocumentSink>,
    store: ArtifactStore,
    config: CourseConfigRow,
    document: CourseDocument,
    corpus: String,
) -> Vec<RenderReport> {
    let document = Arc::new(document);
    let config = Arc::new(config);
    let corpus = Arc::new(corpus);

    let mut jobs: JoinSet<Vec<RenderReport>> = JoinSet::new();

    {
        let sink = sink.clone();
        let document = document.clone();
        jobs.spawn(async move { sink.render(&document).await });
    }
    {
        let llm = llm.clone();
        let store = store.clone();
        let config = config.clone();
        let corpus = corpus.clone();
        let document = document.clone();
        jobs.spawn(async move {
            quizzes::generate_quizzes(llm.as_ref(), &store, &config, &corpus, &document.slug).await
        });
    }
    {
        let llm = llm.clone();
        let store = store.clone();
        let config = config.clone();
        let corpus = corpus.clone();
        let document = document.clone();
        jobs.spawn(async move {
            flashcards::generate_flashcards(llm.as_ref(), &store, &config, &corpus, &document)
                .await
        });
    }
    {
        let store = store.clone();
        let document = document.clone();
        jobs.spawn(
            async move { slides::generate_slides(llm.as_ref(), &store, &document).await },
        );
    }

    let mut reports = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok(mut batch) => reports.append(&mut batch),
            Err(e) => {
                warn!("Render job panicked: {e}");
                reports.push(RenderReport::failure("render-job", e));
            }
        }
    }
    reports
}
