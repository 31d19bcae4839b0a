use std::sync::Arc;

use sqlx::PgPool;

use crate::assembly::sink::DocumentSink;
use crate::config::Config;
use crate::llm_client::GenerationClient;
use crate::storage::ArtifactStore;
use crate::store::{SessionLocks, StateStore};

/// Shared application state injected into all route handlers via Axum
/// extractors. The generation client, state store, and document sink sit
/// behind trait objects so the pipeline can be exercised with fakes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: Arc<dyn GenerationClient>,
    pub store: Arc<dyn StateStore>,
    pub sink: Arc<dyn DocumentSink>,
    pub artifacts: ArtifactStore,
    /// At-most-one in-flight writer per session.
    pub locks: SessionLocks,
    pub config: Config,
}
