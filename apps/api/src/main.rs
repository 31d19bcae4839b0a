mod assembly;
mod config;
mod courses;
mod db;
mod errors;
mod ingest;
mod llm_client;
mod materials;
mod models;
mod pipeline;
mod routes;
mod segmentation;
mod state;
mod storage;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assembly::sink::MarkdownSink;
use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::ArtifactStore;
use crate::store::{pg::PgStateStore, SessionLocks};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Instructor Copilot API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize PostgreSQL and bootstrap the schema
    let pool = create_pool(&config.database_url).await?;
    init_schema(&pool).await?;

    // Artifact directory tree
    let artifacts = ArtifactStore::new(&config.output_dir);
    artifacts.ensure_layout().await?;
    info!("Artifact store ready at '{}'", config.output_dir);

    // Generation client
    let llm = GeminiClient::new(config.gemini_api_key.clone(), config.llm_timeout_secs);
    info!("Generation client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        db: pool.clone(),
        llm: Arc::new(llm),
        store: Arc::new(PgStateStore::new(pool)),
        sink: Arc::new(MarkdownSink::new(artifacts.clone())),
        artifacts,
        locks: SessionLocks::new(),
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
