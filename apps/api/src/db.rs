use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Bootstraps the schema. Every statement is idempotent so startup can run
/// it unconditionally.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS course_configs (
            id UUID PRIMARY KEY,
            user_id TEXT NOT NULL,
            user_name TEXT NOT NULL,
            course_topic TEXT NOT NULL,
            difficulty_level TEXT NOT NULL,
            teaching_style TEXT NOT NULL,
            duration_weeks INT,
            duration_raw TEXT NOT NULL,
            curriculum_text TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS session_state (
            session_id UUID NOT NULL REFERENCES sessions(id),
            state_key TEXT NOT NULL,
            seq BIGINT NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (session_id, state_key, seq)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS stage_events (
            id UUID PRIMARY KEY,
            session_id UUID NOT NULL REFERENCES sessions(id),
            author TEXT NOT NULL,
            ordinal BIGINT NOT NULL,
            text_parts JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (session_id, ordinal)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id UUID PRIMARY KEY,
            session_id UUID NOT NULL REFERENCES sessions(id),
            status TEXT NOT NULL,
            last_completed_stage TEXT,
            failed_stage TEXT,
            started_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            completed_at TIMESTAMPTZ
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema ready");
    Ok(())
}
