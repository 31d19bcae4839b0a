use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Loaded once at startup and threaded through `AppState` — no module
/// reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Root directory for rendered artifacts (category/slug tree).
    pub output_dir: String,
    /// Per-call timeout for the generation client, in seconds.
    pub llm_timeout_secs: u64,
    /// Bound on one full pipeline run, in seconds.
    pub run_timeout_secs: u64,
    /// Iteration cap for the deep-content loop stage.
    pub loop_max_iterations: u32,
    /// Whether the structured-text builder call is search-grounded.
    pub builder_grounding: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "generated".to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 300)?,
            run_timeout_secs: parse_env("RUN_TIMEOUT_SECS", 3600)?,
            loop_max_iterations: parse_env("LOOP_MAX_ITERATIONS", 8)?,
            builder_grounding: std::env::var("BUILDER_GROUNDING")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value")),
        Err(_) => Ok(default),
    }
}
