//! Generation client — the single point of entry for all model calls.
//!
//! ARCHITECTURAL RULE: no other module may call the hosted model API
//! directly. All generation goes through [`GenerationClient`], so the
//! pipeline, the structured-text builder, and the material jobs can all be
//! driven by a scripted fake in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The model used for all generation calls.
/// Intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.5-flash";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Model returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Whether a stage may retry this call with the same inputs.
    /// Timeouts, rate limits, server errors, and malformed responses are
    /// retryable; definitive 4xx rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Parse(_) => true,
            LlmError::RateLimited { .. } => true,
            LlmError::EmptyContent => true,
        }
    }
}

/// One generation call: a system instruction, ordered context parts, and
/// whether the call is augmented with live web search.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub parts: Vec<String>,
    pub grounding: bool,
}

/// Normalized model output. The vendor response shape is flattened into
/// plain text exactly once, in [`extract_text`].
#[derive(Debug, Clone)]
pub struct TextResult {
    pub text: String,
}

/// Capability abstraction over the hosted model.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<TextResult, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    web_search_queries: Vec<String>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<GroundingWeb>,
}

#[derive(Debug, Deserialize)]
struct GroundingWeb {
    title: Option<String>,
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    error: GeminiApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiApiErrorBody {
    message: String,
}

/// Normalizes the vendor response shape (candidates → content → parts →
/// text) into plain text. This is the only place that flexibility lives.
fn extract_text(response: &GeminiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let content = candidate.content.as_ref()?;
    let joined = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Production client
// ────────────────────────────────────────────────────────────────────────────

/// The hosted-model client used in production.
/// Wraps the Gemini generateContent API with retry logic and an optional
/// search-grounding tool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    async fn call_once(&self, body: &GeminiRequest) -> Result<TextResult, LlmError> {
        let url = format!("{GEMINI_API_BASE}/models/{MODEL}:generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiApiError>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;

        if let Some(metadata) = parsed
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
        {
            if !metadata.web_search_queries.is_empty() {
                debug!("Grounding queries: {:?}", metadata.web_search_queries);
            }
            for chunk in &metadata.grounding_chunks {
                if let Some(web) = &chunk.web {
                    debug!(
                        "Grounding source: {} ({})",
                        web.title.as_deref().unwrap_or("untitled"),
                        web.uri.as_deref().unwrap_or("no uri"),
                    );
                }
            }
        }

        let text = extract_text(&parsed).ok_or(LlmError::EmptyContent)?;
        Ok(TextResult { text })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    /// Makes a generation call, retrying on 429/5xx/transport errors with
    /// exponential backoff.
    async fn generate(&self, request: GenerationRequest) -> Result<TextResult, LlmError> {
        let tools = if request.grounding {
            vec![GeminiTool {
                google_search: serde_json::Map::new(),
            }]
        } else {
            vec![]
        };

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(request.system.clone()),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: request
                    .parts
                    .iter()
                    .map(|p| GeminiPart {
                        text: Some(p.clone()),
                    })
                    .collect(),
            }],
            tools,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Generation attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.call_once(&body).await {
                Ok(result) => {
                    debug!("Generation call succeeded: {} chars", result.text.len());
                    return Ok(result);
                }
                Err(e) if e.is_retryable() => {
                    warn!("Generation API error: {e}");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted fake for tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Test double that replays a fixed script of responses and records
    /// every request it receives.
    pub struct ScriptedClient {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedClient {
        pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A client whose every call fails as if the service were down.
        pub fn unreachable() -> Self {
            Self::new(vec![])
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(&self, request: GenerationRequest) -> Result<TextResult, LlmError> {
            self.requests.lock().unwrap().push(request);
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(TextResult { text }),
                Some(Err(e)) => Err(e),
                None => Err(LlmError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "first"}, {"text": "  "}, {"text": "second"}]
                }
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(&response).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_extract_text_empty_candidates_is_none() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_extract_text_whitespace_only_is_none() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_rate_limit_is_retryable_but_client_error_is_not() {
        assert!(LlmError::Api {
            status: 429,
            message: String::new()
        }
        .is_retryable());
        assert!(LlmError::Api {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(LlmError::EmptyContent.is_retryable());
    }

    #[test]
    fn test_request_serializes_grounding_tool_only_when_enabled() {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some("system".to_string()),
                }],
            },
            contents: vec![],
            tools: vec![],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("googleSearch"));

        let body = GeminiRequest {
            tools: vec![GeminiTool {
                google_search: serde_json::Map::new(),
            }],
            ..body
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("googleSearch"));
    }
}
