use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One end-to-end generation run. Created once per course request; never
/// mutated after creation except through its event log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// One LLM round-trip record. Immutable once written; `ordinal` is the
/// definitive chronological order within a session (most-recent-wins when
/// later stages resolve conflicting information).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageEventRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub author: String,
    pub ordinal: i64,
    /// Ordered text fragments, stored as a JSON array of strings.
    pub text_parts: Value,
    pub created_at: DateTime<Utc>,
}

impl StageEventRow {
    /// Joins the text fragments into one string, skipping non-string parts.
    pub fn text(&self) -> String {
        self.text_parts
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

/// Persisted pipeline run state machine, doubling as the idempotent
/// completion marker consulted by the status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineRunRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub status: String,
    pub last_completed_stage: Option<String>,
    pub failed_stage: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_event_text_joins_parts() {
        let event = StageEventRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            author: "course_designer".to_string(),
            ordinal: 1,
            text_parts: json!(["first fragment", "second fragment"]),
            created_at: Utc::now(),
        };
        assert_eq!(event.text(), "first fragment second fragment");
    }

    #[test]
    fn test_stage_event_text_tolerates_non_array_parts() {
        let event = StageEventRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            author: "content_generator".to_string(),
            ordinal: 2,
            text_parts: json!({"unexpected": "shape"}),
            created_at: Utc::now(),
        };
        assert_eq!(event.text(), "");
    }
}
