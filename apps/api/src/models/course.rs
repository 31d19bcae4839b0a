//! Course configuration — the user-chosen generation parameters.
//!
//! Difficulty and teaching style are closed enumerations; unknown values are
//! rejected at the boundary so the pipeline never runs on an unvalidated
//! config.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// The default style every course gets, combined with the selected one.
pub const DEFAULT_TEACHING_STYLE: &str = "Clear & Structured";

/// Course difficulty. Affects content depth, tone, and expected outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Foundational,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    /// Case-insensitive parse. Anything outside the closed set is an error,
    /// not a default.
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "foundational" => Ok(DifficultyLevel::Foundational),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            other => Err(format!(
                "Unknown difficulty level '{other}'. Expected one of: Foundational, Intermediate, Advanced"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Foundational => "Foundational",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected teaching style. Always applied on top of the implicit
/// [`DEFAULT_TEACHING_STYLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeachingStyle {
    ExploratoryGuided,
    ProjectBased,
    ConceptualConversational,
}

impl TeachingStyle {
    /// Parses the human-facing labels ("Exploratory & Guided",
    /// "Project-Based / Hands-On", "Conceptual & Conversational"), tolerating
    /// case and punctuation variation but nothing outside the closed set.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "exploratoryguided" => Ok(TeachingStyle::ExploratoryGuided),
            "projectbasedhandson" | "projectbased" | "handson" => Ok(TeachingStyle::ProjectBased),
            "conceptualconversational" => Ok(TeachingStyle::ConceptualConversational),
            _ => Err(format!(
                "Unknown teaching style '{}'. Expected one of: Exploratory & Guided, \
                 Project-Based / Hands-On, Conceptual & Conversational",
                raw.trim()
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeachingStyle::ExploratoryGuided => "Exploratory & Guided",
            TeachingStyle::ProjectBased => "Project-Based / Hands-On",
            TeachingStyle::ConceptualConversational => "Conceptual & Conversational",
        }
    }
}

impl fmt::Display for TeachingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)").expect("Invalid duration regex"));

/// Lenient week-count parse: the first base-10 integer in the string
/// ("8 weeks" → 8). Zero or unparsable values are unknown, not an error.
pub fn parse_duration_weeks(raw: &str) -> Option<u32> {
    DURATION_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|&n| n >= 1)
}

/// A validated course configuration, as persisted and as echoed back to the
/// caller. Overwritten per submission; the latest row per user wins.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseConfigRow {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub course_topic: String,
    pub difficulty_level: String,
    pub teaching_style: String,
    pub duration_weeks: Option<i32>,
    pub duration_raw: String,
    /// Extracted curriculum text — large, never echoed in responses.
    #[serde(skip_serializing)]
    pub curriculum_text: String,
    pub created_at: DateTime<Utc>,
}

impl CourseConfigRow {
    pub fn difficulty(&self) -> DifficultyLevel {
        // Stored values are canonical labels written by `as_str`.
        DifficultyLevel::parse(&self.difficulty_level).unwrap_or(DifficultyLevel::Intermediate)
    }

    pub fn style(&self) -> TeachingStyle {
        TeachingStyle::parse(&self.teaching_style).unwrap_or(TeachingStyle::ProjectBased)
    }

    pub fn duration(&self) -> Option<u32> {
        self.duration_weeks.and_then(|w| u32::try_from(w).ok())
    }

    /// Course parameters as the context header prepended to every stage call.
    pub fn prompt_header(&self) -> String {
        let duration = match self.duration() {
            Some(weeks) => format!("{weeks} weeks"),
            None => self.duration_raw.clone(),
        };
        format!(
            "COURSE TOPIC: {}\n\
             DIFFICULTY LEVEL: {}\n\
             TEACHING STYLE: {} (combined with the default {} approach)\n\
             DURATION: {}\n\
             INSTRUCTOR: {} ({})",
            self.course_topic,
            self.difficulty(),
            self.style(),
            DEFAULT_TEACHING_STYLE,
            duration,
            self.user_name,
            self.user_id,
        )
    }
}
