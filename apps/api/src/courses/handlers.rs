//! Upload, status, listing, and download handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::courses::store::{latest_config, save_config, NewCourseConfig};
use crate::errors::AppError;
use crate::ingest::extract_pdf_text;
use crate::models::course::{parse_duration_weeks, CourseConfigRow, DifficultyLevel, TeachingStyle};
use crate::state::AppState;
use crate::storage::{ArtifactEntry, Category};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
    pub config: CourseConfigRow,
}

/// POST /upload-curriculum
/// Multipart: a `file` part (PDF) plus the course configuration fields.
/// Invalid fields, wrong file types, and unextractable PDFs are 400s; the
/// pipeline is never invoked on an unvalidated config.
pub async fn handle_upload_curriculum(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Bytes> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed reading upload: {e}")))?,
            );
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed reading field '{name}': {e}")))?;
            fields.insert(name, value);
        }
    }

    let file_name =
        file_name.ok_or_else(|| AppError::Validation("A curriculum file is required".to_string()))?;
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation("Only PDF files are allowed".to_string()));
    }
    let file_bytes = file_bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("The uploaded file is empty".to_string()))?;

    let required = |key: &str| -> Result<String, AppError> {
        fields
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation(format!("Missing required field '{key}'")))
    };

    let user_name = required("user_name")?;
    let user_id = required("user_id")?;
    let course_topic = required("course_topic")?;
    let duration_raw = required("no_of_weeks")?;
    let difficulty = DifficultyLevel::parse(&required("difficulty_level")?)
        .map_err(AppError::Validation)?;
    let teaching_style =
        TeachingStyle::parse(&required("teaching_style")?).map_err(AppError::Validation)?;

    let curriculum_text = extract_pdf_text(&file_bytes).map_err(AppError::Validation)?;

    let config = save_config(
        &state.db,
        NewCourseConfig {
            user_id,
            user_name,
            course_topic,
            difficulty_level: difficulty.as_str().to_string(),
            teaching_style: teaching_style.as_str().to_string(),
            duration_weeks: parse_duration_weeks(&duration_raw),
            duration_raw,
            curriculum_text,
        },
    )
    .await?;

    info!(
        "Saved configuration for '{}' ({} chars of curriculum)",
        config.course_topic,
        config.curriculum_text.len()
    );

    Ok(Json(UploadResponse {
        message: "File uploaded and configuration saved successfully".to_string(),
        file_name,
        config,
    }))
}

/// GET /status — readiness for generation.
pub async fn handle_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let config = latest_config(&state.db).await?;
    let config_uploaded = config.is_some();
    let curriculum_uploaded = config
        .as_ref()
        .map(|c| !c.curriculum_text.trim().is_empty())
        .unwrap_or(false);

    Ok(Json(json!({
        "config_uploaded": config_uploaded,
        "curriculum_uploaded": curriculum_uploaded,
        "ready_for_generation": config_uploaded && curriculum_uploaded,
        "user_config": config,
    })))
}

/// GET /generation/status — the persisted completion marker, safe to poll
/// across restarts.
pub async fn handle_generation_status(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let run = state.store.latest_run().await?;
    let completed = run
        .as_ref()
        .map(|r| r.completed_at.is_some())
        .unwrap_or(false);

    Ok(Json(json!({
        "completed": completed,
        "completed_at": run.as_ref().and_then(|r| r.completed_at),
        "status": run.as_ref().map(|r| r.status.clone()),
        "last_completed_stage": run.as_ref().and_then(|r| r.last_completed_stage.clone()),
        "failed_stage": run.as_ref().and_then(|r| r.failed_stage.clone()),
    })))
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub category: Category,
    pub files: Vec<ArtifactEntry>,
    pub total: usize,
}

/// GET /files/:category
pub async fn handle_list_files(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<FileListResponse>, AppError> {
    let category = parse_category(&category)?;
    let files = state.artifacts.list_category(category).await?;
    Ok(Json(FileListResponse {
        category,
        total: files.len(),
        files,
    }))
}

/// GET /download/:category/:filename
pub async fn handle_download(
    State(state): State<AppState>,
    Path((category, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    if !is_safe_filename(&filename) {
        return Err(AppError::Validation("Invalid filename".to_string()));
    }
    let category = parse_category(&category)?;

    let path = state
        .artifacts
        .find_file(category, &filename)
        .await
        .ok_or_else(|| AppError::NotFound(format!("File '{filename}' not found")))?;
    let body = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub slug: String,
    pub updated: Option<chrono::DateTime<chrono::Utc>>,
    pub categories: HashMap<&'static str, usize>,
}

/// GET /courses — generated content grouped by course slug.
pub async fn handle_list_courses(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let mut courses: Vec<CourseSummary> = Vec::new();
    for slug in state.artifacts.course_slugs().await? {
        let mut categories = HashMap::new();
        let mut updated = None;
        for category in Category::ALL {
            let entries = state.artifacts.list_course(category, &slug).await?;
            categories.insert(category.as_str(), entries.len());
            if let Some(latest) = entries.iter().map(|e| e.modified).max() {
                updated = Some(updated.map_or(latest, |u: chrono::DateTime<chrono::Utc>| {
                    u.max(latest)
                }));
            }
        }
        courses.push(CourseSummary {
            slug,
            updated,
            categories,
        });
    }
    courses.sort_by(|a, b| b.updated.cmp(&a.updated));

    Ok(Json(json!({ "total": courses.len(), "courses": courses })))
}

/// GET /courses/:slug — files per category for one course.
pub async fn handle_course_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.artifacts.course_slugs().await?.contains(&slug) {
        return Err(AppError::NotFound(format!("Course '{slug}' not found")));
    }

    let mut detail = serde_json::Map::new();
    detail.insert("slug".to_string(), json!(slug.clone()));
    for category in Category::ALL {
        let entries: Vec<Value> = state
            .artifacts
            .list_course(category, &slug)
            .await?
            .into_iter()
            .map(|e| {
                json!({
                    "name": e.name,
                    "size": e.size,
                    "modified": e.modified,
                    "ext": e.ext,
                    "download_url": format!("/download/{}/{}", category.as_str(), e.name),
                })
            })
            .collect();
        detail.insert(category.as_str().replace('-', "_"), json!(entries));
    }

    Ok(Json(Value::Object(detail)))
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    Category::parse(raw).ok_or_else(|| AppError::Validation(format!("Invalid category '{raw}'")))
}

/// Path traversal guard: artifact names never contain separators.
fn is_safe_filename(name: &str) -> bool {
    !(name.contains('/') || name.contains('\\') || name.contains(".."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_rejects_unknown_values() {
        assert!(parse_category("course-material").is_ok());
        assert!(parse_category("secrets").is_err());
    }

    #[test]
    fn test_download_filename_guard() {
        for bad in ["../etc/passwd", "a/b.md", "a\\b.md", ".."] {
            assert!(!is_safe_filename(bad), "guard must reject {bad}");
        }
        assert!(is_safe_filename("rust-week-01.md"));
    }
}
