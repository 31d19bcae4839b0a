//! Rendered-artifact storage: a local directory tree partitioned by
//! category and course slug. Filenames are derived deterministically from
//! slug + category + week number, so repeated runs overwrite instead of
//! accumulating duplicates.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

/// Artifact category, doubling as the directory name under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    CourseMaterial,
    Quizzes,
    Ppts,
    Flashcards,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::CourseMaterial,
        Category::Quizzes,
        Category::Ppts,
        Category::Flashcards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CourseMaterial => "course-material",
            Category::Quizzes => "quizzes",
            Category::Ppts => "ppts",
            Category::Flashcards => "flashcards",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "course-material" => Some(Category::CourseMaterial),
            "quizzes" => Some(Category::Quizzes),
            "ppts" => Some(Category::Ppts),
            "flashcards" => Some(Category::Flashcards),
            _ => None,
        }
    }
}

/// One produced output file.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedArtifact {
    pub category: Category,
    pub filename: String,
    pub course_slug: String,
    pub week_number: Option<u32>,
    pub size: u64,
}

/// Listing entry for the read-only file endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub course_slug: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub ext: String,
}

/// Deterministic, filesystem-safe identifier derived from a course title.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the category directories up front so listing endpoints work
    /// before the first generation run.
    pub async fn ensure_layout(&self) -> std::io::Result<()> {
        for category in Category::ALL {
            fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    /// Writes one text artifact under `<root>/<category>/<slug>/<filename>`,
    /// overwriting any previous run's file.
    pub async fn write_text(
        &self,
        category: Category,
        slug: &str,
        filename: &str,
        week_number: Option<u32>,
        content: &str,
    ) -> std::io::Result<RenderedArtifact> {
        let dir = self.category_dir(category).join(slug);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(filename);
        fs::write(&path, content).await?;
        Ok(RenderedArtifact {
            category,
            filename: filename.to_string(),
            course_slug: slug.to_string(),
            week_number,
            size: content.len() as u64,
        })
    }

    /// Lists every artifact in a category across all course slugs, newest
    /// first.
    pub async fn list_category(&self, category: Category) -> std::io::Result<Vec<ArtifactEntry>> {
        let dir = self.category_dir(category);
        let mut entries = Vec::new();
        let Ok(mut slugs) = fs::read_dir(&dir).await else {
            return Ok(entries);
        };
        while let Some(slug_entry) = slugs.next_entry().await? {
            if !slug_entry.file_type().await?.is_dir() {
                continue;
            }
            let slug = slug_entry.file_name().to_string_lossy().to_string();
            let mut files = fs::read_dir(slug_entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let metadata = file.metadata().await?;
                if !metadata.is_file() {
                    continue;
                }
                let name = file.file_name().to_string_lossy().to_string();
                entries.push(ArtifactEntry {
                    ext: Path::new(&name)
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                        .unwrap_or_default(),
                    name,
                    course_slug: slug.clone(),
                    size: metadata.len(),
                    modified: metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now()),
                });
            }
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Resolves a filename within a category to its path, searching every
    /// course slug directory. Callers must reject path separators first.
    pub async fn find_file(&self, category: Category, filename: &str) -> Option<PathBuf> {
        let dir = self.category_dir(category);
        let mut slugs = fs::read_dir(&dir).await.ok()?;
        while let Ok(Some(slug_entry)) = slugs.next_entry().await {
            let candidate = slug_entry.path().join(filename);
            if fs::metadata(&candidate).await.map(|m| m.is_file()).unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// All course slugs present in any category.
    pub async fn course_slugs(&self) -> std::io::Result<Vec<String>> {
        let mut slugs = Vec::new();
        for category in Category::ALL {
            let Ok(mut dir) = fs::read_dir(self.category_dir(category)).await else {
                continue;
            };
            while let Some(entry) = dir.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    let slug = entry.file_name().to_string_lossy().to_string();
                    if !slugs.contains(&slug) {
                        slugs.push(slug);
                    }
                }
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Artifacts for one course slug in one category.
    pub async fn list_course(
        &self,
        category: Category,
        slug: &str,
    ) -> std::io::Result<Vec<ArtifactEntry>> {
        Ok(self
            .list_category(category)
            .await?
            .into_iter()
            .filter(|e| e.course_slug == slug)
            .collect())
    }
}
