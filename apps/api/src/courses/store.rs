//! Course configuration persistence. Each submission writes a new row; the
//! most recent row is the active configuration.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::course::CourseConfigRow;

pub struct NewCourseConfig {
    pub user_id: String,
    pub user_name: String,
    pub course_topic: String,
    pub difficulty_level: String,
    pub teaching_style: String,
    pub duration_weeks: Option<u32>,
    pub duration_raw: String,
    pub curriculum_text: String,
}

pub async fn save_config(pool: &PgPool, config: NewCourseConfig) -> Result<CourseConfigRow> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO course_configs
            (id, user_id, user_name, course_topic, difficulty_level,
             teaching_style, duration_weeks, duration_raw, curriculum_text)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(&config.user_id)
    .bind(&config.user_name)
    .bind(&config.course_topic)
    .bind(&config.difficulty_level)
    .bind(&config.teaching_style)
    .bind(config.duration_weeks.map(|w| w as i32))
    .bind(&config.duration_raw)
    .bind(&config.curriculum_text)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, CourseConfigRow>("SELECT * FROM course_configs WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// The active configuration: the most recently saved row.
pub async fn latest_config(pool: &PgPool) -> Result<Option<CourseConfigRow>> {
    Ok(sqlx::query_as::<_, CourseConfigRow>(
        "SELECT * FROM course_configs ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?)
}
