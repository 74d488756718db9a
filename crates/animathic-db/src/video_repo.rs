//! Video row repository (spec §4.8). Every query is scoped by `user_id`;
//! row-level security is enforced by unconditional `WHERE user_id = $1`
//! predicates rather than relying on the store alone.

use animathic_models::video::{Video, VideoId, VideoStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(FromRow)]
struct VideoRow {
    video_id: Uuid,
    user_id: String,
    prompt: String,
    object_key: Option<String>,
    file_size: Option<i64>,
    duration_s: Option<f64>,
    width: Option<i32>,
    height: Option<i32>,
    status: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            video_id: VideoId::from_string(row.video_id.to_string()),
            user_id: row.user_id,
            prompt: row.prompt,
            object_key: row.object_key,
            file_size: row.file_size,
            duration_s: row.duration_s,
            width: row.width,
            height: row.height,
            status: parse_status(&row.status),
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn parse_status(s: &str) -> VideoStatus {
    match s {
        "completed" => VideoStatus::Completed,
        "failed" => VideoStatus::Failed,
        "deleted" => VideoStatus::Deleted,
        _ => VideoStatus::Processing,
    }
}

/// Filters accepted by `list_videos` (spec §4.8).
#[derive(Debug, Clone, Default)]
pub struct VideoFilters {
    pub status: Option<VideoStatus>,
    pub limit: Option<i64>,
}

pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `create_video(user_id, prompt, status=processing) -> video_id`.
    pub async fn create_video(&self, user_id: &str, prompt: &str) -> DbResult<VideoId> {
        let video_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO videos (video_id, user_id, prompt, status, created_at, updated_at) \
             VALUES ($1, $2, $3, 'processing', now(), now())",
        )
        .bind(video_id)
        .bind(user_id)
        .bind(prompt)
        .execute(&self.pool)
        .await?;

        Ok(VideoId::from_string(video_id.to_string()))
    }

    pub async fn get(&self, user_id: &str, video_id: &VideoId) -> DbResult<Option<Video>> {
        let id = parse_video_id(video_id)?;
        let row: Option<VideoRow> = sqlx::query_as(
            "SELECT video_id, user_id, prompt, object_key, file_size, duration_s, width, height, \
             status, tags, created_at, updated_at FROM videos WHERE video_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// `update_video(video_id, { file metadata, status, generation_time_s })`
    /// — only the owning `user_id` may update.
    pub async fn update_video(
        &self,
        user_id: &str,
        video_id: &VideoId,
        object_key: &str,
        file_size: i64,
        duration_s: f64,
        width: i32,
        height: i32,
    ) -> DbResult<()> {
        let id = parse_video_id(video_id)?;
        let result = sqlx::query(
            "UPDATE videos SET object_key = $1, file_size = $2, duration_s = $3, width = $4, \
             height = $5, status = 'completed', updated_at = now() \
             WHERE video_id = $6 AND user_id = $7",
        )
        .bind(object_key)
        .bind(file_size)
        .bind(duration_s)
        .bind(width)
        .bind(height)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("video {video_id} for user {user_id}")));
        }
        Ok(())
    }

    pub async fn mark_failed(&self, user_id: &str, video_id: &VideoId) -> DbResult<()> {
        let id = parse_video_id(video_id)?;
        sqlx::query("UPDATE videos SET status = 'failed', updated_at = now() WHERE video_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `list_videos(user_id, filters)`.
    pub async fn list_videos(&self, user_id: &str, filters: &VideoFilters) -> DbResult<Vec<Video>> {
        let status_filter = filters.status.map(|s| s.as_str().to_string());
        let limit = filters.limit.unwrap_or(100);

        let rows: Vec<VideoRow> = sqlx::query_as(
            "SELECT video_id, user_id, prompt, object_key, file_size, duration_s, width, height, \
             status, tags, created_at, updated_at FROM videos \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(user_id)
        .bind(status_filter)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// `delete_video(user_id, video_id)`. The first call transitions the
    /// row to `deleted` and returns `Ok(())`; a second call on the same
    /// (now already-deleted) row returns `NotFound`, same as a truly
    /// absent or foreign row (spec §8 delete-idempotence property: two
    /// consecutive deletes return `ok` then `not_found`).
    pub async fn delete_video(&self, user_id: &str, video_id: &VideoId) -> DbResult<()> {
        let id = parse_video_id(video_id)?;
        let result = sqlx::query(
            "UPDATE videos SET status = 'deleted', updated_at = now() \
             WHERE video_id = $1 AND user_id = $2 AND status != 'deleted'",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("video {video_id} for user {user_id}")));
        }
        Ok(())
    }
}

fn parse_video_id(video_id: &VideoId) -> DbResult<Uuid> {
    Uuid::parse_str(video_id.as_str()).map_err(|e| DbError::not_found(format!("malformed video id: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!(parse_status("completed"), VideoStatus::Completed);
        assert_eq!(parse_status("failed"), VideoStatus::Failed);
        assert_eq!(parse_status("deleted"), VideoStatus::Deleted);
        assert_eq!(parse_status("processing"), VideoStatus::Processing);
        assert_eq!(parse_status("whatever"), VideoStatus::Processing);
    }
}
