//! `GET /api/videos`, `DELETE /api/videos/{id}`, `GET /api/videos/{id}/stream`
//! (spec §6, §4.8).

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};

use animathic_db::VideoFilters;
use animathic_models::video::{Video, VideoId, VideoStatus};
use animathic_storage::DeleteOutcome;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A presigned stream URL is valid for this long before it must be
/// re-requested (spec §6 doesn't mandate a value; picked to comfortably
/// outlast a single playback session without leaking a long-lived link).
const STREAM_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub video_id: String,
    pub prompt: String,
    pub status: String,
    pub object_key: Option<String>,
    pub file_size: Option<i64>,
    pub duration_s: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Video> for VideoResponse {
    fn from(v: Video) -> Self {
        Self {
            video_id: v.video_id.to_string(),
            prompt: v.prompt,
            status: v.status.as_str().to_string(),
            object_key: v.object_key,
            file_size: v.file_size,
            duration_s: v.duration_s,
            width: v.width,
            height: v.height,
            created_at: v.created_at.to_rfc3339(),
            updated_at: v.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListVideosResponse {
    pub videos: Vec<VideoResponse>,
}

fn parse_status(s: &str) -> ApiResult<VideoStatus> {
    match s {
        "processing" => Ok(VideoStatus::Processing),
        "completed" => Ok(VideoStatus::Completed),
        "failed" => Ok(VideoStatus::Failed),
        "deleted" => Ok(VideoStatus::Deleted),
        other => Err(ApiError::bad_request(format!("unknown status filter: {other}"))),
    }
}

/// `GET /api/videos?status=&limit=` -> the calling user's own videos.
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<ListVideosResponse>> {
    let filters = VideoFilters {
        status: query.status.map(|s| parse_status(&s)).transpose()?,
        limit: query.limit,
    };

    let videos = state.videos.list_videos(&user.user_id, &filters).await?;
    Ok(Json(ListVideosResponse {
        videos: videos.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteVideoResponse {
    pub ok: bool,
}

/// `DELETE /api/videos/{video_id}`: idempotent in result, not in effect —
/// a second call on an already-deleted video returns `not_found` (spec
/// §8). The DB row transitions first; storage deletion is best-effort and
/// never blocks the response on an adapter that's already forgotten the
/// key.
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<DeleteVideoResponse>> {
    let video_id = VideoId::from_string(video_id);
    let video = state
        .videos
        .get(&user.user_id, &video_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("video {video_id}")))?;

    state.videos.delete_video(&user.user_id, &video_id).await?;

    if let Some(object_key) = video.object_key {
        match state.storage.delete(&user.user_id, &object_key).await {
            Ok(DeleteOutcome::Ok | DeleteOutcome::NotFound) => {}
            Ok(DeleteOutcome::Forbidden) => {
                tracing::warn!(video_id = %video_id, "storage refused delete: key outside user prefix");
            }
            Err(e) => {
                tracing::warn!(video_id = %video_id, error = %e, "storage delete failed, db row already marked deleted");
            }
        }
    }

    Ok(Json(DeleteVideoResponse { ok: true }))
}

/// `GET /api/videos/{video_id}/stream`: redirects to a short-lived
/// presigned URL rather than proxying bytes through this service.
pub async fn stream_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Redirect> {
    let video_id = VideoId::from_string(video_id);
    let video = state
        .videos
        .get(&user.user_id, &video_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("video {video_id}")))?;

    let object_key = video
        .object_key
        .ok_or_else(|| ApiError::not_found(format!("video {video_id} has no stored artifact")))?;

    let url = state.storage.presign_get(&object_key, STREAM_URL_TTL).await?;
    Ok(Redirect::temporary(&url))
}
