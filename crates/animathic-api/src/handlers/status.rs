//! `GET /api/status/{job_id}` (spec §6): poll-based job status, the only
//! way a client learns a generation finished short of re-listing videos.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use animathic_models::ErrorKind;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: String,
    pub attempt: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusError>,
}

#[derive(Debug, Serialize)]
pub struct StatusError {
    pub kind: ErrorKind,
    pub message: String,
}

/// `GET /api/status/{job_id}` -> `{ state, attempt, url?, error? }`.
///
/// A job owned by someone else is reported `not_found`, not `forbidden`,
/// so that job ids don't double as an existence oracle for other users.
pub async fn get_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let (job, attempt_count) = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;

    if job.user_id != user.user_id {
        return Err(ApiError::not_found(format!("job {job_id}")));
    }

    Ok(Json(StatusResponse {
        state: job.state.as_str().to_string(),
        attempt: attempt_count,
        url: job.result_url,
        error: job.error.map(|e| StatusError {
            kind: e.kind,
            message: e.message,
        }),
    }))
}
