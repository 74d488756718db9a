//! `POST /api/generate` (spec §6): accepts a prompt, enqueues a job, and
//! returns its id immediately. The job coordinator (`animathic-worker`)
//! does the rest asynchronously.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use animathic_models::Job;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_PROMPT_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
}

/// `POST /api/generate`: `{ prompt }` + verified user id -> `{ job_id }`.
///
/// Rejects with `busy` when the number of non-terminal jobs already at or
/// above `queue_max` (spec §5 back-pressure).
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("prompt must not be empty"));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(ApiError::bad_request(format!("prompt exceeds {MAX_PROMPT_LENGTH} characters")));
    }

    let active = state.jobs.count_active().await?;
    if active >= state.config.queue_max {
        return Err(ApiError::Busy);
    }

    state.users.ensure_user(&user.user_id).await?;

    let job = Job::new(user.user_id.clone(), prompt.to_string());
    state.jobs.enqueue(&job).await?;

    info!(job_id = %job.id, user_id = %user.user_id, "job enqueued");
    Ok(Json(GenerateResponse { job_id: job.id.to_string() }))
}
