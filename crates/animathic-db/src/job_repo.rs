//! Work queue backed by the `jobs` table: claim via
//! `SELECT ... FOR UPDATE SKIP LOCKED` instead of a separate broker (spec
//! §4.9, §5 back-pressure).

use animathic_models::job::{Job, JobError, JobId, JobState};
use animathic_models::ErrorKind;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::DbResult;

#[derive(FromRow)]
struct JobRow {
    job_id: String,
    user_id: String,
    prompt: String,
    video_id: Option<uuid::Uuid>,
    state: String,
    result_url: Option<String>,
    error_kind: Option<String>,
    error_message: Option<String>,
    deadline_s: i64,
    attempt_budget: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: JobId::from_string(row.job_id),
            user_id: row.user_id,
            prompt: row.prompt,
            state: parse_state(&row.state),
            attempts: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            result_url: row.result_url,
            error: match (row.error_kind, row.error_message) {
                (Some(kind), Some(message)) => Some(JobError::new(parse_error_kind(&kind), message)),
                _ => None,
            },
            video_id: row.video_id.map(|v| v.to_string()),
            deadline_s: row.deadline_s,
            attempt_budget: row.attempt_budget as u32,
        }
    }
}

fn parse_state(s: &str) -> JobState {
    match s {
        "llm_generating" => JobState::LlmGenerating,
        "synthesizing" => JobState::Synthesizing,
        "validating" => JobState::Validating,
        "rendering" => JobState::Rendering,
        "uploading" => JobState::Uploading,
        "persisting" => JobState::Persisting,
        "completed" => JobState::Completed,
        "failed" => JobState::Failed,
        _ => JobState::Queued,
    }
}

fn parse_error_kind(s: &str) -> ErrorKind {
    match s {
        "invalid_prompt" => ErrorKind::InvalidPrompt,
        "llm_unavailable" => ErrorKind::LlmUnavailable,
        "llm_malformed" => ErrorKind::LlmMalformed,
        "llm_refused" => ErrorKind::LlmRefused,
        "llm_exhausted" => ErrorKind::LlmExhausted,
        "unknown_vocabulary" => ErrorKind::UnknownVocabulary,
        "banned_symbol" => ErrorKind::BannedSymbol,
        "schema" => ErrorKind::Schema,
        "shape" => ErrorKind::Shape,
        "too_large" => ErrorKind::TooLarge,
        "render_timeout" => ErrorKind::RenderTimeout,
        "render_failed" => ErrorKind::RenderFailed,
        "no_output_artifact" => ErrorKind::NoOutputArtifact,
        "upload_failed" => ErrorKind::UploadFailed,
        "db_failed" => ErrorKind::DbFailed,
        "deadline_exceeded" => ErrorKind::DeadlineExceeded,
        "cancelled" => ErrorKind::Cancelled,
        "busy" => ErrorKind::Busy,
        "auth" => ErrorKind::Auth,
        "not_found" => ErrorKind::NotFound,
        "forbidden" => ErrorKind::Forbidden,
        _ => ErrorKind::Exhausted,
    }
}

pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly created job in `queued` state.
    pub async fn enqueue(&self, job: &Job) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO jobs (job_id, user_id, prompt, state, deadline_s, attempt_budget, created_at, updated_at) \
             VALUES ($1, $2, $3, 'queued', $4, $5, $6, $7)",
        )
        .bind(job.id.as_str())
        .bind(&job.user_id)
        .bind(&job.prompt)
        .bind(job.deadline_s)
        .bind(job.attempt_budget as i32)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of jobs not yet in a terminal state, for admission control
    /// against `queue_max` (spec §5, default 16).
    pub async fn count_active(&self) -> DbResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE state NOT IN ('completed', 'failed')")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Claim one queued (or crashed-and-abandoned) job for `worker_id`.
    /// `SELECT ... FOR UPDATE SKIP LOCKED` lets concurrent workers race the
    /// same table without blocking each other (spec §4.9 single-writer
    /// discipline: once claimed, only this worker mutates the row).
    pub async fn claim_next(&self, worker_id: &str) -> DbResult<Option<Job>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<JobRow> = sqlx::query_as(
            "SELECT job_id, user_id, prompt, video_id, state, result_url, error_kind, error_message, \
             deadline_s, attempt_budget, created_at, updated_at FROM jobs \
             WHERE state = 'queued' \
             ORDER BY created_at ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE jobs SET claimed_by = $1, claimed_at = now(), updated_at = now() WHERE job_id = $2")
            .bind(worker_id)
            .bind(&row.job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    /// Persist the coordinator's current view of a job (spec §4.9: the
    /// coordinator is the sole writer of its own job row). `attempt_count`
    /// denormalizes `job.retryable_attempt_count()` so the status endpoint
    /// can read it without reconstructing the full attempt history (which
    /// lives in `generation_logs`, not this table).
    pub async fn update(&self, job: &Job) -> DbResult<()> {
        let (error_kind, error_message) = match &job.error {
            Some(e) => (Some(e.kind.as_str().to_string()), Some(e.message.clone())),
            None => (None, None),
        };
        let video_id = job
            .video_id
            .as_ref()
            .and_then(|v| uuid::Uuid::parse_str(v).ok());

        sqlx::query(
            "UPDATE jobs SET state = $1, result_url = $2, error_kind = $3, error_message = $4, \
             video_id = $5, attempt_count = $6, updated_at = now() WHERE job_id = $7",
        )
        .bind(job.state.as_str())
        .bind(&job.result_url)
        .bind(error_kind)
        .bind(error_message)
        .bind(video_id)
        .bind(job.retryable_attempt_count() as i32)
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a single job by id, regardless of claim state, along with its
    /// denormalized attempt count. Used by the status endpoint; callers are
    /// responsible for the ownership check.
    pub async fn get(&self, job_id: &str) -> DbResult<Option<(Job, i32)>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            job: JobRow,
            attempt_count: i32,
        }

        let row: Option<Row> = sqlx::query_as(
            "SELECT job_id, user_id, prompt, video_id, state, result_url, error_kind, error_message, \
             deadline_s, attempt_budget, attempt_count, created_at, updated_at FROM jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.job.into(), r.attempt_count)))
    }

    /// Jobs claimed more than `idle_secs` ago and still non-terminal: the
    /// crash-recovery sweep target (spec §10.6 stale-job detection).
    pub async fn find_stale(&self, idle_secs: i64) -> DbResult<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT job_id, user_id, prompt, video_id, state, result_url, error_kind, error_message, \
             deadline_s, attempt_budget, created_at, updated_at FROM jobs \
             WHERE state NOT IN ('completed', 'failed') \
             AND claimed_at IS NOT NULL \
             AND claimed_at < now() - make_interval(secs => $1)",
        )
        .bind(idle_secs as f64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_states() {
        assert_eq!(parse_state("rendering"), JobState::Rendering);
        assert_eq!(parse_state("completed"), JobState::Completed);
        assert_eq!(parse_state("garbage"), JobState::Queued);
    }

    #[test]
    fn parses_known_error_kinds() {
        assert_eq!(parse_error_kind("render_timeout"), ErrorKind::RenderTimeout);
        assert_eq!(parse_error_kind("garbage"), ErrorKind::Exhausted);
    }
}
