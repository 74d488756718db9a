//! Append-only `generation_logs` repository (spec §3, §4.8:
//! `log_attempt(video_id, GenerationAttempt)`).

use animathic_models::job::GenerationAttempt;
use animathic_models::video::VideoId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

pub struct GenerationLogRepository {
    pool: PgPool,
}

impl GenerationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log_attempt(&self, video_id: &VideoId, job_id: &str, attempt: &GenerationAttempt) -> DbResult<()> {
        let id = Uuid::parse_str(video_id.as_str()).map_err(|e| DbError::not_found(format!("malformed video id: {e}")))?;

        sqlx::query(
            "INSERT INTO generation_logs (video_id, job_id, attempt_no, backend, phase, started_at, \
             ended_at, outcome, error_kind, error_message, generated_source, spec_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(id)
        .bind(job_id)
        .bind(attempt.attempt_no as i32)
        .bind(&attempt.backend)
        .bind(attempt.phase.as_str())
        .bind(attempt.started_at)
        .bind(attempt.ended_at)
        .bind(attempt.outcome.map(|o| format!("{:?}", o)))
        .bind(attempt.error_kind.map(|k| k.as_str().to_string()))
        .bind(&attempt.error_message)
        .bind(&attempt.generated_source)
        .bind(&attempt.spec_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
