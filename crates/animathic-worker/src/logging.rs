//! Structured per-job logging.

use tracing::{error, info, warn};

use animathic_models::JobId;

/// Consistent, structured logging for a single job's lifecycle.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    pub fn log_transition(&self, from: &str, to: &str) {
        info!(job_id = %self.job_id, from, to, "job transitioned");
    }

    pub fn log_attempt(&self, phase: &str, outcome: &str) {
        info!(job_id = %self.job_id, phase, outcome, "attempt recorded");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, "{}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}
