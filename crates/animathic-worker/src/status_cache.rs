//! In-memory job status cache (spec §10.6): gives the status endpoint an
//! O(1) read without a database round-trip. Explicitly lossy — the
//! metadata store (`animathic-db`) remains the sole source of truth; a
//! worker restart simply drops the cache and readers fall back to the
//! database until it is repopulated.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use animathic_models::{ErrorKind, JobId, JobState};

#[derive(Debug, Clone)]
pub struct JobStatus {
    pub job_id: String,
    pub user_id: String,
    pub state: JobState,
    pub attempt: u32,
    pub result_url: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(job_id: &JobId, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            user_id: user_id.into(),
            state: JobState::Queued,
            attempt: 0,
            result_url: None,
            error_kind: None,
            error_message: None,
            started_at: now,
            updated_at: now,
            last_heartbeat: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// A non-terminal job is stale if it hasn't heartbeat in
    /// `threshold_secs`, or (if it never heartbeat at all) has been running
    /// longer than `grace_secs` (spec §10.6).
    pub fn is_stale(&self, threshold_secs: i64, grace_secs: i64) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self.last_heartbeat {
            Some(hb) => (Utc::now() - hb).num_seconds() > threshold_secs,
            None => (Utc::now() - self.started_at).num_seconds() > grace_secs,
        }
    }
}

/// Shared, lock-protected status table keyed by job id.
#[derive(Default)]
pub struct JobStatusCache {
    inner: RwLock<HashMap<String, JobStatus>>,
}

impl JobStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, status: JobStatus) {
        self.inner.write().expect("status cache lock poisoned").insert(status.job_id.clone(), status);
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.inner.read().expect("status cache lock poisoned").get(job_id).cloned()
    }

    pub fn update_state(&self, job_id: &str, state: JobState, attempt: u32) {
        let mut guard = self.inner.write().expect("status cache lock poisoned");
        if let Some(status) = guard.get_mut(job_id) {
            status.state = state;
            status.attempt = attempt;
            status.updated_at = Utc::now();
        }
    }

    pub fn record_heartbeat(&self, job_id: &str) {
        let mut guard = self.inner.write().expect("status cache lock poisoned");
        if let Some(status) = guard.get_mut(job_id) {
            status.last_heartbeat = Some(Utc::now());
            status.updated_at = Utc::now();
        }
    }

    pub fn complete(&self, job_id: &str, result_url: impl Into<String>) {
        let mut guard = self.inner.write().expect("status cache lock poisoned");
        if let Some(status) = guard.get_mut(job_id) {
            status.state = JobState::Completed;
            status.result_url = Some(result_url.into());
            status.updated_at = Utc::now();
        }
    }

    pub fn fail(&self, job_id: &str, kind: ErrorKind, message: impl Into<String>) {
        let mut guard = self.inner.write().expect("status cache lock poisoned");
        if let Some(status) = guard.get_mut(job_id) {
            status.state = JobState::Failed;
            status.error_kind = Some(kind);
            status.error_message = Some(message.into());
            status.updated_at = Utc::now();
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_job_is_not_stale() {
        let status = JobStatus::new(&JobId::new(), "user-1");
        assert!(!status.is_stale(60, 120));
    }

    #[test]
    fn terminal_job_is_never_stale() {
        let mut status = JobStatus::new(&JobId::new(), "user-1");
        status.state = JobState::Completed;
        status.started_at = Utc::now() - chrono::Duration::seconds(1000);
        assert!(!status.is_stale(60, 120));
    }

    #[test]
    fn cache_roundtrips_insert_and_get() {
        let cache = JobStatusCache::new();
        let job_id = JobId::new();
        cache.insert(JobStatus::new(&job_id, "user-1"));
        let fetched = cache.get(job_id.as_str()).unwrap();
        assert_eq!(fetched.state, JobState::Queued);

        cache.update_state(job_id.as_str(), JobState::Rendering, 1);
        assert_eq!(cache.get(job_id.as_str()).unwrap().state, JobState::Rendering);

        cache.complete(job_id.as_str(), "https://cdn.example.com/x.mp4");
        let done = cache.get(job_id.as_str()).unwrap();
        assert!(done.is_terminal());
        assert_eq!(done.result_url.as_deref(), Some("https://cdn.example.com/x.mp4"));
    }
}
