//! Worker configuration (spec §6 "Configuration (recognized options)").

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// `worker_concurrency`: max jobs claimed and run at once.
    pub concurrency: usize,
    /// `queue_max`: jobs queued beyond this are refused at submission with `busy`.
    pub queue_max: i64,
    /// `job_deadline_s`: default end-to-end deadline applied to new jobs.
    pub job_deadline_s: i64,
    /// How often the executor polls for a queued job to claim.
    pub claim_poll_interval: Duration,
    /// How often the stale-job sweep runs.
    pub stale_check_interval: Duration,
    /// A claimed, non-terminal job idle longer than this is considered stale.
    pub stale_idle_secs: i64,
    /// Grace window given to in-flight jobs on shutdown.
    pub shutdown_timeout: Duration,
    /// Scratch directory root for per-job sandbox directories.
    pub work_dir: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            queue_max: 16,
            job_deadline_s: 300,
            claim_poll_interval: Duration::from_secs(2),
            stale_check_interval: Duration::from_secs(30),
            stale_idle_secs: 300,
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/animathic".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.concurrency),
            queue_max: std::env::var("QUEUE_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.queue_max),
            job_deadline_s: std::env::var("JOB_DEADLINE_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.job_deadline_s),
            claim_poll_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_POLL_INTERVAL_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            stale_check_interval: Duration::from_secs(
                std::env::var("WORKER_STALE_CHECK_INTERVAL_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            stale_idle_secs: std::env::var("WORKER_STALE_IDLE_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.stale_idle_secs),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| default.work_dir.clone()),
        }
    }
}
