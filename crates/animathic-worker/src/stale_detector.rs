//! Stale job detector: a periodic sweep that recovers jobs abandoned by a
//! crashed worker (spec §5 "Cancellation & timeouts", §10.6).
//!
//! Ticks on an interval, skips terminal jobs, marks anything idle past its
//! threshold failed.

use std::sync::Arc;
use std::time::Duration;

use animathic_db::JobRepository;
use animathic_models::ErrorKind;
use tokio::sync::watch;

use crate::status_cache::JobStatusCache;

pub struct StaleJobDetector {
    jobs: Arc<JobRepository>,
    status_cache: Arc<JobStatusCache>,
    interval: Duration,
    idle_secs: i64,
}

impl StaleJobDetector {
    pub fn new(jobs: Arc<JobRepository>, status_cache: Arc<JobStatusCache>, interval: Duration, idle_secs: i64) -> Self {
        Self {
            jobs,
            status_cache,
            interval,
            idle_secs,
        }
    }

    /// Run until `shutdown` fires. Intended to be spawned alongside the
    /// executor's claim loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn sweep(&self) {
        let stale = match self.jobs.find_stale(self.idle_secs).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!("stale job sweep failed to query: {}", e);
                return;
            }
        };

        for mut job in stale {
            tracing::warn!(job_id = %job.id, state = %job.state, "recovering stale job");
            job.fail(ErrorKind::DeadlineExceeded, "worker crashed or stalled mid-job");
            if let Err(e) = self.jobs.update(&job).await {
                tracing::error!(job_id = %job.id, "failed to persist stale-job recovery: {}", e);
                continue;
            }
            self.status_cache.fail(job.id.as_str(), ErrorKind::DeadlineExceeded, "worker crashed or stalled mid-job");
        }
    }
}
