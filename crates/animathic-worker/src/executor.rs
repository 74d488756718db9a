//! Job executor: bounded-concurrency claim-and-run loop. Semaphore-gated
//! workers, `watch`-channel shutdown.

use std::sync::Arc;

use animathic_db::JobRepository;
use tokio::sync::{watch, Semaphore};

use crate::config::WorkerConfig;
use crate::coordinator::JobCoordinator;
use crate::logging::JobLogger;

pub struct JobExecutor {
    config: WorkerConfig,
    jobs: Arc<JobRepository>,
    coordinator: Arc<JobCoordinator>,
    semaphore: Arc<Semaphore>,
    worker_id: String,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, jobs: Arc<JobRepository>, coordinator: Arc<JobCoordinator>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            config,
            jobs,
            coordinator,
            semaphore,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Poll for claimable jobs until shutdown, spawning one task per claim
    /// and bounding in-flight work to `concurrency` permits.
    pub async fn run(&self) {
        tracing::info!(worker_id = %self.worker_id, concurrency = self.config.concurrency, "executor starting");
        let mut ticker = tokio::time::interval(self.config.claim_poll_interval);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.claim_and_spawn().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("executor shutting down, waiting for in-flight jobs");
        self.wait_for_jobs().await;
    }

    async fn claim_and_spawn(&self) {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let job = match self.jobs.claim_next(&self.worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("failed to claim job: {}", e);
                return;
            }
        };

        let coordinator = self.coordinator.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let logger = JobLogger::new(&job_id);
            logger.log_transition("claimed", "running");
            if let Err(e) = coordinator.run_job(job).await {
                logger.log_error(&format!("coordinator returned an error outside the state machine: {e}"));
            }
        });
    }

    /// Block until every in-flight permit has been returned, up to
    /// `shutdown_timeout`.
    async fn wait_for_jobs(&self) {
        let total = self.config.concurrency;
        let wait = self.semaphore.acquire_many(total as u32);
        let _ = tokio::time::timeout(self.config.shutdown_timeout, wait).await;
    }

    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub fn stale_detector_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}
