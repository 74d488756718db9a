use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use animathic_db::{DbConfig, GenerationLogRepository, JobRepository, VideoRepository};
use animathic_llm::backend::LlmBackend;
use animathic_llm::{GeminiBackend, LlmConfig, LlmOrchestrator, LocalFallbackBackend};
use animathic_sandbox::SandboxConfig;
use animathic_storage::StorageConfig;
use animathic_storage::StorageClient;
use animathic_worker::coordinator::JobCoordinator;
use animathic_worker::{JobExecutor, JobStatusCache, StaleJobDetector, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let worker_config = WorkerConfig::from_env();
    let db_config = DbConfig::from_env()?;

    let pool = animathic_db::pool::connect(&db_config).await?;
    animathic_db::pool::run_migrations(&pool).await?;

    let videos = Arc::new(VideoRepository::new(pool.clone()));
    let logs = Arc::new(GenerationLogRepository::new(pool.clone()));
    let jobs = Arc::new(JobRepository::new(pool.clone()));

    let storage = Arc::new(StorageClient::from_env().await?);

    let llm_config = LlmConfig::from_env();
    let primary: Box<dyn LlmBackend> = match llm_config.primary_api_key.clone() {
        Some(key) => Box::new(GeminiBackend::new(key)),
        None => Box::new(LocalFallbackBackend::new()),
    };
    let fallback: Box<dyn LlmBackend> = Box::new(LocalFallbackBackend::new());
    let llm = Arc::new(LlmOrchestrator::new(primary, fallback).with_attempt_budget(llm_config.attempt_budget));

    let status_cache = Arc::new(JobStatusCache::new());
    let sandbox_config = SandboxConfig::from_env();
    let render_wall_timeout = std::time::Duration::from_secs(sandbox_config.wall_timeout_s);

    let coordinator = Arc::new(JobCoordinator {
        llm,
        storage,
        videos,
        logs,
        jobs: jobs.clone(),
        status_cache: status_cache.clone(),
        sandbox_config,
        sandbox_base_dir: std::path::PathBuf::from(&worker_config.work_dir),
        render_wall_timeout,
    });

    let executor = JobExecutor::new(worker_config.clone(), jobs.clone(), coordinator);
    let shutdown_tx = executor.shutdown_handle();

    let detector = StaleJobDetector::new(
        jobs,
        status_cache,
        worker_config.stale_check_interval,
        worker_config.stale_idle_secs,
    );
    let detector_shutdown_rx = executor.stale_detector_shutdown_rx();
    tokio::spawn(async move { detector.run(detector_shutdown_rx).await });

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    executor.run().await;
    Ok(())
}
