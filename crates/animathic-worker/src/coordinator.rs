//! Job Coordinator (C9): drives one job through the full state machine of
//! spec §4.9 — `queued -> llm_generating -> synthesizing -> validating ->
//! rendering -> uploading -> persisting -> completed`, with `failed`
//! reachable from any non-terminal state. Exclusive writer of its own job
//! row; see §5 single-writer discipline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use animathic_db::{GenerationLogRepository, JobRepository, VideoRepository};
use animathic_llm::LlmOrchestrator;
use animathic_models::job::{AttemptOutcome, AttemptPhase, GenerationAttempt};
use animathic_models::{ErrorKind, Job, JobState};
use animathic_sandbox::{RenderJobGuard, SandboxConfig};
use animathic_storage::StorageClient;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::status_cache::JobStatusCache;

/// Fixed output resolution baked into the renderer invocation (spec §6
/// "renderer invocation"): `--resolution 1280,720`.
const OUTPUT_WIDTH: i32 = 1280;
const OUTPUT_HEIGHT: i32 = 720;

const SCENE_CLASS: &str = "GeneratedScene";
const SOURCE_FILENAME: &str = "scene.py";

pub struct JobCoordinator {
    pub llm: Arc<LlmOrchestrator>,
    pub storage: Arc<StorageClient>,
    pub videos: Arc<VideoRepository>,
    pub logs: Arc<GenerationLogRepository>,
    pub jobs: Arc<JobRepository>,
    pub status_cache: Arc<JobStatusCache>,
    pub sandbox_config: SandboxConfig,
    pub sandbox_base_dir: std::path::PathBuf,
    pub render_wall_timeout: Duration,
}

impl JobCoordinator {
    /// Run `job` to completion (or failure). Every state transition is
    /// persisted to the metadata store and mirrored into the status cache
    /// before moving on, so a crash mid-pipeline leaves the row in a
    /// well-defined, resumable-or-failable state.
    pub async fn run_job(&self, mut job: Job) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id);

        let video_id = self.videos.create_video(&job.user_id, &job.prompt).await?;
        job.video_id = Some(video_id.as_str().to_string());
        job.transition_to(JobState::LlmGenerating);
        self.persist(&job).await?;
        logger.log_transition("queued", "llm_generating");

        let mut seed_diagnostic: Option<String> = None;

        loop {
            if job.deadline_exceeded() {
                return self.fail(&mut job, ErrorKind::DeadlineExceeded, "job deadline exceeded").await;
            }

            match self.run_one_pass(&mut job, &logger, seed_diagnostic.take()).await {
                Ok(PassOutcome::Completed) => return Ok(()),
                Ok(PassOutcome::Retry(diagnostic)) => {
                    if job.attempt_budget_exhausted() {
                        return self
                            .fail(&mut job, ErrorKind::Exhausted, "global attempt budget exhausted")
                            .await;
                    }
                    seed_diagnostic = Some(diagnostic);
                    job.transition_to(JobState::LlmGenerating);
                    self.persist(&job).await?;
                    logger.log_transition("validating_or_rendering", "llm_generating");
                }
                Err(e) => return self.fail(&mut job, e.kind(), e.to_string()).await,
            }
        }
    }

    /// One trip through `llm_generating -> synthesizing -> validating ->
    /// rendering -> uploading -> persisting`, stopping early with a
    /// `Retry` outcome on any recoverable failure (spec §4.9 transition
    /// table).
    async fn run_one_pass(
        &self,
        job: &mut Job,
        logger: &JobLogger,
        seed_diagnostic: Option<String>,
    ) -> WorkerResult<PassOutcome> {
        let attempt_no = job.retryable_attempt_count() + 1;

        // llm_generating: the orchestrator internally retries across
        // primary/fallback and repair passes within its own attempt budget;
        // the coordinator records that whole call as a single attempt
        // against the job's own (separate) attempt budget.
        let (outcome, backend_records) = self.llm.generate(&job.prompt, seed_diagnostic).await;
        let last_backend = backend_records.last().map(|r| r.backend.clone());
        let attempt = GenerationAttempt::start(attempt_no, AttemptPhase::LlmGenerating, last_backend);
        let spec = match outcome {
            Ok(result) => {
                let attempt = attempt.with_spec_hash(result.spec.content_hash()).finish_ok(AttemptOutcome::SpecOk);
                self.record(job, attempt).await?;
                result.spec
            }
            Err(e) => {
                let attempt = attempt.finish_err(e.kind(), e.to_string());
                self.record(job, attempt).await?;
                return Err(WorkerError::Llm(e));
            }
        };

        if let Err(e) = spec.validate() {
            return Ok(PassOutcome::Retry(e.to_string()));
        }

        // synthesizing
        job.transition_to(JobState::Synthesizing);
        self.persist(job).await?;
        logger.log_transition("llm_generating", "synthesizing");

        let mut attempt = GenerationAttempt::start(attempt_no, AttemptPhase::Synthesizing, None);
        let source = match animathic_synth::emit(&spec) {
            Ok(source) => {
                attempt = attempt.finish_ok(AttemptOutcome::SourceOk);
                self.record(job, attempt).await?;
                source
            }
            Err(e) => {
                let attempt = attempt.finish_err(e.kind(), e.to_string());
                self.record(job, attempt).await?;
                return Ok(PassOutcome::Retry(e.to_string()));
            }
        };

        // validating (C1)
        job.transition_to(JobState::Validating);
        self.persist(job).await?;
        logger.log_transition("synthesizing", "validating");

        let mut attempt = GenerationAttempt::start(attempt_no, AttemptPhase::Validating, None);
        if let Err(e) = animathic_validator::validate_source(&source, spec.scene_kind) {
            let attempt = attempt.finish_err(e.kind(), e.to_string());
            self.record(job, attempt).await?;
            return Ok(PassOutcome::Retry(e.to_string()));
        }
        attempt = attempt.finish_ok(AttemptOutcome::ValidationOk);
        self.record(job, attempt).await?;

        // rendering (C2 + C3)
        job.transition_to(JobState::Rendering);
        self.persist(job).await?;
        logger.log_transition("validating", "rendering");

        let guard = RenderJobGuard::acquire(&self.sandbox_base_dir, job.id.as_str())?;
        let source_path = guard.path().join(SOURCE_FILENAME);
        tokio::fs::write(&source_path, &source).await.map_err(animathic_sandbox::SandboxError::from)?;

        let mut attempt = GenerationAttempt::start(attempt_no, AttemptPhase::Rendering, None);
        let request = animathic_renderer::RenderRequest {
            source_path: &source_path,
            scene_class: SCENE_CLASS,
            output_dir: guard.path(),
        };
        let artifact_path = match animathic_renderer::render(
            request,
            guard.path(),
            &self.sandbox_config,
            self.render_wall_timeout,
        )
        .await
        {
            Ok(path) => {
                attempt = attempt.finish_ok(AttemptOutcome::ArtifactFound);
                self.record(job, attempt).await?;
                path
            }
            Err(e) => {
                let attempt = attempt.finish_err(e.kind(), e.to_string());
                self.record(job, attempt).await?;
                return Ok(PassOutcome::Retry(e.to_string()));
            }
        };

        let result = self.upload_and_persist(job, logger, attempt_no, &artifact_path, &spec).await;
        guard.finish();
        result.map(|()| PassOutcome::Completed)
    }

    /// uploading (C7) -> persisting (C8) -> completed.
    async fn upload_and_persist(
        &self,
        job: &mut Job,
        logger: &JobLogger,
        attempt_no: u32,
        artifact_path: &Path,
        spec: &animathic_models::AnimationSpec,
    ) -> WorkerResult<()> {
        job.transition_to(JobState::Uploading);
        self.persist(job).await?;
        logger.log_transition("rendering", "uploading");

        let mut attempt = GenerationAttempt::start(attempt_no, AttemptPhase::Uploading, None);
        let put_result = match self.storage.put(&job.user_id, artifact_path, "video/mp4").await {
            Ok(r) => {
                attempt = attempt.finish_ok(AttemptOutcome::UploadOk);
                self.record(job, attempt).await?;
                r
            }
            Err(e) => {
                let attempt = attempt.finish_err(e.kind(), e.to_string());
                self.record(job, attempt).await?;
                return Err(WorkerError::Storage(e));
            }
        };

        job.transition_to(JobState::Persisting);
        self.persist(job).await?;
        logger.log_transition("uploading", "persisting");

        let file_size = tokio::fs::metadata(artifact_path)
            .await
            .map(|m| m.len() as i64)
            .unwrap_or(0);
        let duration_s: f64 = spec.steps.iter().map(|s| s.run_time + s.wait_after).sum();

        let video_id = animathic_models::VideoId::from_string(job.video_id.clone().expect("video row created at job start"));

        let mut attempt = GenerationAttempt::start(attempt_no, AttemptPhase::Persisting, None);
        match self
            .videos
            .update_video(&job.user_id, &video_id, &put_result.object_key, file_size, duration_s, OUTPUT_WIDTH, OUTPUT_HEIGHT)
            .await
        {
            Ok(()) => {
                attempt = attempt.finish_ok(AttemptOutcome::PersistOk);
                self.record(job, attempt).await?;
            }
            Err(e) => {
                let attempt = attempt.finish_err(e.kind(), e.to_string());
                self.record(job, attempt).await?;
                return Err(WorkerError::Db(e));
            }
        }

        job.complete(put_result.url.clone());
        self.persist(job).await?;
        self.status_cache.complete(job.id.as_str(), put_result.url);
        logger.log_transition("persisting", "completed");
        Ok(())
    }

    async fn fail(&self, job: &mut Job, kind: ErrorKind, message: impl Into<String>) -> WorkerResult<()> {
        let message = message.into();
        job.fail(kind, message.clone());
        self.persist(job).await?;
        self.status_cache.fail(job.id.as_str(), kind, message.clone());
        if let Some(video_id) = &job.video_id {
            let _ = self
                .videos
                .mark_failed(&job.user_id, &animathic_models::VideoId::from_string(video_id.clone()))
                .await;
        }
        tracing::warn!(job_id = %job.id, kind = %kind, "job failed: {}", message);
        Ok(())
    }

    async fn persist(&self, job: &Job) -> WorkerResult<()> {
        self.jobs.update(job).await?;
        self.status_cache
            .update_state(job.id.as_str(), job.state, job.retryable_attempt_count());
        Ok(())
    }

    async fn record(&self, job: &mut Job, attempt: GenerationAttempt) -> WorkerResult<()> {
        if let Some(video_id) = &job.video_id {
            let video_id = animathic_models::VideoId::from_string(video_id.clone());
            self.logs.log_attempt(&video_id, job.id.as_str(), &attempt).await?;
        }
        job.record_attempt(attempt);
        Ok(())
    }
}

enum PassOutcome {
    Completed,
    /// Carries the diagnostic fed back into the orchestrator as repair
    /// context on the next `llm_generating` pass.
    Retry(String),
}
