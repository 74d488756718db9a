//! The job entity and its state machine (spec §4.9).
//!
//! `Job` is owned exclusively by the job coordinator (`animathic-worker`)
//! until it reaches a terminal state; every other component only ever reads
//! it or appends a `GenerationAttempt`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ErrorKind;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state, per the state machine of spec §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Queued,
    LlmGenerating,
    Synthesizing,
    Validating,
    Rendering,
    Uploading,
    Persisting,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::LlmGenerating => "llm_generating",
            JobState::Synthesizing => "synthesizing",
            JobState::Validating => "validating",
            JobState::Rendering => "rendering",
            JobState::Uploading => "uploading",
            JobState::Persisting => "persisting",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// `completed` and `failed` are absorbing (spec §4.9 invariants).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The error surfaced on a failed job: a coarsened kind plus a human
/// message. Never carries raw stderr or raw model output (spec §7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The phase of the pipeline a `GenerationAttempt` was recorded in.
/// Distinct from `JobState`: a single job transitions through several
/// phases per attempt when it loops back through the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    LlmGenerating,
    Synthesizing,
    Validating,
    Rendering,
    Uploading,
    Persisting,
}

impl AttemptPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptPhase::LlmGenerating => "llm_generating",
            AttemptPhase::Synthesizing => "synthesizing",
            AttemptPhase::Validating => "validating",
            AttemptPhase::Rendering => "rendering",
            AttemptPhase::Uploading => "uploading",
            AttemptPhase::Persisting => "persisting",
        }
    }
}

/// The outcome recorded for one `GenerationAttempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    SpecOk,
    Malformed,
    SourceOk,
    ValidationOk,
    ArtifactFound,
    UploadOk,
    PersistOk,
    Failed,
}

/// One row per attempt through a phase of the pipeline. Append-only,
/// ordered, persisted regardless of outcome — this is the training-data
/// side-channel named in spec §3.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationAttempt {
    pub attempt_no: u32,
    pub backend: Option<String>,
    pub phase: AttemptPhase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<AttemptOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
}

impl GenerationAttempt {
    pub fn start(attempt_no: u32, phase: AttemptPhase, backend: Option<String>) -> Self {
        Self {
            attempt_no,
            backend,
            phase,
            started_at: Utc::now(),
            ended_at: None,
            outcome: None,
            error_kind: None,
            error_message: None,
            generated_source: None,
            spec_hash: None,
        }
    }

    pub fn finish_ok(mut self, outcome: AttemptOutcome) -> Self {
        self.ended_at = Some(Utc::now());
        self.outcome = Some(outcome);
        self
    }

    pub fn finish_err(mut self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.ended_at = Some(Utc::now());
        self.outcome = Some(AttemptOutcome::Failed);
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
        self
    }

    pub fn with_spec_hash(mut self, hash: impl Into<String>) -> Self {
        self.spec_hash = Some(hash.into());
        self
    }

    pub fn with_generated_source(mut self, source: impl Into<String>) -> Self {
        self.generated_source = Some(source.into());
        self
    }
}

/// Default end-to-end deadline, in seconds (spec §5, §6 `job_deadline_s`).
pub const DEFAULT_JOB_DEADLINE_S: i64 = 300;

/// Default global attempt budget across LLM + render retries (spec §4.9,
/// §6 `llm_attempt_budget`).
pub const DEFAULT_ATTEMPT_BUDGET: u32 = 3;

/// A generation job: the unit the coordinator drives through the state
/// machine of spec §4.9.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub user_id: String,
    pub prompt: String,
    pub state: JobState,
    #[serde(default)]
    pub attempts: Vec<GenerationAttempt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    /// The `videos` row this job produces, once `create_video` has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub deadline_s: i64,
    pub attempt_budget: u32,
}

impl Job {
    pub fn new(user_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            state: JobState::Queued,
            attempts: Vec::new(),
            created_at: now,
            updated_at: now,
            result_url: None,
            error: None,
            video_id: None,
            deadline_s: DEFAULT_JOB_DEADLINE_S,
            attempt_budget: DEFAULT_ATTEMPT_BUDGET,
        }
    }

    /// Transition to a new non-terminal state. Panics in debug builds if
    /// called on an already-terminal job: `completed`/`failed` are
    /// absorbing and no component may reopen them.
    pub fn transition_to(&mut self, state: JobState) {
        debug_assert!(
            !self.state.is_terminal(),
            "attempted to transition a terminal job {} from {} to {}",
            self.id,
            self.state,
            state
        );
        self.state = state;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, result_url: impl Into<String>) {
        self.state = JobState::Completed;
        self.result_url = Some(result_url.into());
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(JobError::new(kind, message));
        self.updated_at = Utc::now();
    }

    pub fn record_attempt(&mut self, attempt: GenerationAttempt) {
        self.attempts.push(attempt);
        self.updated_at = Utc::now();
    }

    /// Count of attempts whose phase is llm_generating or rendering, the
    /// two retry-eligible phases the global attempt budget bounds.
    pub fn retryable_attempt_count(&self) -> u32 {
        self.attempts
            .iter()
            .filter(|a| matches!(a.phase, AttemptPhase::LlmGenerating | AttemptPhase::Rendering))
            .count() as u32
    }

    pub fn attempt_budget_exhausted(&self) -> bool {
        self.retryable_attempt_count() >= self.attempt_budget
    }

    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }

    pub fn deadline_exceeded(&self) -> bool {
        !self.state.is_terminal() && self.elapsed_seconds() > self.deadline_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_queued() {
        let job = Job::new("user-1", "a blue circle fading in");
        assert_eq!(job.state, JobState::Queued);
        assert!(job.attempts.is_empty());
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn complete_sets_result_url() {
        let mut job = Job::new("user-1", "prompt");
        job.transition_to(JobState::LlmGenerating);
        job.transition_to(JobState::Persisting);
        job.complete("https://cdn.example.com/user-1/abc.mp4");
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(
            job.result_url.as_deref(),
            Some("https://cdn.example.com/user-1/abc.mp4")
        );
    }

    #[test]
    fn fail_records_error_kind() {
        let mut job = Job::new("user-1", "prompt");
        job.fail(ErrorKind::RenderTimeout, "renderer exceeded wall clock");
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.unwrap().kind, ErrorKind::RenderTimeout);
    }

    #[test]
    fn attempt_budget_exhaustion() {
        let mut job = Job::new("user-1", "prompt");
        job.attempt_budget = 2;
        for _ in 0..2 {
            let attempt = GenerationAttempt::start(1, AttemptPhase::Rendering, None)
                .finish_err(ErrorKind::RenderTimeout, "timeout");
            job.record_attempt(attempt);
        }
        assert!(job.attempt_budget_exhausted());
    }

    #[test]
    fn non_retryable_phases_do_not_count_toward_budget() {
        let mut job = Job::new("user-1", "prompt");
        job.attempt_budget = 1;
        let attempt = GenerationAttempt::start(1, AttemptPhase::Uploading, None)
            .finish_err(ErrorKind::UploadFailed, "io error");
        job.record_attempt(attempt);
        assert!(!job.attempt_budget_exhausted());
    }
}
