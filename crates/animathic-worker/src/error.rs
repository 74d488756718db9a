//! Worker error types: coarsens every downstream crate's error into the
//! fixed taxonomy for the job coordinator's own bookkeeping.

use animathic_models::ErrorKind;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("spec validation failed: {0}")]
    Spec(#[from] animathic_models::spec::SpecError),

    #[error("source validation failed: {0}")]
    Validator(#[from] animathic_validator::ValidatorError),

    #[error("synthesis failed: {0}")]
    Synth(#[from] animathic_synth::SynthError),

    #[error("sandbox failed: {0}")]
    Sandbox(#[from] animathic_sandbox::SandboxError),

    #[error("render failed: {0}")]
    Renderer(#[from] animathic_renderer::RendererError),

    #[error("llm orchestration failed: {0}")]
    Llm(#[from] animathic_llm::LlmError),

    #[error("upload failed: {0}")]
    Storage(#[from] animathic_storage::StorageError),

    #[error("metadata store failed: {0}")]
    Db(#[from] animathic_db::DbError),

    #[error("job deadline exceeded")]
    DeadlineExceeded,

    #[error("job attempt budget exhausted: {0}")]
    Exhausted(String),

    #[error("job cancelled")]
    Cancelled,
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Spec(_) => ErrorKind::Schema,
            WorkerError::Validator(e) => e.kind(),
            WorkerError::Synth(e) => e.kind(),
            WorkerError::Sandbox(e) => e.kind(),
            WorkerError::Renderer(e) => e.kind(),
            WorkerError::Llm(e) => e.kind(),
            WorkerError::Storage(e) => e.kind(),
            WorkerError::Db(e) => e.kind(),
            WorkerError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            WorkerError::Exhausted(_) => ErrorKind::Exhausted,
            WorkerError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
