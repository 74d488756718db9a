//! LLM-layer error types (spec §4.5, §4.6).

use animathic_models::ErrorKind;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;
pub type LlmResult<T> = Result<T, LlmError>;

/// A single backend's typed failure (spec §4.5). Backends never retry
/// internally; all retry/fallback policy lives in the orchestrator.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend timed out")]
    Timeout,
    #[error("backend returned malformed output: {0}")]
    MalformedOutput(String),
    #[error("backend refused: {0}")]
    Refused(String),
    #[error("backend rate limited")]
    RateLimited,
}

/// Orchestrator-level failure after exhausting the attempt budget or
/// hitting a non-recoverable backend error (spec §4.6).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no backend succeeded within the attempt budget: {0}")]
    Exhausted(#[source] BackendError),
    #[error("backend refused the request: {0}")]
    Refused(String),
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Exhausted(_) => ErrorKind::LlmExhausted,
            LlmError::Refused(_) => ErrorKind::LlmRefused,
        }
    }
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Unavailable(_) | BackendError::RateLimited | BackendError::Timeout => {
                ErrorKind::LlmUnavailable
            }
            BackendError::MalformedOutput(_) => ErrorKind::LlmMalformed,
            BackendError::Refused(_) => ErrorKind::LlmRefused,
        }
    }
}
