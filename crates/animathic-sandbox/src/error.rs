//! Sandbox error types (spec §4.2).

use animathic_models::ErrorKind;
use thiserror::Error;

pub type SandboxResult<T> = Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create working directory: {0}")]
    WorkdirFailed(#[from] std::io::Error),

    #[error("failed to signal process group {0}: {1}")]
    SignalFailed(i32, String),
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::WorkdirFailed(_) => ErrorKind::RenderFailed,
            SandboxError::SignalFailed(_, _) => ErrorKind::RenderFailed,
        }
    }
}
