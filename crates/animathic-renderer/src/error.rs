//! Renderer error taxonomy (spec §4.3): `timeout`, `nonzero_exit(code,
//! stderr_tail)`, `no_output_artifact`.

use animathic_models::ErrorKind;
use thiserror::Error;

pub type RendererResult<T> = Result<T, RendererError>;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("render timed out after {0}s")]
    Timeout(u64),

    #[error("renderer exited with status {code:?}: {stderr_tail}")]
    NonzeroExit { code: Option<i32>, stderr_tail: String },

    #[error("renderer exited 0 but produced no output artifact")]
    NoOutputArtifact,

    #[error("failed to spawn renderer subprocess: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] animathic_sandbox::SandboxError),
}

impl RendererError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RendererError::Timeout(_) => ErrorKind::RenderTimeout,
            RendererError::NonzeroExit { .. } => ErrorKind::RenderFailed,
            RendererError::NoOutputArtifact => ErrorKind::NoOutputArtifact,
            RendererError::Spawn(_) => ErrorKind::RenderFailed,
            RendererError::Sandbox(_) => ErrorKind::RenderFailed,
        }
    }
}
