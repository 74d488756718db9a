//! The fixed error-kind taxonomy every component coarsens its failures into.
//!
//! Components keep their own `thiserror` enums with rich variants; each such
//! enum exposes a `.kind() -> ErrorKind` method so the job coordinator and
//! the API layer can reason about failures without matching on internals
//! from every downstream crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarsened failure category surfaced to the job, the status endpoint, and
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPrompt,
    LlmUnavailable,
    LlmMalformed,
    LlmRefused,
    LlmExhausted,
    UnknownVocabulary,
    BannedSymbol,
    Schema,
    Shape,
    TooLarge,
    RenderTimeout,
    RenderFailed,
    NoOutputArtifact,
    UploadFailed,
    DbFailed,
    DeadlineExceeded,
    Cancelled,
    Exhausted,
    Busy,
    Auth,
    NotFound,
    Forbidden,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPrompt => "invalid_prompt",
            ErrorKind::LlmUnavailable => "llm_unavailable",
            ErrorKind::LlmMalformed => "llm_malformed",
            ErrorKind::LlmRefused => "llm_refused",
            ErrorKind::LlmExhausted => "llm_exhausted",
            ErrorKind::UnknownVocabulary => "unknown_vocabulary",
            ErrorKind::BannedSymbol => "banned_symbol",
            ErrorKind::Schema => "schema",
            ErrorKind::Shape => "shape",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::RenderTimeout => "render_timeout",
            ErrorKind::RenderFailed => "render_failed",
            ErrorKind::NoOutputArtifact => "no_output_artifact",
            ErrorKind::UploadFailed => "upload_failed",
            ErrorKind::DbFailed => "db_failed",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Exhausted => "exhausted",
            ErrorKind::Busy => "busy",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
        }
    }

    /// Whether a fresh attempt at the same stage is expected to help.
    ///
    /// Used by the job coordinator to decide whether to feed the error back
    /// into the LLM orchestrator as repair context (see spec §4.9).
    pub fn is_recoverable_locally(&self) -> bool {
        matches!(
            self,
            ErrorKind::LlmMalformed
                | ErrorKind::LlmUnavailable
                | ErrorKind::BannedSymbol
                | ErrorKind::Schema
                | ErrorKind::Shape
                | ErrorKind::UploadFailed
                | ErrorKind::RenderTimeout
                | ErrorKind::RenderFailed
                | ErrorKind::NoOutputArtifact
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
