//! Storage error types.

use animathic_models::ErrorKind;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    Config(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied for key {0}")]
    Forbidden(String),

    /// The object store itself rejected the request as unauthorized (e.g.
    /// S3 `AccessDenied`), distinct from [`Self::Forbidden`]'s client-side
    /// key-prefix check (spec §4.7 `auth`).
    #[error("Storage backend denied access: {0}")]
    Auth(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// Bucket quota / service-side throttling (spec §4.7 `quota`).
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// Transient I/O failure; the only variant `put` retries (spec §4.7).
    #[error("IO error: {0}")]
    Io(String),
}

impl StorageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Coarsen into the fixed taxonomy (spec §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Config(_) => ErrorKind::DbFailed,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Forbidden(_) => ErrorKind::Forbidden,
            StorageError::Auth(_) => ErrorKind::Auth,
            StorageError::UploadFailed(_) | StorageError::Io(_) => ErrorKind::UploadFailed,
            StorageError::DeleteFailed(_) => ErrorKind::UploadFailed,
            StorageError::Quota(_) => ErrorKind::UploadFailed,
        }
    }
}
