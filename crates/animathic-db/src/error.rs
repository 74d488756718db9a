//! Metadata store error types.

use animathic_models::ErrorKind;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to configure database pool: {0}")]
    Config(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl DbError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Coarsen into the fixed taxonomy (spec §7: every store failure is
    /// `db_failed` except the row-level-security denials, which surface
    /// their own kinds).
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound(_) => ErrorKind::NotFound,
            DbError::Forbidden(_) => ErrorKind::Forbidden,
            DbError::Config(_) | DbError::Migration(_) | DbError::Query(_) => ErrorKind::DbFailed,
        }
    }
}
