//! Storage Adapter (C7): S3-compatible object storage, keyed by
//! `user_id/<ulid>.mp4`, with prefix-based delete authorization.

pub mod client;
pub mod error;
mod retry;
pub mod ulid;

pub use client::{DeleteOutcome, PutResult, StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
