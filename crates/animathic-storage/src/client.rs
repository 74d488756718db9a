//! S3-compatible object storage client (Storage Adapter, C7).

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::retry::{retry_async, RetryConfig};
use crate::ulid;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    /// Key prefix namespace shared by every object this service writes
    /// (spec §6 configuration: `storage.prefix`).
    pub prefix: Option<String>,
}

impl StorageConfig {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORAGE_BUCKET_NAME")
                .map_err(|_| StorageError::config("STORAGE_BUCKET_NAME not set"))?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            prefix: std::env::var("STORAGE_PREFIX").ok(),
        })
    }
}

/// Outcome of a `delete` call (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Ok,
    NotFound,
    Forbidden,
}

/// Result of a successful `put` (spec §4.7).
#[derive(Debug, Clone)]
pub struct PutResult {
    pub object_key: String,
    pub url: String,
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl StorageClient {
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "animathic-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            prefix: config.prefix,
        })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env()?).await
    }

    fn scoped_key(&self, user_id: &str, ulid: &str) -> String {
        let key = format!("{}/{}.mp4", user_id, ulid);
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key,
        }
    }

    /// Upload `local_path` under a server-assigned key of shape
    /// `user_id/<ulid>.mp4` (spec §4.7). Only the genuine `io` failure mode
    /// is retried, with exponential backoff, max 3 attempts; `auth` and
    /// `quota` surface immediately.
    pub async fn put(
        &self,
        user_id: &str,
        local_path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<PutResult> {
        let local_path = local_path.as_ref();
        let object_key = self.scoped_key(user_id, &ulid::generate());

        let retry_config = RetryConfig::default();
        let result = retry_async(
            &retry_config,
            |e: &StorageError| matches!(e, StorageError::Io(_)),
            || async {
                let body = ByteStream::from_path(local_path)
                    .await
                    .map_err(|e| StorageError::Io(e.to_string()))?;

                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&object_key)
                    .body(body)
                    .content_type(content_type)
                    .send()
                    .await
                    .map_err(classify_put_error)
            },
        )
        .await;

        result.map_err(|e| match e {
            StorageError::Io(msg) => StorageError::upload_failed(msg),
            other => other,
        })?;

        info!(user_id, object_key = %object_key, "uploaded object");

        let url = self.public_url(&object_key);
        Ok(PutResult { object_key, url })
    }

    fn public_url(&self, object_key: &str) -> String {
        format!("{}/{}/{}", self.bucket_endpoint(), self.bucket, object_key)
    }

    fn bucket_endpoint(&self) -> String {
        // Best-effort derivation for callers that want a direct URL; the
        // coordinator is free to prefer a presigned URL instead.
        std::env::var("STORAGE_PUBLIC_BASE_URL").unwrap_or_else(|_| String::new())
    }

    /// Delete an object. Authorization is enforced by key prefix: a key not
    /// rooted at `user_id/` is refused before any network call (spec §4.7).
    pub async fn delete(&self, user_id: &str, object_key: &str) -> StorageResult<DeleteOutcome> {
        if !self.owns_key(user_id, object_key) {
            warn!(user_id, object_key, "delete refused: key outside user prefix");
            return Ok(DeleteOutcome::Forbidden);
        }

        debug!(object_key, "deleting object");

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Ok),
            Err(e) if e.to_string().contains("NoSuchKey") => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(StorageError::delete_failed(e.to_string())),
        }
    }

    fn owns_key(&self, user_id: &str, object_key: &str) -> bool {
        let unprefixed = match &self.prefix {
            Some(prefix) => object_key
                .strip_prefix(&format!("{}/", prefix.trim_end_matches('/')))
                .unwrap_or(object_key),
            None => object_key,
        };
        unprefixed.starts_with(&format!("{}/", user_id))
    }

    /// Generate a presigned GET URL for direct playback/download.
    pub async fn presign_get(&self, object_key: &str, expires_in: Duration) -> StorageResult<String> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let presign_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Liveness check used by the `/ready` endpoint.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::config(format!("storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}

/// Classify an S3 SDK error into the disjoint `auth`/`quota`/`io` failure
/// modes of spec §4.7. `ProvideErrorMetadata` is implemented directly on
/// `SdkError<E, R>`, so the service error code is readable without
/// unwrapping to the operation-specific error type first.
fn classify_put_error<E: ProvideErrorMetadata + std::fmt::Display>(e: E) -> StorageError {
    classify_error_code(e.code(), e.to_string())
}

/// Pure mapping from an S3 error code to the disjoint taxonomy, split out
/// from [`classify_put_error`] so it's testable without an SDK error value.
fn classify_error_code(code: Option<&str>, message: String) -> StorageError {
    match code {
        Some("AccessDenied") | Some("InvalidAccessKeyId") | Some("SignatureDoesNotMatch") => {
            StorageError::Auth(message)
        }
        Some("QuotaExceeded") | Some("ServiceQuotaExceededException") | Some("SlowDown") => {
            StorageError::Quota(message)
        }
        _ => StorageError::Io(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_prefix(prefix: Option<&str>) -> StorageClient {
        StorageClient {
            client: Client::from_conf(
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .endpoint_url("http://localhost:9000")
                    .region(Region::new("auto"))
                    .credentials_provider(Credentials::new("x", "y", None, None, "test"))
                    .force_path_style(true)
                    .build(),
            ),
            bucket: "test-bucket".to_string(),
            prefix: prefix.map(|s| s.to_string()),
        }
    }

    #[test]
    fn owns_key_matches_only_own_prefix() {
        let client = client_with_prefix(None);
        assert!(client.owns_key("user-a", "user-a/abc.mp4"));
        assert!(!client.owns_key("user-a", "user-b/abc.mp4"));
    }

    #[test]
    fn owns_key_accounts_for_storage_prefix() {
        let client = client_with_prefix(Some("videos"));
        assert!(client.owns_key("user-a", "videos/user-a/abc.mp4"));
        assert!(!client.owns_key("user-a", "videos/user-b/abc.mp4"));
    }

    #[test]
    fn scoped_key_has_expected_shape() {
        let client = client_with_prefix(None);
        let key = client.scoped_key("user-a", "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(key, "user-a/01ARZ3NDEKTSV4RRFFQ69G5FAV.mp4");
    }

    #[test]
    fn classify_error_code_maps_access_denied_to_auth() {
        let err = classify_error_code(Some("AccessDenied"), "denied".to_string());
        assert!(matches!(err, StorageError::Auth(_)));
    }

    #[test]
    fn classify_error_code_maps_quota_codes_to_quota() {
        let err = classify_error_code(Some("ServiceQuotaExceededException"), "full".to_string());
        assert!(matches!(err, StorageError::Quota(_)));
    }

    #[test]
    fn classify_error_code_defaults_unknown_codes_to_io() {
        let err = classify_error_code(Some("InternalError"), "oops".to_string());
        assert!(matches!(err, StorageError::Io(_)));
        let err = classify_error_code(None, "dispatch failure".to_string());
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn only_io_errors_are_eligible_for_retry() {
        let retryable = |e: &StorageError| matches!(e, StorageError::Io(_));
        assert!(retryable(&StorageError::Io("timeout".to_string())));
        assert!(!retryable(&StorageError::Auth("denied".to_string())));
        assert!(!retryable(&StorageError::Quota("full".to_string())));
    }
}
