//! Adapter-level integration tests for the storage client (C7) over real
//! HTTP semantics via `wiremock`, pointing the S3 SDK's endpoint at a mock
//! server instead of exercising only the in-module unit tests (which cover
//! `owns_key`/`scoped_key`/`classify_error_code` in isolation).

use std::io::Write;

use animathic_storage::{StorageClient, StorageConfig};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_client(server: &MockServer) -> StorageClient {
    let config = StorageConfig {
        endpoint_url: server.uri(),
        access_key_id: "test-access-key".to_string(),
        secret_access_key: "test-secret-key".to_string(),
        bucket_name: "test-bucket".to_string(),
        region: "auto".to_string(),
        prefix: None,
    };
    StorageClient::new(config).await.unwrap()
}

fn sample_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"fake mp4 bytes").unwrap();
    file
}

#[tokio::test]
async fn put_uploads_under_the_user_scoped_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/test-bucket/user-a/.+\.mp4$"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"deadbeef\""))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let file = sample_file();

    let result = client.put("user-a", file.path(), "video/mp4").await.unwrap();
    assert!(result.object_key.starts_with("user-a/"));
    assert!(result.object_key.ends_with(".mp4"));
}

#[tokio::test]
async fn put_surfaces_access_denied_as_auth_without_retrying() {
    let server = MockServer::start().await;
    let error_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>AccessDenied</Code>
  <Message>Access Denied</Message>
  <RequestId>test-request-id</RequestId>
</Error>"#;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/test-bucket/user-a/.+\.mp4$"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("content-type", "application/xml")
                .set_body_string(error_body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let file = sample_file();

    let err = client.put("user-a", file.path(), "video/mp4").await.unwrap_err();
    assert_eq!(err.kind(), animathic_models::ErrorKind::Auth);
    // `expect(1)` above asserts exactly one PUT was sent: an auth failure
    // must not be retried like a transient `io` error (spec §4.7).
}

#[tokio::test]
async fn delete_refuses_a_key_outside_the_user_prefix_without_any_network_call() {
    let server = MockServer::start().await;
    // No mocks mounted: a network call here would fail the test outright.
    let client = test_client(&server).await;

    let outcome = client.delete("user-a", "user-b/some-video.mp4").await.unwrap();
    assert_eq!(outcome, animathic_storage::DeleteOutcome::Forbidden);
}
