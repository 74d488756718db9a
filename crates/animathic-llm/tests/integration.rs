//! Adapter-level integration tests for the LLM backend (C5) over real HTTP
//! semantics via `wiremock`, as distinct from the in-module unit tests in
//! `src/gemini.rs` that exercise `call_model` directly.

use animathic_llm::{GeminiBackend, LlmBackend, LlmOrchestrator, LocalFallbackBackend};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn valid_spec_json() -> serde_json::Value {
    serde_json::json!({
        "scene_kind": "2d",
        "duration_hint": 2.0,
        "background": "BLACK",
        "objects": [{
            "id": "c",
            "kind": "Circle",
            "params": {},
            "style": { "color": "BLUE" }
        }],
        "steps": [{
            "action": "FadeIn",
            "target_ids": ["c"],
            "params": {},
            "run_time": 1.0,
            "wait_after": 0.5
        }],
        "camera": null
    })
}

fn candidate_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

#[tokio::test]
async fn generate_spec_parses_a_real_http_response() {
    let server = MockServer::start().await;
    let body = candidate_body(&valid_spec_json().to_string());
    Mock::given(method("POST"))
        .and(path("/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let backend = GeminiBackend::with_base_url("test-key", server.uri());
    let spec = backend.generate_spec("a blue circle fading in", None).await.unwrap();
    assert_eq!(spec.objects.len(), 1);
    assert_eq!(spec.objects[0].id, "c");
}

#[tokio::test]
async fn generate_spec_makes_exactly_one_request_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::with_base_url("test-key", server.uri());
    let err = backend.generate_spec("a blue circle fading in", None).await.unwrap_err();
    assert!(matches!(err, animathic_llm::BackendError::Unavailable(_)));
    // `expect(1)` above asserts the mock saw exactly one call; verified on
    // `MockServer` drop.
}

#[tokio::test]
async fn orchestrator_falls_back_when_primary_is_unavailable() {
    let primary_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&primary_server)
        .await;

    let primary: Box<dyn LlmBackend> = Box::new(GeminiBackend::with_base_url("test-key", primary_server.uri()));
    let fallback: Box<dyn LlmBackend> = Box::new(LocalFallbackBackend::new());
    let orchestrator = LlmOrchestrator::new(primary, fallback);

    let outcome = orchestrator.generate("a blue circle fading in", None).await.0.unwrap();
    assert_eq!(outcome.backend_used, "local-fallback");
    assert!(outcome.records.iter().any(|r| r.backend == "gemini"));
}

#[tokio::test]
async fn generate_spec_surfaces_malformed_output_over_http() {
    let server = MockServer::start().await;
    let body = candidate_body("not json at all");
    Mock::given(method("POST"))
        .and(path("/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let backend = GeminiBackend::with_base_url("test-key", server.uri());
    let err = backend.generate_spec("a blue circle fading in", None).await.unwrap_err();
    assert!(matches!(err, animathic_llm::BackendError::MalformedOutput(_)));
}
