//! The hosted structured-output backend (spec §4.5 "primary").
//!
//! Modeled on a Gemini-style generateContent API. Spec §4.5 is explicit
//! that "backends do not retry internally" — model selection across
//! primary/fallback and retry/repair policy belong to the orchestrator
//! (§4.6), not this adapter. `generate_spec` makes exactly one call and
//! returns the first error to the caller.

use animathic_models::AnimationSpec;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{system_instruction, HealthStatus, LlmBackend, RepairContext};
use crate::error::{BackendError, BackendResult};
use crate::redact::redact;

const MODEL: &str = "gemini-3-flash-preview";

pub struct GeminiBackend {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: MODEL.to_string(),
        }
    }

    /// Same contract as [`Self::new`] but parameterized with an explicit
    /// model name, so the orchestrator can stand up distinct `primary`
    /// and `fallback` backends from the same adapter (spec §4.5).
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: model.into(),
        }
    }

    /// Same contract as [`Self::new`] but with an explicit base URL.
    /// Exposed outside `#[cfg(test)]` so the workspace's own adapter-level
    /// integration tests (`tests/integration.rs`) can point at a wiremock
    /// server; also useful in production against a self-hosted
    /// Gemini-compatible endpoint.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: base_url.into(),
            model: MODEL.to_string(),
        }
    }

    fn build_prompt(&self, prompt: &str, repair: Option<&RepairContext>) -> String {
        let mut out = format!("{}\n\nUser request: {}\n", system_instruction(), redact(prompt));
        if let Some(ctx) = repair {
            out.push_str("\nThe previous attempt failed validation. Diagnostic:\n");
            out.push_str(&redact(&ctx.diagnostic));
            if let Some(previous) = &ctx.previous_output {
                out.push_str("\nPrevious output:\n");
                out.push_str(&redact(previous));
            }
            out.push_str("\nFix the issue and return a corrected JSON object only.\n");
        }
        out
    }

    async fn call_model(&self, model: &str, prompt: &str) -> BackendResult<AnimationSpec> {
        let url = format!("{}/{}:generateContent?key={}", self.base_url, model, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!("{}: {}", status, redact(&body))));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedOutput(format!("response envelope: {e}")))?;

        if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            return Err(BackendError::Refused(format!("prompt blocked: {reason}")));
        }

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| BackendError::MalformedOutput("empty candidate list".to_string()))?;

        let json_text = strip_markdown_fence(text);

        serde_json::from_str(json_text)
            .map_err(|e| BackendError::MalformedOutput(format!("schema mismatch: {e}")))
    }
}

fn strip_markdown_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")).unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[async_trait::async_trait]
impl LlmBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_spec(
        &self,
        prompt: &str,
        repair: Option<&RepairContext>,
    ) -> BackendResult<AnimationSpec> {
        let full_prompt = self.build_prompt(prompt, repair);
        info!(model = %self.model, "attempting structured-output generation");
        let result = self.call_model(&self.model, &full_prompt).await;
        if result.is_ok() {
            info!(model = %self.model, "structured-output generation succeeded");
        }
        result
    }

    async fn health(&self) -> BackendResult<HealthStatus> {
        let start = std::time::Instant::now();
        let url = format!("{}/{}", self.base_url, self.model);
        let response = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(HealthStatus {
            ok: response.status().is_success(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_markdown_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        let raw = "{\"a\":1}";
        assert_eq!(strip_markdown_fence(raw), "{\"a\":1}");
    }

    fn candidate_body(json_text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": json_text }] } }]
        })
    }

    #[tokio::test]
    async fn call_model_parses_fenced_candidate_text() {
        let server = MockServer::start().await;
        let body = candidate_body("```json\n{\"bad\":true}\n```");
        Mock::given(method("POST"))
            .and(path(format!("/{}:generateContent", MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("test-key", server.uri());
        let err = backend
            .call_model(MODEL, "a prompt")
            .await
            .unwrap_err();
        // Fence was stripped and the JSON was well-formed, just not a valid
        // AnimationSpec, so the failure is a schema mismatch, not a parse error.
        assert!(matches!(err, BackendError::MalformedOutput(ref m) if m.contains("schema mismatch")));
    }

    #[tokio::test]
    async fn call_model_maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{}:generateContent", MODEL)))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("test-key", server.uri());
        let err = backend
            .call_model(MODEL, "a prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::RateLimited));
    }

    #[tokio::test]
    async fn call_model_maps_safety_block_to_refused() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        });
        Mock::given(method("POST"))
            .and(path(format!("/{}:generateContent", MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("test-key", server.uri());
        let err = backend
            .call_model(MODEL, "a prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Refused(ref m) if m.contains("SAFETY")));
    }
}
