//! LLM Backend Abstraction (C5): polymorphic over providers.

use animathic_models::{AnimationSpec, ACTIONS, COLORS, OBJECT_KINDS};

use crate::error::BackendResult;

/// Context fed back into a backend on a repair or retry pass: the previous
/// malformed output (if any) plus a diagnostic describing what was wrong,
/// whether that diagnostic came from JSON parsing, spec validation, or the
/// renderer (spec §4.6, §4.9).
#[derive(Debug, Clone)]
pub struct RepairContext {
    pub previous_output: Option<String>,
    pub diagnostic: String,
}

impl RepairContext {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            previous_output: None,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn with_previous_output(mut self, output: impl Into<String>) -> Self {
        self.previous_output = Some(output.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HealthStatus {
    pub ok: bool,
    pub latency_ms: u64,
}

/// A concrete LLM provider implementing the `generate_spec` capability
/// (spec §4.5). Backends do not retry internally; all retry and fallback
/// policy lives in the orchestrator (C6).
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_spec(
        &self,
        prompt: &str,
        repair: Option<&RepairContext>,
    ) -> BackendResult<AnimationSpec>;

    async fn health(&self) -> BackendResult<HealthStatus>;
}

/// The short system instruction every backend attaches, enumerating the
/// allowlisted vocabulary and the JSON schema contract (spec §4.5).
pub fn system_instruction() -> String {
    format!(
        "You generate a structured animation specification as a single JSON object matching \
         the AnimationSpec schema. Only use these object kinds: {}. Only use these actions: {}. \
         Only use these colors: {}. scene_kind must be one of \"2d\", \"moving_camera\", \"3d\". \
         Every object id must match [a-z][a-z0-9_]{{0,31}} and be declared before any step \
         references it. Return ONLY the JSON object, no markdown fencing, no commentary.",
        OBJECT_KINDS.join(", "),
        ACTIONS.join(", "),
        COLORS.join(", "),
    )
}

/// The machine-checkable JSON schema handed to each backend alongside the
/// system instruction (spec §4.5).
pub fn spec_json_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(AnimationSpec))
        .expect("AnimationSpec schema is always representable as JSON")
}
