//! The local/secondary backend (spec §4.5 "fallback"). Implements the same
//! contract as the hosted backend without a network dependency, so the
//! orchestrator always has somewhere to go when the primary is
//! unavailable, rate limited, or times out.
//!
//! This is a small heuristic, not a model: it looks for allowlisted object
//! kinds, colors, and actions mentioned by name in the prompt and composes
//! the simplest spec consistent with what it found. It never fails with
//! `malformed_output` or `refused` — only a heuristic that finds nothing
//! usable falls back to a single default object.

use animathic_models::{
    AnimationSpec, Color, ObjectDecl, SceneKind, StepDecl, Style, ACTIONS, COLORS, OBJECT_KINDS,
};

use crate::backend::{HealthStatus, LlmBackend, RepairContext};
use crate::error::BackendResult;

pub struct LocalFallbackBackend;

impl LocalFallbackBackend {
    pub fn new() -> Self {
        Self
    }

    fn compose(&self, prompt: &str) -> AnimationSpec {
        let lower = prompt.to_lowercase();

        let kind = OBJECT_KINDS
            .iter()
            .find(|k| lower.contains(&k.to_lowercase()))
            .copied()
            .unwrap_or("Circle");

        let color = COLORS
            .iter()
            .find(|c| lower.contains(&c.to_lowercase()))
            .and_then(|c| c.parse::<Color>().ok())
            .unwrap_or(Color::White);

        let action = ACTIONS
            .iter()
            .find(|a| lower.contains(&a.to_lowercase()))
            .copied()
            .unwrap_or("FadeIn");

        AnimationSpec {
            scene_kind: SceneKind::TwoD,
            duration_hint: 2.0,
            background: Color::Black,
            objects: vec![ObjectDecl {
                id: "o".to_string(),
                kind: kind.to_string(),
                params: serde_json::Map::new(),
                style: Style {
                    color: Some(color),
                    ..Default::default()
                },
            }],
            steps: vec![StepDecl {
                action: action.to_string(),
                target_ids: vec!["o".to_string()],
                params: serde_json::Map::new(),
                run_time: 1.0,
                wait_after: 0.5,
            }],
            camera: None,
        }
    }
}

#[async_trait::async_trait]
impl LlmBackend for LocalFallbackBackend {
    fn name(&self) -> &str {
        "local-fallback"
    }

    async fn generate_spec(
        &self,
        prompt: &str,
        _repair: Option<&RepairContext>,
    ) -> BackendResult<AnimationSpec> {
        Ok(self.compose(prompt))
    }

    async fn health(&self) -> BackendResult<HealthStatus> {
        Ok(HealthStatus { ok: true, latency_ms: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn composes_spec_from_keywords() {
        let backend = LocalFallbackBackend::new();
        let spec = backend
            .generate_spec("Create a blue circle that fades in", None)
            .await
            .unwrap();
        assert_eq!(spec.objects[0].kind, "Circle");
        assert_eq!(spec.objects[0].style.color, Some(Color::Blue));
        assert_eq!(spec.steps[0].action, "FadeIn");
    }

    #[tokio::test]
    async fn falls_back_to_defaults_on_no_match() {
        let backend = LocalFallbackBackend::new();
        let spec = backend.generate_spec("do something interesting", None).await.unwrap();
        assert_eq!(spec.objects[0].kind, "Circle");
        assert_eq!(spec.steps[0].action, "FadeIn");
    }

    #[tokio::test]
    async fn produced_spec_passes_validation() {
        let backend = LocalFallbackBackend::new();
        let spec = backend.generate_spec("a red square", None).await.unwrap();
        assert!(spec.validate().is_ok());
    }
}
