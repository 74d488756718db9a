//! LLM Orchestrator (C6): policy layer across backends. Selects a backend,
//! bounds retries, parses/repairs structured output, downgrades on
//! failure (spec §4.6).

use animathic_models::AnimationSpec;

use crate::backend::{LlmBackend, RepairContext};
use crate::error::{BackendError, LlmError, LlmResult};

const MAX_REPAIR_ATTEMPTS: u32 = 2;
const DEFAULT_ATTEMPT_BUDGET: u32 = 3;

/// Outcome of a single call into a backend, kept for the caller to persist
/// as `GenerationAttempt` rows (spec §3).
#[derive(Debug, Clone)]
pub struct BackendAttemptRecord {
    pub backend: String,
    pub outcome: AttemptRecordOutcome,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptRecordOutcome {
    SpecOk,
    Malformed,
    Failed,
}

pub struct OrchestrationOutcome {
    pub spec: AnimationSpec,
    pub backend_used: String,
    pub records: Vec<BackendAttemptRecord>,
}

pub struct LlmOrchestrator {
    primary: Box<dyn LlmBackend>,
    fallback: Box<dyn LlmBackend>,
    attempt_budget: u32,
}

impl LlmOrchestrator {
    pub fn new(primary: Box<dyn LlmBackend>, fallback: Box<dyn LlmBackend>) -> Self {
        Self {
            primary,
            fallback,
            attempt_budget: DEFAULT_ATTEMPT_BUDGET,
        }
    }

    pub fn with_attempt_budget(mut self, budget: u32) -> Self {
        self.attempt_budget = budget;
        self
    }

    /// Generate a spec for `prompt`, optionally seeded with a diagnostic
    /// from an earlier pipeline stage (validator or renderer feedback fed
    /// back per the §4.9 state machine).
    pub async fn generate(
        &self,
        prompt: &str,
        seed_diagnostic: Option<String>,
    ) -> (LlmResult<OrchestrationOutcome>, Vec<BackendAttemptRecord>) {
        let mut records = Vec::new();
        let mut attempts_used = 0u32;
        let mut repair_attempts = 0u32;
        let mut on_primary = true;
        let mut repair_ctx = seed_diagnostic.map(RepairContext::new);
        let mut last_error: Option<BackendError> = None;

        loop {
            if attempts_used >= self.attempt_budget {
                let err = last_error.unwrap_or(BackendError::Unavailable("no attempts made".to_string()));
                return (Err(LlmError::Exhausted(err)), records);
            }
            attempts_used += 1;

            let backend: &dyn LlmBackend = if on_primary {
                self.primary.as_ref()
            } else {
                self.fallback.as_ref()
            };

            match backend.generate_spec(prompt, repair_ctx.as_ref()).await {
                Ok(spec) => {
                    records.push(BackendAttemptRecord {
                        backend: backend.name().to_string(),
                        outcome: AttemptRecordOutcome::SpecOk,
                        error: None,
                    });
                    return (
                        Ok(OrchestrationOutcome {
                            spec,
                            backend_used: backend.name().to_string(),
                            records: records.clone(),
                        }),
                        records,
                    );
                }
                Err(BackendError::Refused(msg)) => {
                    records.push(BackendAttemptRecord {
                        backend: backend.name().to_string(),
                        outcome: AttemptRecordOutcome::Failed,
                        error: Some(msg.clone()),
                    });
                    // Refusals are never laundered by switching backends (spec §4.6).
                    return (Err(LlmError::Refused(msg)), records);
                }
                Err(BackendError::MalformedOutput(diag)) => {
                    records.push(BackendAttemptRecord {
                        backend: backend.name().to_string(),
                        outcome: AttemptRecordOutcome::Malformed,
                        error: Some(diag.clone()),
                    });
                    last_error = Some(BackendError::MalformedOutput(diag.clone()));
                    if repair_attempts < MAX_REPAIR_ATTEMPTS {
                        repair_attempts += 1;
                        repair_ctx = Some(RepairContext::new(diag));
                    } else {
                        on_primary = !on_primary;
                        repair_ctx = None;
                        repair_attempts = 0;
                    }
                }
                Err(e @ (BackendError::Unavailable(_) | BackendError::Timeout | BackendError::RateLimited)) => {
                    records.push(BackendAttemptRecord {
                        backend: backend.name().to_string(),
                        outcome: AttemptRecordOutcome::Failed,
                        error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                    if on_primary {
                        on_primary = false;
                        repair_ctx = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HealthStatus;
    use animathic_models::{Color, ObjectDecl, SceneKind, StepDecl, Style};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedBackend {
        name: &'static str,
        responses: Vec<crate::error::BackendResult<AnimationSpec>>,
        calls: AtomicU32,
    }

    fn sample_spec() -> AnimationSpec {
        AnimationSpec {
            scene_kind: SceneKind::TwoD,
            duration_hint: 1.0,
            background: Color::Black,
            objects: vec![ObjectDecl {
                id: "o".to_string(),
                kind: "Circle".to_string(),
                params: serde_json::Map::new(),
                style: Style::default(),
            }],
            steps: vec![StepDecl {
                action: "FadeIn".to_string(),
                target_ids: vec!["o".to_string()],
                params: serde_json::Map::new(),
                run_time: 1.0,
                wait_after: 0.0,
            }],
            camera: None,
        }
    }

    #[async_trait::async_trait]
    impl LlmBackend for ScriptedBackend {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate_spec(
            &self,
            _prompt: &str,
            _repair: Option<&RepairContext>,
        ) -> crate::error::BackendResult<AnimationSpec> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses
                .get(idx)
                .cloned()
                .unwrap_or(Err(BackendError::Unavailable("exhausted script".to_string())))
        }

        async fn health(&self) -> crate::error::BackendResult<HealthStatus> {
            Ok(HealthStatus { ok: true, latency_ms: 0 })
        }
    }

    #[tokio::test]
    async fn happy_path_uses_primary() {
        let primary = ScriptedBackend {
            name: "primary",
            responses: vec![Ok(sample_spec())],
            calls: AtomicU32::new(0),
        };
        let fallback = ScriptedBackend {
            name: "fallback",
            responses: vec![],
            calls: AtomicU32::new(0),
        };
        let orchestrator = LlmOrchestrator::new(Box::new(primary), Box::new(fallback));
        let (result, _records) = orchestrator.generate("a circle", None).await;
        assert_eq!(result.unwrap().backend_used, "primary");
    }

    #[tokio::test]
    async fn unavailable_primary_falls_back() {
        let primary = ScriptedBackend {
            name: "primary",
            responses: vec![Err(BackendError::Unavailable("down".to_string()))],
            calls: AtomicU32::new(0),
        };
        let fallback = ScriptedBackend {
            name: "fallback",
            responses: vec![Ok(sample_spec())],
            calls: AtomicU32::new(0),
        };
        let orchestrator = LlmOrchestrator::new(Box::new(primary), Box::new(fallback));
        let (result, _records) = orchestrator.generate("a circle", None).await;
        assert_eq!(result.unwrap().backend_used, "fallback");
    }

    #[tokio::test]
    async fn refusal_is_not_laundered_through_fallback() {
        let primary = ScriptedBackend {
            name: "primary",
            responses: vec![Err(BackendError::Refused("policy".to_string()))],
            calls: AtomicU32::new(0),
        };
        let fallback = ScriptedBackend {
            name: "fallback",
            responses: vec![Ok(sample_spec())],
            calls: AtomicU32::new(0),
        };
        let orchestrator = LlmOrchestrator::new(Box::new(primary), Box::new(fallback));
        let (result, records) = orchestrator.generate("a circle", None).await;
        assert!(matches!(result.unwrap_err(), LlmError::Refused(_)));
        assert_eq!(records.len(), 1, "no fallback attempt should be recorded after a refusal");
    }

    #[tokio::test]
    async fn malformed_output_triggers_repair_then_succeeds() {
        let primary = ScriptedBackend {
            name: "primary",
            responses: vec![
                Err(BackendError::MalformedOutput("missing style".to_string())),
                Ok(sample_spec()),
            ],
            calls: AtomicU32::new(0),
        };
        let fallback = ScriptedBackend {
            name: "fallback",
            responses: vec![],
            calls: AtomicU32::new(0),
        };
        let orchestrator = LlmOrchestrator::new(Box::new(primary), Box::new(fallback));
        let (result, records) = orchestrator.generate("a circle", None).await;
        assert!(result.is_ok());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, AttemptRecordOutcome::Malformed);
        assert_eq!(records[1].outcome, AttemptRecordOutcome::SpecOk);
    }

    #[tokio::test]
    async fn exhausts_after_attempt_budget() {
        let primary = ScriptedBackend {
            name: "primary",
            responses: vec![
                Err(BackendError::Unavailable("down".to_string())),
            ],
            calls: AtomicU32::new(0),
        };
        let fallback = ScriptedBackend {
            name: "fallback",
            responses: vec![
                Err(BackendError::Unavailable("also down".to_string())),
                Err(BackendError::Unavailable("still down".to_string())),
            ],
            calls: AtomicU32::new(0),
        };
        let orchestrator = LlmOrchestrator::new(Box::new(primary), Box::new(fallback)).with_attempt_budget(3);
        let (result, records) = orchestrator.generate("a circle", None).await;
        assert!(matches!(result.unwrap_err(), LlmError::Exhausted(_)));
        assert_eq!(records.len(), 3);
    }
}
