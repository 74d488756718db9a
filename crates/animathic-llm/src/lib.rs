//! LLM Backend Abstraction (C5) and LLM Orchestrator (C6): structured-spec
//! generation with retry, bounded repair, and primary/fallback policy.

pub mod backend;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod orchestrator;
pub mod redact;

pub use backend::{spec_json_schema, system_instruction, HealthStatus, LlmBackend, RepairContext};
pub use config::LlmConfig;
pub use error::{BackendError, BackendResult, LlmError, LlmResult};
pub use fallback::LocalFallbackBackend;
pub use gemini::GeminiBackend;
pub use orchestrator::{AttemptRecordOutcome, BackendAttemptRecord, LlmOrchestrator, OrchestrationOutcome};
