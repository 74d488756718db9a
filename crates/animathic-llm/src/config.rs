//! LLM layer configuration (spec §6 `llm_primary`, `llm_fallback`,
//! `llm_attempt_budget`).

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub primary_api_key: Option<String>,
    pub attempt_budget: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary_api_key: None,
            attempt_budget: 3,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            primary_api_key: std::env::var("LLM_PRIMARY_API_KEY").ok(),
            attempt_budget: std::env::var("LLM_ATTEMPT_BUDGET")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.attempt_budget),
        }
    }
}
