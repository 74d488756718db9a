//! API server configuration (spec §6 "Configuration").

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub environment: String,
    /// `queue_max`: jobs queued beyond this are refused with `busy`.
    pub queue_max: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            environment: "development".to_string(),
            queue_max: 16,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| default.host.clone()),
            port: std::env::var("API_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(default.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| default.cors_origins.clone()),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_S").ok().and_then(|s| s.parse().ok()).unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| default.environment.clone()),
            queue_max: std::env::var("QUEUE_MAX").ok().and_then(|s| s.parse().ok()).unwrap_or(default.queue_max),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
