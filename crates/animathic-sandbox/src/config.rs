//! Sandbox configuration (spec §4.2, §6).

/// Recognized options: `{memory_mib, wall_timeout_s, cpu_timeout_s,
/// disable_limits}` (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct SandboxConfig {
    pub memory_mib: u64,
    pub wall_timeout_s: u64,
    pub cpu_timeout_s: u64,
    /// Skips all OS resource caps while keeping the working-directory
    /// discipline. Intended for development (spec §4.2).
    pub disable_limits: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_mib: 1024,
            wall_timeout_s: 120,
            cpu_timeout_s: 90,
            disable_limits: false,
        }
    }
}

impl SandboxConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            memory_mib: std::env::var("SANDBOX_MEMORY_MIB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.memory_mib),
            wall_timeout_s: std::env::var("SANDBOX_WALL_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.wall_timeout_s),
            cpu_timeout_s: std::env::var("SANDBOX_CPU_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.cpu_timeout_s),
            disable_limits: std::env::var("SANDBOX_DISABLE_LIMITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.disable_limits),
        }
    }
}
