//! Resource Sandbox (C2): scoped acquisition of a per-job working directory
//! and OS-level limits on the render subprocess, with guaranteed release on
//! every exit path.

pub mod config;
pub mod error;

use std::os::unix::process::CommandExt;
use std::path::Path;

use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{setsid, Pid};

pub use config::SandboxConfig;
pub use error::{SandboxError, SandboxResult};

/// Owns a job's working directory. The directory (and everything the
/// renderer wrote into it) is removed when this guard is dropped, whether
/// that happens via an explicit [`RenderJobGuard::finish`] on the success
/// path or via an early return, panic, or cancellation elsewhere.
pub struct RenderJobGuard {
    dir: tempfile::TempDir,
    job_id: String,
    finished: bool,
}

impl RenderJobGuard {
    /// Create a fresh per-job directory under `base_dir`.
    pub fn acquire(base_dir: &Path, job_id: impl Into<String>) -> SandboxResult<Self> {
        let job_id = job_id.into();
        std::fs::create_dir_all(base_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("animathic-{}-", job_id))
            .tempdir_in(base_dir)?;
        Ok(Self {
            dir,
            job_id,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Mark the scope as cleanly finished. The directory is still removed
    /// by `Drop`; this only distinguishes a clean exit from an early one in
    /// logs.
    pub fn finish(mut self) {
        self.finished = true;
        tracing::debug!(job_id = %self.job_id, "sandbox scope finished cleanly");
    }
}

impl Drop for RenderJobGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                job_id = %self.job_id,
                path = %self.dir.path().display(),
                "sandbox directory released on an early exit path"
            );
        }
    }
}

/// Configure `command` to run as the leader of its own process group, with
/// address-space and CPU-time caps applied inside the forked child before
/// exec. If a cap can't be honored (host refuses it, e.g. current usage
/// already exceeds the requested bound), the child logs a warning to
/// stderr and proceeds without that cap rather than failing to spawn
/// (spec §4.2).
///
/// Safety: the closure passed to `pre_exec` runs in the forked child
/// between `fork` and `exec`, so it must only call async-signal-safe
/// functions. `setrlimit`/`setsid` are.
pub fn configure_command<C: CommandExt>(command: &mut C, config: &SandboxConfig) {
    if config.disable_limits {
        return;
    }

    let memory_bytes = config.memory_mib * 1024 * 1024;
    let cpu_seconds = config.cpu_timeout_s;

    unsafe {
        command.pre_exec(move || {
            if let Err(e) = setsid() {
                eprintln!("animathic-sandbox: setsid failed: {e}");
            }
            if let Err(e) = setrlimit(Resource::RLIMIT_AS, memory_bytes, memory_bytes) {
                eprintln!("animathic-sandbox: could not set RLIMIT_AS to {memory_bytes} bytes: {e}, proceeding uncapped");
            }
            if let Err(e) = setrlimit(Resource::RLIMIT_CPU, cpu_seconds, cpu_seconds) {
                eprintln!("animathic-sandbox: could not set RLIMIT_CPU to {cpu_seconds}s: {e}, proceeding uncapped");
            }
            Ok(())
        });
    }
}

/// Send `SIGTERM` to the process group led by `pid` (spec §4.2: graceful
/// termination on wall-clock expiry). The caller is expected to wait a
/// short grace window and then call [`signal_kill`] if the group is still
/// alive.
pub fn signal_terminate(pid: u32) -> SandboxResult<()> {
    send_to_group(pid, Signal::SIGTERM)
}

/// Forcibly kill the process group led by `pid`.
pub fn signal_kill(pid: u32) -> SandboxResult<()> {
    send_to_group(pid, Signal::SIGKILL)
}

fn send_to_group(pid: u32, signal: Signal) -> SandboxResult<()> {
    // A negative pid targets the whole process group; configure_command
    // made the child its own group leader via setsid.
    let group = Pid::from_raw(-(pid as i32));
    kill(group, signal).map_err(|e| SandboxError::SignalFailed(pid as i32, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_and_removes_directory() {
        let base = tempfile::tempdir().unwrap();
        let path;
        {
            let guard = RenderJobGuard::acquire(base.path(), "job-1").unwrap();
            path = guard.path().to_path_buf();
            assert!(path.exists());
            guard.finish();
        }
        assert!(!path.exists());
    }

    #[test]
    fn directory_removed_even_without_explicit_finish() {
        let base = tempfile::tempdir().unwrap();
        let path;
        {
            let guard = RenderJobGuard::acquire(base.path(), "job-2").unwrap();
            path = guard.path().to_path_buf();
        }
        assert!(!path.exists());
    }

    #[test]
    fn disable_limits_skips_pre_exec() {
        let config = SandboxConfig {
            disable_limits: true,
            ..SandboxConfig::default()
        };
        let mut cmd = std::process::Command::new("true");
        configure_command(&mut cmd, &config);
        // No assertion beyond "doesn't panic": pre_exec is opaque once set.
    }
}
