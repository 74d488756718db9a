//! Renderer Adapter (C3): invokes the external animation tool as a
//! subprocess inside a sandbox directory with a fixed argument shape,
//! enforces a wall-clock timeout, and discovers the produced artifact.

pub mod error;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use animathic_sandbox::SandboxConfig;
use regex::Regex;
use tokio::process::Command;

pub use error::{RendererError, RendererResult};

/// The external animation library invoked as a subprocess (spec §6
/// "renderer invocation").
pub const RENDERER_TOOL: &str = "manim";

const RESOLUTION: &str = "1280,720";
const QUALITY: &str = "medium";
const GRACE_WINDOW: Duration = Duration::from_secs(5);
const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// One render invocation: a source file, the scene class it declares, and
/// the output directory the renderer writes into.
pub struct RenderRequest<'a> {
    pub source_path: &'a Path,
    pub scene_class: &'a str,
    pub output_dir: &'a Path,
}

/// Invoke the renderer, enforce `wall_timeout`, and return the path to the
/// newest produced artifact. `sandbox_dir` is also the process's working
/// directory.
pub async fn render(
    request: RenderRequest<'_>,
    sandbox_dir: &Path,
    sandbox_config: &SandboxConfig,
    wall_timeout: Duration,
) -> RendererResult<PathBuf> {
    let mut cmd = Command::new(RENDERER_TOOL);
    cmd.arg(request.source_path)
        .arg(request.scene_class)
        .arg("-o")
        .arg(request.output_dir)
        .args(["--format", "mp4"])
        .args(["--resolution", RESOLUTION])
        .args(["--quality", QUALITY])
        .arg("--disable_caching")
        .current_dir(sandbox_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    animathic_sandbox::configure_command(&mut cmd, sandbox_config);

    let mut child = cmd.spawn()?;
    let pid = child.id();

    let outcome = tokio::time::timeout(wall_timeout, child.wait_with_output()).await;

    let output = match outcome {
        Ok(result) => result?,
        Err(_elapsed) => {
            if let Some(pid) = pid {
                let _ = animathic_sandbox::signal_terminate(pid);
                tokio::time::sleep(GRACE_WINDOW).await;
                let _ = animathic_sandbox::signal_kill(pid);
            }
            tracing::warn!(wall_timeout_s = wall_timeout.as_secs(), "render exceeded wall clock, subprocess group killed");
            return Err(RendererError::Timeout(wall_timeout.as_secs()));
        }
    };

    if !output.status.success() {
        let stderr_tail = tail_stderr(&output.stderr);
        return Err(RendererError::NonzeroExit {
            code: output.status.code(),
            stderr_tail,
        });
    }

    find_artifact(request.output_dir, request.scene_class)
        .ok_or(RendererError::NoOutputArtifact)
}

/// Scan `<output_dir>/videos/<scene>/<quality>/` for the newest `.mp4`
/// (spec §4.3, §6).
fn find_artifact(output_dir: &Path, scene_class: &str) -> Option<PathBuf> {
    let subtree = output_dir.join("videos").join(scene_class).join(QUALITY);
    let entries = std::fs::read_dir(&subtree).ok()?;

    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("mp4"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

/// Last 4 KB of stderr with ANSI escape codes stripped (spec §4.3).
fn tail_stderr(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let ansi = Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("static ANSI pattern is valid");
    let stripped = ansi.replace_all(&text, "");
    let bytes = stripped.as_bytes();
    if bytes.len() <= STDERR_TAIL_BYTES {
        stripped.into_owned()
    } else {
        String::from_utf8_lossy(&bytes[bytes.len() - STDERR_TAIL_BYTES..]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi_codes_from_stderr() {
        let raw = b"\x1b[31merror:\x1b[0m something broke";
        assert_eq!(tail_stderr(raw), "error: something broke");
    }

    #[test]
    fn finds_newest_artifact_in_subtree() {
        let base = tempfile::tempdir().unwrap();
        let subtree = base.path().join("videos").join("GeneratedScene").join(QUALITY);
        std::fs::create_dir_all(&subtree).unwrap();
        let older = subtree.join("older.mp4");
        let newer = subtree.join("newer.mp4");
        std::fs::write(&older, b"a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&newer, b"b").unwrap();

        let found = find_artifact(base.path(), "GeneratedScene").unwrap();
        assert_eq!(found, newer);
    }

    #[test]
    fn missing_subtree_yields_none() {
        let base = tempfile::tempdir().unwrap();
        assert!(find_artifact(base.path(), "GeneratedScene").is_none());
    }
}
