//! Fixed caps enforced on synthesized source (spec §4.1).

pub const MAX_SOURCE_BYTES: usize = 20 * 1024;
pub const MAX_NESTING_DEPTH: usize = 8;
pub const MAX_LOOP_COUNT: usize = 20;

/// The only import the synthesizer may wildcard-import.
pub const ANIMATION_LIB_MODULE: &str = "manim";

/// The only numeric helper import permitted alongside the animation library.
pub const NUMERIC_HELPER_MODULE: &str = "numpy";

pub const REQUIRED_SCENE_CLASS: &str = "GeneratedScene";
pub const REQUIRED_METHOD_NAME: &str = "construct";

/// Names whose mere appearance as an identifier is a sandbox escape
/// regardless of context (spec §4.1).
pub const BANNED_IDENTIFIERS: &[&str] = &[
    "exec",
    "eval",
    "compile",
    "open",
    "input",
    "__import__",
    "os",
    "sys",
    "subprocess",
    "socket",
    "shutil",
    "pathlib",
    "importlib",
    "ctypes",
    "requests",
    "urllib",
    "http",
];
