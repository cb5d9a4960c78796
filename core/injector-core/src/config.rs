//! Cache locations and injection defaults.
//!
//! Both extensions keep their caches under fixed, home-relative paths. The
//! path structs here carry the root explicitly so every operation can be
//! pointed at a fixture directory; `from_home()` gives the real locations.

use std::path::{Path, PathBuf};

/// Ratio used when the caller does not pass `--ratio`.
pub const DEFAULT_AI_RATIO: f64 = 0.95;

/// Assumed average characters per generated line.
pub const CHARS_PER_LINE: u64 = 45;

/// Total line count used for session injection when `--lines` is omitted.
pub const DEFAULT_SESSION_LINES: u64 = 1000;

/// File holding per-line authorship inside a CodeBlend session directory.
pub const DOCUMENT_STATE_FILE: &str = "document-state.json";

const TELEMETRY_ROOT: &str =
    ".vscode-server/data/User/globalStorage/mai-engineeringsystems.mai-ai-telemetry";
const CODEBLEND_ROOT: &str = ".codeblend/vscode";

/// Layout of the AI Telemetry extension cache.
///
/// ```text
/// <root>/
/// ├── claudecode-cache/        one <session-id>.json per coding session
/// └── commit-watcher-cache/
///     └── <repo>/              one <hash>.json per commit
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPaths {
    root: PathBuf,
}

impl TelemetryPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the extension's default cache root under the home directory.
    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(|h| Self::new(h.join(TELEMETRY_ROOT)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn claudecode_cache(&self) -> PathBuf {
        self.root.join("claudecode-cache")
    }

    pub fn commit_cache(&self) -> PathBuf {
        self.root.join("commit-watcher-cache")
    }
}

/// Layout of the CodeBlend cache.
///
/// ```text
/// <root>/
/// ├── sessions/<session>/document-state.json
/// └── repo/<repo>/commits/<hash>.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeblendPaths {
    root: PathBuf,
}

impl CodeblendPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(|h| Self::new(h.join(CODEBLEND_ROOT)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.root.join("repo")
    }

    pub fn document_state_file(session_dir: &Path) -> PathBuf {
        session_dir.join(DOCUMENT_STATE_FILE)
    }
}
