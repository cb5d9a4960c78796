use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InjectError {
    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("No session found in {}", .0.display())]
    NoSession(PathBuf),

    #[error("Repository cache not found: {name} (available: {})", .available.join(", "))]
    RepoNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Nothing to inject: {0}")]
    NothingToInject(String),

    #[error("Document state is unreadable: {} ({reason})", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("AI ratio must be a number between 0 and 1, got {0}")]
    InvalidRatio(f64),

    #[error("Not a git repository (no .git/hooks): {}", .0.display())]
    NotGitRepo(PathBuf),

    #[error("Existing {0} hook was not installed by this tool (use --force to replace it)")]
    ForeignHook(String),

    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist temp file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, InjectError>;
