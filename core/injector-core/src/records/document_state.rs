//! CodeBlend per-line authorship state.
//!
//! Stored in `sessions/<session>/document-state.json` as a map from absolute
//! file path to one status code per line:
//!
//! ```json
//! {
//!   "/repo/src/main.rs": [0, 1, 1, 2, 2]
//! }
//! ```
//!
//! `0` = unmodified, `1` = human, `2` = AI. Any other code, and any entry
//! that is not an array, is written back unchanged. This is the only record
//! the extension reads back before a commit is finalized.
//!
//! # Loading
//!
//! The extension rewrites this file while the editor runs, so loading is
//! lenient: a missing file, an empty file, or corrupt JSON all produce an empty
//! store (with a warning) rather than an error; [`DocumentStateStore::load_error`]
//! tells a corrupt file apart from an empty one. An empty store is never
//! saved by the callers, so a corrupt file is left alone.

use fs_err as fs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::ratio::{AiRatio, Split};
use crate::store::write_record;

/// Authorship of one tracked line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum LineStatus {
    Unmodified,
    Human,
    Ai,
    /// A code this crate does not know; preserved as-is.
    Other(Value),
}

impl From<Value> for LineStatus {
    fn from(code: Value) -> Self {
        match code.as_u64() {
            Some(0) => LineStatus::Unmodified,
            Some(1) => LineStatus::Human,
            Some(2) => LineStatus::Ai,
            _ => LineStatus::Other(code),
        }
    }
}

impl From<LineStatus> for Value {
    fn from(status: LineStatus) -> Self {
        match status {
            LineStatus::Unmodified => Value::from(0),
            LineStatus::Human => Value::from(1),
            LineStatus::Ai => Value::from(2),
            LineStatus::Other(code) => code,
        }
    }
}

/// Line counts for one tracked file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAuthorship {
    pub path: String,
    pub lines: usize,
    pub split: Split,
}

/// On-disk shape: tracked files first, then entries kept verbatim.
#[derive(Serialize)]
struct StateFile<'a> {
    #[serde(flatten)]
    files: &'a BTreeMap<String, Vec<LineStatus>>,
    #[serde(flatten)]
    opaque: &'a BTreeMap<String, Value>,
}

/// The document-state map, optionally backed by a file.
#[derive(Debug, Default)]
pub struct DocumentStateStore {
    files: BTreeMap<String, Vec<LineStatus>>,
    /// Entries whose value is not a line array.
    opaque: BTreeMap<String, Value>,
    file_path: Option<PathBuf>,
    load_error: Option<String>,
}

impl DocumentStateStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: Some(file_path.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn load(file_path: &Path) -> Result<Self> {
        if !file_path.exists() {
            return Ok(Self::new(file_path));
        }

        let content = fs::read_to_string(file_path)?;

        if content.trim().is_empty() {
            tracing::warn!(path = %file_path.display(), "Empty document state");
            return Ok(Self::new(file_path));
        }

        match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
            Ok(entries) => {
                let mut store = Self::new(file_path);
                for (path, value) in entries {
                    match value {
                        Value::Array(codes) => {
                            store
                                .files
                                .insert(path, codes.into_iter().map(LineStatus::from).collect());
                        }
                        other => {
                            tracing::warn!(path = %path, "Document state entry is not a line list");
                            store.opaque.insert(path, other);
                        }
                    }
                }
                Ok(store)
            }
            Err(e) => {
                tracing::warn!(
                    path = %file_path.display(),
                    error = %e,
                    "Failed to parse document state, treating as empty"
                );
                Ok(Self {
                    load_error: Some(e.to_string()),
                    ..Self::new(file_path)
                })
            }
        }
    }

    /// Why the backing file could not be parsed, when loading fell back to
    /// an empty store.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        match &self.file_path {
            Some(path) => write_record(
                path,
                &StateFile {
                    files: &self.files,
                    opaque: &self.opaque,
                },
            ),
            None => Ok(()),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn lines(&self, path: &str) -> Option<&[LineStatus]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn insert(&mut self, path: &str, lines: Vec<LineStatus>) {
        self.files.insert(path.to_string(), lines);
    }

    /// Per-file AI/human line counts, in path order.
    pub fn authorship(&self) -> Vec<FileAuthorship> {
        self.files
            .iter()
            .map(|(path, lines)| {
                let count = |wanted: LineStatus| lines.iter().filter(|s| **s == wanted).count();
                FileAuthorship {
                    path: path.clone(),
                    lines: lines.len(),
                    split: Split {
                        ai: count(LineStatus::Ai) as u64,
                        human: count(LineStatus::Human) as u64,
                    },
                }
            })
            .collect()
    }

    /// Marks the first `floor(n * r)` lines of `path` as AI and the rest as human.
    ///
    /// Returns false for untracked paths and files with no tracked lines.
    pub fn inject_file(&mut self, path: &str, ratio: AiRatio) -> bool {
        let Some(lines) = self.files.get_mut(path) else {
            return false;
        };
        let total = lines.len();
        if total == 0 {
            return false;
        }

        let ai = ratio.ai_count(total as u64) as usize;
        *lines = (0..total)
            .map(|i| if i < ai { LineStatus::Ai } else { LineStatus::Human })
            .collect();
        true
    }

    /// Injects every tracked file. Returns how many files changed.
    pub fn inject_all(&mut self, ratio: AiRatio) -> usize {
        let paths: Vec<String> = self.files.keys().cloned().collect();
        self.inject_files(&paths, ratio)
    }

    /// Injects the given paths only. Returns how many files changed.
    pub fn inject_files<S: AsRef<str>>(&mut self, paths: &[S], ratio: AiRatio) -> usize {
        paths
            .iter()
            .filter(|path| self.inject_file(path.as_ref(), ratio))
            .count()
    }
}
