//! JSON record reading and writing.
//!
//! # Reading
//!
//! [`read_record`] is used where one specific file is targeted; a parse
//! failure is an error carrying the path. [`scan_records`] is used for
//! listings and batches: malformed files are skipped and reported in the
//! returned [`ScanReport`] instead of aborting the walk.
//!
//! # Atomic Writes
//!
//! Records are written back with two-space indentation through a temp file
//! in the same directory and a rename, so the extension never observes a
//! half-written cache file.

use fs_err as fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{InjectError, Result};

pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| InjectError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(record)?;
    write_file_atomic(path, &content)?;
    tracing::debug!(path = %path.display(), "Record written");
    Ok(())
}

fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// A file that could not be read as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of reading a batch of record files.
#[derive(Debug)]
pub struct ScanReport<T> {
    pub records: Vec<(PathBuf, T)>,
    pub skipped: Vec<Skipped>,
}

impl<T> Default for ScanReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> ScanReport<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps only the loaded records matching `keep`. Skipped entries stay.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.records.retain(|(_, record)| keep(record));
    }
}

/// Reads every path in order, keeping the ones that parse as `T`.
pub fn scan_records<T: DeserializeOwned>(paths: &[PathBuf]) -> ScanReport<T> {
    let mut report = ScanReport::default();
    for path in paths {
        match read_record::<T>(path) {
            Ok(record) => report.records.push((path.clone(), record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                report.skipped.push(Skipped {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}
