//! AI Telemetry extension cache: Claude Code sessions and commit watcher.
//!
//! Only the local cache files are rewritten. Data the extension has already
//! uploaded is unaffected.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::config::TelemetryPaths;
use crate::error::{InjectError, Result};
use crate::locate;
use crate::ratio::{AiRatio, Split};
use crate::records::{ClaudeSession, SessionInjection, WatcherCommit};
use crate::store::{read_record, scan_records, write_record, ScanReport};

const STATUS_SESSIONS: usize = 5;
const STATUS_COMMITS_PER_REPO: usize = 3;

/// Result of injecting one session file.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub path: PathBuf,
    pub session_id: String,
    pub change: SessionInjection,
}

/// Result of injecting one commit file.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub path: PathBuf,
    pub hash: String,
    pub totals: Split,
}

/// Result of a batch injection over a repo's commits.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub repo: String,
    /// Records selected for injection (after the date filter).
    pub selected: usize,
    pub injected: Vec<CommitReport>,
    /// Records that failed to parse or to write.
    pub skipped: Vec<crate::store::Skipped>,
}

#[derive(Debug)]
pub struct RepoStatus {
    pub name: String,
    pub commit_count: usize,
    /// Most recently modified commits.
    pub recent: ScanReport<WatcherCommit>,
}

#[derive(Debug)]
pub struct TelemetryStatus {
    /// `None` when the session cache directory does not exist.
    pub sessions: Option<ScanReport<ClaudeSession>>,
    /// `None` when the commit cache directory does not exist.
    pub repos: Option<Vec<RepoStatus>>,
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct TelemetryCache {
    paths: TelemetryPaths,
}

impl TelemetryCache {
    pub fn new(paths: TelemetryPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &TelemetryPaths {
        &self.paths
    }

    pub fn status(&self) -> TelemetryStatus {
        let sessions = locate::json_files(&self.paths.claudecode_cache())
            .ok()
            .map(|files| {
                let recent: Vec<_> = locate::newest_first(files)
                    .into_iter()
                    .take(STATUS_SESSIONS)
                    .collect();
                scan_records(&recent)
            });

        let repos = locate::subdirs(&self.paths.commit_cache()).ok().map(|dirs| {
            dirs.iter()
                .map(|dir| {
                    let commits = locate::json_files(dir).unwrap_or_default();
                    let commit_count = commits.len();
                    let recent: Vec<_> = locate::newest_first(commits)
                        .into_iter()
                        .take(STATUS_COMMITS_PER_REPO)
                        .collect();
                    RepoStatus {
                        name: dir_name(dir),
                        commit_count,
                        recent: scan_records(&recent),
                    }
                })
                .collect()
        });

        TelemetryStatus { sessions, repos }
    }

    /// Locates a session file: `<cache>/<id>.json`, or the newest by mtime.
    pub fn find_session(&self, session_id: Option<&str>) -> Result<PathBuf> {
        let cache = self.paths.claudecode_cache();
        if !cache.is_dir() {
            return Err(InjectError::MissingDir(cache));
        }

        let path = match session_id {
            Some(id) => cache.join(format!("{}.json", id)),
            None => locate::latest_json(&cache)?.ok_or(InjectError::NoSession(cache))?,
        };

        if !path.is_file() {
            return Err(InjectError::MissingFile(path));
        }
        Ok(path)
    }

    /// Overwrites a session's generated line and character counts.
    pub fn inject_session(
        &self,
        session_id: Option<&str>,
        ratio: AiRatio,
        total_lines: u64,
    ) -> Result<SessionReport> {
        let path = self.find_session(session_id)?;
        let mut session: ClaudeSession = read_record(&path)?;

        let change = session.inject(total_lines, ratio);
        write_record(&path, &session)?;

        tracing::info!(
            path = %path.display(),
            previous = change.previous_lines,
            lines = change.lines,
            "Session injected"
        );

        Ok(SessionReport {
            session_id: session.session_id.unwrap_or_else(|| stem(&path)),
            path,
            change,
        })
    }

    pub fn resolve_repo(&self, repo: Option<&str>) -> Result<PathBuf> {
        locate::resolve_repo_dir(&self.paths.commit_cache(), repo)
    }

    /// Rewrites the first commit in the repo whose hash starts with `hash`.
    pub fn inject_commit(
        &self,
        hash: &str,
        repo: Option<&str>,
        ratio: AiRatio,
    ) -> Result<CommitReport> {
        let repo_dir = self.resolve_repo(repo)?;
        let path = locate::find_by_prefix(&repo_dir, hash)?
            .ok_or_else(|| InjectError::CommitNotFound(hash.to_string()))?;
        self.inject_commit_file(&path, ratio)
    }

    pub fn inject_commit_file(&self, path: &Path, ratio: AiRatio) -> Result<CommitReport> {
        let mut commit: WatcherCommit = read_record(path)?;
        let totals = commit.inject(ratio, Utc::now());
        write_record(path, &commit)?;

        tracing::info!(
            path = %path.display(),
            total = totals.total(),
            ai = totals.ai,
            "Commit injected"
        );

        Ok(CommitReport {
            path: path.to_path_buf(),
            hash: commit.hash.unwrap_or_else(|| stem(path)),
            totals,
        })
    }

    /// Rewrites every commit of a repo, optionally only those dated on or
    /// after `since`.
    pub fn inject_all(
        &self,
        repo: Option<&str>,
        ratio: AiRatio,
        since: Option<NaiveDate>,
    ) -> Result<BatchReport> {
        let repo_dir = self.resolve_repo(repo)?;
        let files = locate::json_files(&repo_dir)?;

        let mut scan = scan_records::<WatcherCommit>(&files);
        if let Some(since) = since {
            scan.retain(|commit| commit.committed_since(since));
        }

        let mut report = BatchReport {
            repo: dir_name(&repo_dir),
            selected: scan.records.len(),
            skipped: scan.skipped,
            ..Default::default()
        };

        let now = Utc::now();
        for (path, mut commit) in scan.records {
            let totals = commit.inject(ratio, now);
            match write_record(&path, &commit) {
                Ok(()) => report.injected.push(CommitReport {
                    hash: commit.hash.unwrap_or_else(|| stem(&path)),
                    path,
                    totals,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to write commit");
                    report.skipped.push(crate::store::Skipped {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            repo = %report.repo,
            injected = report.injected.len(),
            skipped = report.skipped.len(),
            "Batch injection finished"
        );
        Ok(report)
    }
}
