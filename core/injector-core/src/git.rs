//! Minimal git plumbing through the `git` binary.
//!
//! Every call is all-or-nothing: a spawn failure or a non-zero exit is
//! treated as "no data" and logged, never returned as an error.

use std::path::{Path, PathBuf};
use std::process::Command;

fn run_git(repo: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(repo).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, repo = %repo.display(), "git unavailable");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            args = ?args,
            status = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git command failed"
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Staged paths, joined onto `repo`.
pub fn staged_files(repo: &Path) -> Vec<PathBuf> {
    run_git(repo, &["diff", "--cached", "--name-only"])
        .map(|stdout| parse_name_list(repo, &stdout))
        .unwrap_or_default()
}

/// Full hash of `HEAD`.
pub fn head_commit(repo: &Path) -> Option<String> {
    run_git(repo, &["rev-parse", "HEAD"])
        .map(|stdout| stdout.trim().to_string())
        .filter(|hash| !hash.is_empty())
}

fn parse_name_list(repo: &Path, stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| repo.join(line))
        .collect()
}
