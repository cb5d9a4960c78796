//! `ai-telemetry-injector`: rewrites the AI Telemetry extension's caches.
//!
//! Session files live in `claudecode-cache/`, commit records in
//! `commit-watcher-cache/<repo>/`. Only the local cache changes; anything the
//! extension already uploaded is unaffected.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use injector_core::config::{TelemetryPaths, DEFAULT_SESSION_LINES};
use injector_core::telemetry::{BatchReport, CommitReport, TelemetryCache, TelemetryStatus};
use injector_core::{AiRatio, InjectError, Result};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::output::{banner, skipped_line, truncate};

const DEFAULT_RATIO: &str = "0.95";

/// Rewrite AI authorship numbers in the AI Telemetry extension's local cache
#[derive(Parser, Debug)]
#[command(name = "ai-telemetry-injector", version, about, long_about = None)]
pub struct Cli {
    /// Extension storage directory (defaults to VS Code's globalStorage)
    #[arg(long, global = true, env = "AI_TELEMETRY_DIR", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Command to execute (defaults to `status`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Show recent sessions and commits
    Status,

    /// Overwrite a Claude Code session's generated line counts
    Session {
        /// Session id (file stem); defaults to the most recently modified session
        #[arg(long)]
        session_id: Option<String>,

        /// AI ratio between 0 and 1
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,

        /// Total lines to attribute
        #[arg(short, long, default_value_t = DEFAULT_SESSION_LINES)]
        lines: u64,
    },

    /// Rewrite one commit record
    Commit {
        /// Commit hash or prefix
        hash: String,

        /// Repository cache name (exact or substring)
        #[arg(short = 'R', long)]
        repo: Option<String>,

        /// AI ratio between 0 and 1
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,
    },

    /// Rewrite every commit record of a repository
    All {
        /// Repository cache name (exact or substring)
        #[arg(short = 'R', long)]
        repo: Option<String>,

        /// AI ratio between 0 and 1
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,

        /// Only commits dated on or after this day
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_since)]
        since: Option<NaiveDate>,
    },
}

fn parse_since(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", raw))
}

fn paths(cli: &Cli) -> Result<TelemetryPaths> {
    match &cli.root {
        Some(root) => Ok(TelemetryPaths::new(root)),
        None => TelemetryPaths::from_home().ok_or(InjectError::NoHomeDir),
    }
}

/// Runs the command and returns what should be printed on stdout.
pub fn execute(cli: &Cli) -> Result<String> {
    let cache = TelemetryCache::new(paths(cli)?);
    let command = cli.command.clone().unwrap_or(Commands::Status);
    tracing::debug!(?command, root = %cache.paths().root().display(), "Running");

    match command {
        Commands::Status => Ok(render_status(&cache.status())),
        Commands::Session {
            session_id,
            ratio,
            lines,
        } => {
            let report = cache.inject_session(session_id.as_deref(), ratio, lines)?;
            Ok(format!(
                "Injected session {}\n   Lines: {} → {}\n   Chars: {}\n   AI ratio: {}\n{}",
                report.session_id,
                report.change.previous_lines,
                report.change.lines,
                report.change.chars,
                ratio,
                local_only_note()
            ))
        }
        Commands::Commit { hash, repo, ratio } => {
            let report = cache.inject_commit(&hash, repo.as_deref(), ratio)?;
            Ok(format!(
                "Injected commit\n{}{}",
                commit_line(&report, ratio),
                local_only_note()
            ))
        }
        Commands::All { repo, ratio, since } => {
            let report = cache.inject_all(repo.as_deref(), ratio, since)?;
            Ok(render_batch(&report, ratio))
        }
    }
}

/// Entry point for the binary. Failed commands exit 1, `status` always exits 0.
pub fn run(cli: Cli) -> ExitCode {
    let is_status = matches!(cli.command, None | Some(Commands::Status));
    match execute(&cli) {
        Ok(out) => {
            print!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            if is_status {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn local_only_note() -> &'static str {
    "Note: only the local cache was changed; data already uploaded is unaffected.\n"
}

fn commit_line(report: &CommitReport, ratio: AiRatio) -> String {
    format!(
        "   {}: {} lines → {} AI / {} human ({})\n",
        truncate(&report.hash, 12),
        report.totals.total(),
        report.totals.ai,
        report.totals.human,
        ratio
    )
}

fn render_batch(report: &BatchReport, ratio: AiRatio) -> String {
    let mut out = format!(
        "Repository {}: {} commit(s) selected, {} injected\n",
        report.repo,
        report.selected,
        report.injected.len()
    );
    for commit in &report.injected {
        out.push_str(&commit_line(commit, ratio));
    }
    skipped_line(&mut out, report.skipped.len());
    out.push_str(local_only_note());
    out
}

pub fn render_status(status: &TelemetryStatus) -> String {
    let mut out = String::new();
    banner(&mut out, "AI Telemetry cache status");

    out.push_str("\nClaude Code sessions (most recent first):\n");
    match &status.sessions {
        None => out.push_str("   (cache directory not found)\n"),
        Some(scan) if scan.is_empty() && scan.skipped.is_empty() => {
            out.push_str("   (none)\n")
        }
        Some(scan) => {
            for (path, session) in &scan.records {
                let id = session.session_id.clone().unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default()
                });
                out.push_str(&format!(
                    "   {}...  lines={} chars={} files={}\n",
                    truncate(&id, 20),
                    session.lines_generated(),
                    session.chars_generated(),
                    session.files_touched()
                ));
            }
            skipped_line(&mut out, scan.skipped.len());
        }
    }

    out.push_str("\nCommit watcher repositories:\n");
    match &status.repos {
        None => out.push_str("   (cache directory not found)\n"),
        Some(repos) if repos.is_empty() => out.push_str("   (none)\n"),
        Some(repos) => {
            for repo in repos {
                out.push_str(&format!("   {}: {} commit(s)\n", repo.name, repo.commit_count));
                for (path, commit) in &repo.recent.records {
                    let hash = commit.hash.clone().unwrap_or_else(|| {
                        path.file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    });
                    out.push_str(&format!(
                        "      {}  +{}  {}\n",
                        truncate(&hash, 12),
                        commit.total_additions(),
                        truncate(commit.message.as_deref().unwrap_or(""), 30)
                    ));
                }
                skipped_line(&mut out, repo.recent.skipped.len());
            }
        }
    }
    out
}
