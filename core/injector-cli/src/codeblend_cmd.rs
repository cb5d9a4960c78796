//! `codeblend-injector`: rewrites CodeBlend's document state and commit cache.
//!
//! `inject`, `patch` and `status` are interactive. `precommit` and
//! `postcommit` are what the installed git hooks run; they always exit 0 so
//! a commit is never blocked.

use clap::{Parser, Subcommand, ValueEnum};
use injector_core::codeblend::{CodeblendCache, CodeblendStatus, PostCommitTiming};
use injector_core::config::CodeblendPaths;
use injector_core::hooks::{self, HookCommand, HookKind};
use injector_core::locate::absolutize;
use injector_core::retry::ThreadSleeper;
use injector_core::{AiRatio, InjectError, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::output::{banner, skipped_line, truncate};

const DEFAULT_RATIO: &str = "0.95";

/// Rewrite AI authorship numbers in CodeBlend's local cache
#[derive(Parser, Debug)]
#[command(name = "codeblend-injector", version, about, long_about = None)]
pub struct Cli {
    /// CodeBlend storage directory (defaults to ~/.codeblend/vscode)
    #[arg(long, global = true, env = "CODEBLEND_DIR", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Command to execute (defaults to `status`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Show the latest session and recent commits
    Status,

    /// Rewrite the latest session's document state before committing
    Inject {
        /// AI ratio between 0 and 1
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,

        /// Only these files (as tracked, or relative to the current directory)
        #[arg(short, long, num_args = 1..)]
        files: Vec<String>,
    },

    /// Rewrite a commit record already in the cache (local display only)
    Patch {
        /// Commit hash or prefix
        hash: String,

        /// AI ratio between 0 and 1
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,
    },

    /// Git pre-commit hook mode
    Precommit {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,
    },

    /// Git post-commit hook mode
    Postcommit {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,
    },

    /// Install a git hook that runs this tool on every commit
    Install {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// AI ratio the hook will use
        #[arg(short, long, default_value = DEFAULT_RATIO)]
        ratio: AiRatio,

        /// Which hook to install
        #[arg(short = 't', long = "type", value_enum, default_value_t = HookType::Pre)]
        hook_type: HookType,

        /// Replace an existing hook that was not installed by this tool
        #[arg(long)]
        force: bool,
    },

    /// Remove hooks installed by this tool
    Uninstall {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// Rewrites document state before CodeBlend records the commit
    Pre,
    /// Patches the cached commit record afterwards
    Post,
}

impl From<HookType> for HookKind {
    fn from(value: HookType) -> Self {
        match value {
            HookType::Pre => HookKind::Pre,
            HookType::Post => HookKind::Post,
        }
    }
}

fn paths(cli: &Cli) -> Result<CodeblendPaths> {
    match &cli.root {
        Some(root) => Ok(CodeblendPaths::new(root)),
        None => CodeblendPaths::from_home().ok_or(InjectError::NoHomeDir),
    }
}

fn file_label(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Runs the command and returns what should be printed on stdout.
///
/// Hook modes never return an error.
pub fn execute(cli: &Cli) -> Result<String> {
    let command = cli.command.clone().unwrap_or(Commands::Status);
    let cache = match paths(cli) {
        Ok(paths) => CodeblendCache::new(paths),
        Err(e) if is_hook_mode(&command) => {
            tracing::warn!(error = %e, "Hook mode without a storage directory");
            return Ok(String::new());
        }
        Err(e) => return Err(e),
    };
    tracing::debug!(?command, root = %cache.paths().root().display(), "Running");

    match command {
        Commands::Status => Ok(render_status(&cache.status())),
        Commands::Inject { ratio, files } => {
            let done = cache.inject(ratio, &files)?;
            Ok(format!(
                "Injected {} file(s) in session {} at {}\n\
                 Commit now; CodeBlend reads the document state when it records the commit.\n",
                done.files,
                done.session_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                ratio
            ))
        }
        Commands::Patch { hash, ratio } => {
            let patch = cache.patch(&hash, ratio)?;
            Ok(format!(
                "Patched {}\n   AI: {}  Human: {}  ({})\n\
                 Note: this changes the local display only, not data already synced.\n",
                patch.path.display(),
                patch.split.ai,
                patch.split.human,
                ratio
            ))
        }
        Commands::Precommit { repo, ratio } => {
            let repo = hook_repo(&repo);
            let count = cache.precommit(&repo, ratio);
            Ok(if count > 0 {
                format!("CodeBlend AI Injector: {} staged file(s) set to {} AI\n", count, ratio)
            } else {
                String::new()
            })
        }
        Commands::Postcommit { repo, ratio } => {
            let repo = hook_repo(&repo);
            let patched =
                cache.postcommit(&repo, ratio, &PostCommitTiming::default(), &ThreadSleeper);
            Ok(match patched {
                Some((hash, split)) => format!(
                    "CodeBlend AI Injector: commit {} set to {} AI ({} of {} lines)\n",
                    truncate(&hash, 8),
                    ratio,
                    split.ai,
                    split.total()
                ),
                None => String::new(),
            })
        }
        Commands::Install {
            repo,
            ratio,
            hook_type,
            force,
        } => {
            let repo = absolutize(&repo)?;
            let root = cli.root.as_deref().map(absolutize).transpose()?;
            let exe = std::env::current_exe()?;
            let kind = HookKind::from(hook_type);
            let path = hooks::install(
                kind,
                &HookCommand {
                    exe: &exe,
                    repo: &repo,
                    ratio,
                    root: root.as_deref(),
                },
                force,
            )?;
            Ok(format!(
                "Installed {} hook: {}\n   Mode: {}\n   AI ratio: {}\n\
                 Remove with: codeblend-injector uninstall --repo {}\n",
                kind,
                path.display(),
                kind.description(),
                ratio,
                repo.display()
            ))
        }
        Commands::Uninstall { repo } => {
            let removed = hooks::uninstall(&absolutize(&repo)?)?;
            if removed.is_empty() {
                return Ok("No hooks installed by this tool were found\n".to_string());
            }
            let names: Vec<String> = removed.iter().map(|k| k.to_string()).collect();
            Ok(format!("Removed hook(s): {}\n", names.join(", ")))
        }
    }
}

fn is_hook_mode(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Precommit { .. } | Commands::Postcommit { .. }
    )
}

fn hook_repo(repo: &Path) -> PathBuf {
    absolutize(repo).unwrap_or_else(|_| repo.to_path_buf())
}

/// Entry point for the binary. Hook modes and `status` always exit 0.
pub fn run(cli: Cli) -> ExitCode {
    let always_succeeds = match &cli.command {
        None | Some(Commands::Status) => true,
        Some(command) => is_hook_mode(command),
    };
    match execute(&cli) {
        Ok(out) => {
            print!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            if always_succeeds {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

pub fn render_status(status: &CodeblendStatus) -> String {
    let mut out = String::new();
    banner(&mut out, "CodeBlend cache status");

    match &status.session {
        None => out.push_str("\nNo CodeBlend session found\n"),
        Some(session) => {
            out.push_str(&format!(
                "\nLatest session: {}\n   Tracked files: {}\n",
                session.name, session.tracked_files
            ));
            for file in &session.files {
                out.push_str(&format!(
                    "   {}: AI={} Human={} AI%={:.1}\n",
                    file_label(&file.path),
                    file.split.ai,
                    file.split.human,
                    file.split.ai_percentage()
                ));
            }
        }
    }

    out.push_str("\nRecent commits:\n");
    if status.commits.is_empty() && status.commits.skipped.is_empty() {
        out.push_str("   (none)\n");
    }
    for (path, commit) in &status.commits.records {
        let hash = commit.commit.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        out.push_str(&format!(
            "   {}: AI={} Total={} AI%={:.1}\n",
            truncate(&hash, 12),
            commit.ai.unwrap_or(0),
            commit.total_changed(),
            commit.stored_ai_percentage()
        ));
    }
    skipped_line(&mut out, status.commits.skipped.len());
    out
}
