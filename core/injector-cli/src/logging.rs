//! Structured logging for the injector binaries using tracing.
//!
//! Logs to `~/.ai-injector/<app>.{date}.log` with daily rotation, keeping 7
//! days. Stdout is reserved for command output. Log level can be controlled
//! via `RUST_LOG`.
//!
//! Falls back to stderr logging if the file appender cannot be created.

use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = ".ai-injector";
const DEFAULT_FILTER: &str = "injector_cli=debug,injector_core=info";

pub fn log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(LOG_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Installs the global subscriber for `app`.
///
/// The returned guard must be held until the end of `main`; dropping it
/// flushes buffered lines to the log file.
pub fn init(app: &str) -> Option<WorkerGuard> {
    init_in(&log_dir(), app)
}

/// Like [`init`], writing into `dir` instead of the home log directory.
pub fn init_in(dir: &Path, app: &str) -> Option<WorkerGuard> {
    let _ = fs::create_dir_all(dir);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}=debug,{}", app.replace('-', "_"), DEFAULT_FILTER))
    });

    match create_file_appender(dir, app) {
        Ok(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(false),
                )
                .try_init();
            Some(guard)
        }
        Err(_) => {
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(true),
                )
                .try_init();
            None
        }
    }
}

fn create_file_appender(
    dir: &Path,
    app: &str,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app)
        .filename_suffix("log")
        .max_log_files(7)
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lines_reach_file_once_guard_drops() {
        let temp = tempdir().unwrap();
        let guard = init_in(temp.path(), "codeblend-injector");
        assert!(guard.is_some());

        tracing::info!(marker = "flush-check", "Logging initialized");
        drop(guard);

        let logs: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("codeblend-injector"))
            })
            .map(|path| fs::read_to_string(path).unwrap())
            .collect();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].contains("flush-check"));
    }
}
