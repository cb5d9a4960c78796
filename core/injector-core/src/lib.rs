//! Core library for the AI authorship cache injectors.
//!
//! Two unrelated editor extensions keep local JSON caches describing how much
//! of a change was written by an AI assistant:
//!
//! - the AI Telemetry extension (`claudecode-cache/`, `commit-watcher-cache/`),
//!   handled by [`telemetry::TelemetryCache`]
//! - CodeBlend (`sessions/<id>/document-state.json`, `repo/<repo>/commits/`),
//!   handled by [`codeblend::CodeblendCache`]
//!
//! Every command follows the same pipeline: locate → read → mutate → write.
//! Paths are injected through [`config`] so tests run against temp dirs.

pub mod codeblend;
pub mod config;
pub mod error;
pub mod git;
pub mod hooks;
pub mod locate;
pub mod ratio;
pub mod records;
pub mod retry;
pub mod store;
pub mod telemetry;

pub use error::{InjectError, Result};
pub use ratio::{AiRatio, Split};
