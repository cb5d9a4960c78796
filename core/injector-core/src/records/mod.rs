//! Typed views of the cache records.
//!
//! Each record only names the fields this crate reads or writes. Everything
//! else is captured by a flattened `extra` map and written back untouched.
//! Missing keys deserialize to `None`/zero, and a field that was absent on
//! read is not added on write unless a mutator sets it.

mod blend;
mod document_state;
mod lenient;
mod session;
mod watcher;

pub use blend::{BlendCommit, BlendFile};
pub use document_state::{DocumentStateStore, FileAuthorship, LineStatus};
pub use session::{ClaudeSession, SessionInjection, SessionMetrics};
pub use watcher::{parse_commit_date, FileChange, WatcherCommit};
