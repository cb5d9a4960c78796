//! CodeBlend cache: pre-commit document state and post-commit commit records.
//!
//! ## Where each mode lands
//!
//! ```text
//! inject / precommit  → sessions/<latest>/document-state.json
//!                       (read by CodeBlend when the commit is recorded)
//! patch / postcommit  → repo/<repo>/commits/<hash>.json
//!                       (local display only)
//! ```
//!
//! The hook modes never fail: every problem is logged and reduced to
//! "nothing injected" so a commit is never blocked.

use std::path::{Path, PathBuf};

use crate::config::CodeblendPaths;
use crate::error::{InjectError, Result};
use crate::git;
use crate::locate;
use crate::ratio::{AiRatio, Split};
use crate::records::{BlendCommit, DocumentStateStore, FileAuthorship};
use crate::retry::{RetryPolicy, Sleeper};
use crate::store::{read_record, scan_records, write_record, ScanReport};

const STATUS_COMMITS_PER_REPO: usize = 5;

#[derive(Debug)]
pub struct SessionStatus {
    pub name: String,
    pub tracked_files: usize,
    /// Files with at least one human or AI line.
    pub files: Vec<FileAuthorship>,
}

#[derive(Debug)]
pub struct CodeblendStatus {
    /// `None` when no session directory exists.
    pub session: Option<SessionStatus>,
    /// Most recent commits of every repo.
    pub commits: ScanReport<BlendCommit>,
}

/// Outcome of a document-state injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInjection {
    pub session_dir: PathBuf,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPatch {
    pub path: PathBuf,
    pub split: Split,
}

/// How long the post-commit hook waits for CodeBlend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostCommitTiming {
    /// Wait before reading `HEAD`, giving the extension time to react.
    pub settle: std::time::Duration,
    pub retry: RetryPolicy,
}

impl Default for PostCommitTiming {
    fn default() -> Self {
        Self {
            settle: std::time::Duration::from_secs(1),
            retry: RetryPolicy::post_commit(),
        }
    }
}

pub struct CodeblendCache {
    paths: CodeblendPaths,
}

impl CodeblendCache {
    pub fn new(paths: CodeblendPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &CodeblendPaths {
        &self.paths
    }

    /// The session directory with the greatest name.
    pub fn latest_session(&self) -> Option<PathBuf> {
        locate::latest_named_dir(&self.paths.sessions_dir())
            .ok()
            .flatten()
    }

    fn load_latest_state(&self) -> Result<(PathBuf, DocumentStateStore)> {
        let session = self
            .latest_session()
            .ok_or_else(|| InjectError::NoSession(self.paths.sessions_dir()))?;
        let state = DocumentStateStore::load(&CodeblendPaths::document_state_file(&session))?;
        Ok((session, state))
    }

    pub fn status(&self) -> CodeblendStatus {
        let session = self.load_latest_state().ok().map(|(dir, state)| SessionStatus {
            name: dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tracked_files: state.len(),
            files: state
                .authorship()
                .into_iter()
                .filter(|f| f.split.total() > 0)
                .collect(),
        });

        let mut recent = Vec::new();
        for dir in locate::commit_dirs(&self.paths.repo_dir()).unwrap_or_default() {
            let files = locate::json_files(&dir).unwrap_or_default();
            recent.extend(
                locate::newest_first(files)
                    .into_iter()
                    .take(STATUS_COMMITS_PER_REPO),
            );
        }

        CodeblendStatus {
            session,
            commits: scan_records(&recent),
        }
    }

    /// Rewrites the latest session's document state.
    ///
    /// With an empty `files` list every tracked file is injected; otherwise
    /// only the listed ones (matched as given, then as absolute paths).
    pub fn inject(&self, ratio: AiRatio, files: &[String]) -> Result<StateInjection> {
        let (session_dir, mut state) = self.load_latest_state()?;
        if let Some(reason) = state.load_error() {
            return Err(InjectError::CorruptState {
                path: CodeblendPaths::document_state_file(&session_dir),
                reason: reason.to_string(),
            });
        }
        if state.is_empty() {
            return Err(InjectError::NothingToInject(
                "document state is empty".to_string(),
            ));
        }

        let count = if files.is_empty() {
            state.inject_all(ratio)
        } else {
            let keys: Vec<String> = files
                .iter()
                .filter_map(|f| {
                    if state.contains(f) {
                        return Some(f.clone());
                    }
                    locate::absolutize(Path::new(f))
                        .ok()
                        .map(|p| p.to_string_lossy().into_owned())
                        .filter(|p| state.contains(p))
                })
                .collect();
            state.inject_files(&keys, ratio)
        };

        if count == 0 {
            return Err(InjectError::NothingToInject(
                "no tracked file with lines matched".to_string(),
            ));
        }

        state.save()?;
        tracing::info!(session = %session_dir.display(), files = count, "Document state injected");
        Ok(StateInjection {
            session_dir,
            files: count,
        })
    }

    /// First commit file in any repo whose name starts with `hash`.
    pub fn find_commit(&self, hash: &str) -> Result<PathBuf> {
        locate::find_commit_in_repos(&self.paths.repo_dir(), hash, false)?
            .ok_or_else(|| InjectError::CommitNotFound(hash.to_string()))
    }

    /// Rewrites a commit record found by hash prefix.
    pub fn patch(&self, hash: &str, ratio: AiRatio) -> Result<CommitPatch> {
        let path = self.find_commit(hash)?;
        self.patch_file(&path, ratio)
    }

    /// Rewrites one commit record. A record with `totalChanged == 0` is left
    /// untouched and reported as [`InjectError::NothingToInject`].
    pub fn patch_file(&self, path: &Path, ratio: AiRatio) -> Result<CommitPatch> {
        let mut commit: BlendCommit = read_record(path)?;
        let split = commit.patch(ratio).ok_or_else(|| {
            InjectError::NothingToInject(format!("{} has no changed lines", path.display()))
        })?;
        write_record(path, &commit)?;

        tracing::info!(path = %path.display(), ai = split.ai, human = split.human, "Commit patched");
        Ok(CommitPatch {
            path: path.to_path_buf(),
            split,
        })
    }

    /// Pre-commit hook: injects the staged files' document state.
    ///
    /// Returns the number of files changed; never fails.
    pub fn precommit(&self, repo: &Path, ratio: AiRatio) -> usize {
        let (session_dir, mut state) = match self.load_latest_state() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::debug!(error = %e, "Pre-commit: no session");
                return 0;
            }
        };
        if state.is_empty() {
            return 0;
        }

        let staged: Vec<String> = git::staged_files(repo)
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if staged.is_empty() {
            tracing::debug!(repo = %repo.display(), "Pre-commit: nothing staged");
            return 0;
        }

        let count = state.inject_files(&staged, ratio);
        if count == 0 {
            return 0;
        }

        match state.save() {
            Ok(()) => {
                tracing::info!(
                    session = %session_dir.display(),
                    files = count,
                    "Pre-commit: document state injected"
                );
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pre-commit: failed to save document state");
                0
            }
        }
    }

    /// Post-commit hook: waits for CodeBlend to write `HEAD`'s commit record,
    /// then patches it. Returns the hash and split when a record was patched.
    pub fn postcommit(
        &self,
        repo: &Path,
        ratio: AiRatio,
        timing: &PostCommitTiming,
        sleeper: &dyn Sleeper,
    ) -> Option<(String, Split)> {
        sleeper.sleep(timing.settle);

        let hash = git::head_commit(repo)?;
        let repo_root = self.paths.repo_dir();

        let path = timing.retry.poll(sleeper, |attempt| {
            tracing::debug!(hash = %hash, attempt, "Looking for commit record");
            locate::find_commit_in_repos(&repo_root, &hash, true)
                .ok()
                .flatten()
        });

        let Some(path) = path else {
            tracing::info!(hash = %hash, "Post-commit: commit record never appeared");
            return None;
        };

        match self.patch_file(&path, ratio) {
            Ok(patch) => Some((hash, patch.split)),
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "Post-commit: patch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LineStatus;
    use crate::retry::tests_helper::RecordingSleeper;
    use fs_err as fs;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::process::Command;
    use std::time::Duration;
    use tempfile::tempdir;

    fn ratio(v: f64) -> AiRatio {
        AiRatio::new(v).unwrap()
    }

    fn write_json(path: &Path, value: Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn run_git(repo: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn init_repo(repo: &Path) -> bool {
        fs::create_dir_all(repo).unwrap();
        run_git(repo, &["init", "--quiet"])
            && run_git(repo, &["config", "user.email", "test@test.com"])
            && run_git(repo, &["config", "user.name", "Test User"])
            && run_git(repo, &["config", "commit.gpgsign", "false"])
    }

    /// Writes the commit record when asked to sleep for the `on_call`-th time,
    /// as the extension would while the hook is waiting.
    struct RecordAppearsSleeper {
        slept: RefCell<Vec<Duration>>,
        on_call: usize,
        record: PathBuf,
        contents: Value,
    }

    impl Sleeper for RecordAppearsSleeper {
        fn sleep(&self, duration: Duration) {
            let mut slept = self.slept.borrow_mut();
            slept.push(duration);
            if slept.len() == self.on_call {
                write_json(&self.record, self.contents.clone());
            }
        }
    }

    fn cache_with_state(root: &Path, state: Value) -> (CodeblendCache, PathBuf) {
        let cache = CodeblendCache::new(CodeblendPaths::new(root));
        fs::create_dir_all(cache.paths().sessions_dir().join("2024-01-01-a")).unwrap();
        let state_file = cache
            .paths()
            .sessions_dir()
            .join("2024-02-01-b")
            .join("document-state.json");
        write_json(&state_file, state);
        (cache, state_file)
    }

    #[test]
    fn test_latest_session_by_name() {
        let temp = tempdir().unwrap();
        let (cache, state_file) = cache_with_state(temp.path(), json!({}));
        assert_eq!(
            cache.latest_session(),
            state_file.parent().map(Path::to_path_buf)
        );
    }

    #[test]
    fn test_inject_all_tracked_files() {
        let temp = tempdir().unwrap();
        let (cache, state_file) = cache_with_state(
            temp.path(),
            json!({"/r/a.rs": [0, 0, 0, 0], "/r/b.rs": [1, 1], "/r/c.rs": []}),
        );

        let result = cache.inject(ratio(0.5), &[]).unwrap();

        assert_eq!(result.files, 2);
        let value = read_json(&state_file);
        assert_eq!(value["/r/a.rs"], json!([2, 2, 1, 1]));
        assert_eq!(value["/r/b.rs"], json!([2, 1]));
        assert_eq!(value["/r/c.rs"], json!([]));
    }

    #[test]
    fn test_inject_selected_files_only() {
        let temp = tempdir().unwrap();
        let (cache, state_file) =
            cache_with_state(temp.path(), json!({"/r/a.rs": [0, 0], "/r/b.rs": [0, 0]}));

        let result = cache.inject(ratio(1.0), &["/r/b.rs".to_string()]).unwrap();

        assert_eq!(result.files, 1);
        let value = read_json(&state_file);
        assert_eq!(value["/r/a.rs"], json!([0, 0]));
        assert_eq!(value["/r/b.rs"], json!([2, 2]));
    }

    #[test]
    fn test_inject_failures() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        assert!(matches!(
            cache.inject(ratio(0.5), &[]),
            Err(InjectError::NoSession(_))
        ));

        let (cache, _) = cache_with_state(temp.path(), json!({}));
        assert!(matches!(
            cache.inject(ratio(0.5), &[]),
            Err(InjectError::NothingToInject(_))
        ));

        let (cache, _) = cache_with_state(temp.path(), json!({"/r/a.rs": [0]}));
        assert!(matches!(
            cache.inject(ratio(0.5), &["/elsewhere.rs".to_string()]),
            Err(InjectError::NothingToInject(_))
        ));
    }

    #[test]
    fn test_inject_with_unknown_code_elsewhere() {
        let temp = tempdir().unwrap();
        let (cache, state_file) = cache_with_state(
            temp.path(),
            json!({"/r/a.rs": [0, 0, 0, 0], "/r/b.rs": [0, -1]}),
        );

        let result = cache.inject(ratio(0.5), &["/r/a.rs".to_string()]).unwrap();

        assert_eq!(result.files, 1);
        let value = read_json(&state_file);
        assert_eq!(value["/r/a.rs"], json!([2, 2, 1, 1]));
        assert_eq!(value["/r/b.rs"], json!([0, -1]));
    }

    #[test]
    fn test_inject_reports_corrupt_state() {
        let temp = tempdir().unwrap();
        let (cache, state_file) = cache_with_state(temp.path(), json!({}));
        fs::write(&state_file, "{\"/r/a.rs\": [0, 0").unwrap();

        match cache.inject(ratio(0.5), &[]) {
            Err(InjectError::CorruptState { path, reason }) => {
                assert_eq!(path, state_file);
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(&state_file).unwrap(),
            "{\"/r/a.rs\": [0, 0"
        );
    }

    #[test]
    fn test_patch_by_prefix() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        let file = cache.paths().repo_dir().join("app/commits/abc123def.json");
        write_json(
            &file,
            json!({"commit": "abc123def", "totalChanged": 100, "files": [{"totalChanged": 100}]}),
        );

        let patch = cache.patch("abc123", ratio(0.5)).unwrap();

        assert_eq!(patch.split, Split { ai: 50, human: 50 });
        let value = read_json(&file);
        assert_eq!(value["ai"], 50);
        assert_eq!(value["human"], 50);
        assert_eq!(value["aiCommit"], true);
        assert_eq!(value["files"][0]["aiPercentage"], 50.0);
    }

    #[test]
    fn test_patch_zero_total_leaves_file_unchanged() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        let file = cache.paths().repo_dir().join("app/commits/000.json");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        let original = r#"{"totalChanged": 0, "ai": 0}"#;
        fs::write(&file, original).unwrap();

        let err = cache.patch("000", ratio(0.9)).unwrap_err();
        assert!(matches!(err, InjectError::NothingToInject(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
    }

    #[test]
    fn test_patch_missing_commit() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        assert!(matches!(
            cache.patch("feed", ratio(0.9)),
            Err(InjectError::CommitNotFound(_))
        ));
    }

    #[test]
    fn test_precommit_without_session_or_git_is_zero() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        assert_eq!(cache.precommit(temp.path(), ratio(0.9)), 0);

        let (cache, _) = cache_with_state(temp.path(), json!({"/r/a.rs": [0]}));
        assert_eq!(cache.precommit(&temp.path().join("not-a-repo"), ratio(0.9)), 0);
    }

    #[test]
    fn test_postcommit_without_head_only_settles() {
        let temp = tempdir().unwrap();
        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path()));
        let sleeper = RecordingSleeper::default();
        let timing = PostCommitTiming::default();

        let result = cache.postcommit(&temp.path().join("nope"), ratio(0.9), &timing, &sleeper);

        assert!(result.is_none());
        assert_eq!(*sleeper.slept.borrow(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_precommit_injects_staged_files() {
        let temp = tempdir().unwrap();
        let repo = temp.path().join("work");
        if !init_repo(&repo) {
            // git not installed in this environment
            return;
        }
        fs::write(repo.join("a.rs"), "fn a() {}\n").unwrap();
        fs::write(repo.join("b.rs"), "fn b() {}\n").unwrap();
        assert!(run_git(&repo, &["add", "a.rs"]));

        let staged = repo.join("a.rs").to_string_lossy().into_owned();
        let unstaged = repo.join("b.rs").to_string_lossy().into_owned();
        let (cache, state_file) = cache_with_state(
            &temp.path().join("cache"),
            json!({ (staged.clone()): [0, 0, 0, 0], (unstaged.clone()): [0, 0] }),
        );

        assert_eq!(cache.precommit(&repo, ratio(0.75)), 1);

        let value = read_json(&state_file);
        assert_eq!(value[staged.as_str()], json!([2, 2, 2, 1]));
        assert_eq!(value[unstaged.as_str()], json!([0, 0]));
    }

    #[test]
    fn test_postcommit_patches_record_once_it_appears() {
        let temp = tempdir().unwrap();
        let repo = temp.path().join("work");
        if !init_repo(&repo) {
            // git not installed in this environment
            return;
        }
        fs::write(repo.join("a.rs"), "fn a() {}\n").unwrap();
        assert!(run_git(&repo, &["add", "a.rs"]));
        assert!(run_git(&repo, &["commit", "--quiet", "-m", "first"]));
        let head = git::head_commit(&repo).unwrap();

        let cache = CodeblendCache::new(CodeblendPaths::new(temp.path().join("cache")));
        let record = cache
            .paths()
            .repo_dir()
            .join("work")
            .join("commits")
            .join(format!("{head}.json"));
        // Settle, then two failed lookups; the third lookup finds the record.
        let sleeper = RecordAppearsSleeper {
            slept: RefCell::new(Vec::new()),
            on_call: 3,
            record: record.clone(),
            contents: json!({"commit": head.clone(), "totalChanged": 10}),
        };

        let result = cache.postcommit(&repo, ratio(0.7), &PostCommitTiming::default(), &sleeper);

        assert_eq!(result, Some((head, Split { ai: 7, human: 3 })));
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![
                Duration::from_secs(1),
                Duration::from_millis(500),
                Duration::from_millis(750)
            ]
        );
        let value = read_json(&record);
        assert_eq!(value["ai"], 7);
        assert_eq!(value["human"], 3);
        assert_eq!(value["aiCommit"], true);
    }

    #[test]
    fn test_status_summarizes_latest_session_and_commits() {
        let temp = tempdir().unwrap();
        let (cache, _) = cache_with_state(
            temp.path(),
            json!({"/r/a.rs": [2, 2, 1], "/r/untouched.rs": [0, 0]}),
        );
        let commits = cache.paths().repo_dir().join("app/commits");
        write_json(&commits.join("c1.json"), json!({"totalChanged": 4, "ai": 1}));
        fs::write(commits.join("c2.json"), "{broken").unwrap();

        let status = cache.status();

        let session = status.session.unwrap();
        assert_eq!(session.name, "2024-02-01-b");
        assert_eq!(session.tracked_files, 2);
        assert_eq!(session.files.len(), 1);
        assert_eq!(session.files[0].split, Split { ai: 2, human: 1 });
        assert_eq!(status.commits.len(), 1);
        assert_eq!(status.commits.skipped.len(), 1);
    }

    #[test]
    fn test_store_codes_round_trip_through_inject() {
        let temp = tempdir().unwrap();
        let (cache, state_file) = cache_with_state(temp.path(), json!({"/r/a.rs": [0, 5]}));
        cache.inject(ratio(0.0), &[]).unwrap();

        let store = DocumentStateStore::load(&state_file).unwrap();
        assert_eq!(
            store.lines("/r/a.rs").unwrap(),
            &[LineStatus::Human, LineStatus::Human]
        );
    }
}
