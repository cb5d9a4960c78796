//! Cache file discovery by path convention.
//!
//! Whenever several candidates match ("first repo containing X", "first
//! commit starting with abc"), the lexicographically first name wins so the
//! result does not depend on directory enumeration order.

use fs_err as fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::error::{InjectError, Result};

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(InjectError::MissingDir(dir.to_path_buf()))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_json_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == "json")
}

/// Every `*.json` file in `dir`, sorted by file name.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_json_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Every subdirectory of `dir`, sorted by name.
pub fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Sorts paths by modification time, newest first. Equal times keep name order.
pub fn newest_first(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| modified(b).cmp(&modified(a)).then_with(|| a.cmp(b)));
    paths
}

/// The most recently modified `*.json` file in `dir`.
pub fn latest_json(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(newest_first(json_files(dir)?).into_iter().next())
}

/// The subdirectory with the greatest name (session dirs are named by start time).
pub fn latest_named_dir(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(subdirs(dir)?.pop())
}

/// Resolves a repository cache directory by name.
///
/// An exact name match wins; otherwise the first directory whose name
/// contains `name`. Without a name, the cache must hold exactly one repo.
pub fn resolve_repo_dir(cache: &Path, name: Option<&str>) -> Result<PathBuf> {
    let repos = subdirs(cache)?;
    let available = || repos.iter().map(|d| file_name(d)).collect::<Vec<_>>();

    let Some(name) = name else {
        return match repos.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(InjectError::RepoNotFound {
                name: "(none given)".to_string(),
                available: available(),
            }),
        };
    };

    let exact = cache.join(name);
    if exact.is_dir() {
        return Ok(exact);
    }

    match repos.iter().find(|d| file_name(d).contains(name)) {
        Some(dir) => {
            tracing::debug!(name = %name, dir = %dir.display(), "Repo resolved by substring");
            Ok(dir.clone())
        }
        None => Err(InjectError::RepoNotFound {
            name: name.to_string(),
            available: available(),
        }),
    }
}

/// The first `*.json` file in `dir` whose name starts with `prefix`.
pub fn find_by_prefix(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    Ok(json_files(dir)?
        .into_iter()
        .find(|path| file_name(path).starts_with(prefix)))
}

/// Searches `<root>/*/commits/` for a commit file.
///
/// With `exact`, only `<hash>.json` matches; otherwise any file starting with
/// `hash`. A missing root yields `Ok(None)`.
pub fn find_commit_in_repos(root: &Path, hash: &str, exact: bool) -> Result<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }
    let wanted = format!("{}.json", hash);
    for repo in subdirs(root)? {
        let commits = repo.join("commits");
        if !commits.is_dir() {
            continue;
        }
        let found = json_files(&commits)?.into_iter().find(|path| {
            let name = file_name(path);
            if exact {
                name == wanted
            } else {
                name.starts_with(hash)
            }
        });
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Makes `path` absolute against the current directory and removes `.` and
/// `..` components without touching the filesystem, so the result matches
/// the absolute paths the extensions store.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Every `<root>/*/commits` directory.
pub fn commit_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    Ok(subdirs(root)?
        .into_iter()
        .map(|repo| repo.join("commits"))
        .filter(|dir| dir.is_dir())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "{}").unwrap();
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_json_files_filters_and_sorts() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("b.json"));
        touch(&temp.path().join("a.json"));
        touch(&temp.path().join("notes.txt"));
        fs::create_dir_all(temp.path().join("dir.json")).unwrap();

        let files = json_files(temp.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_missing_dir_is_reported() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            json_files(&missing),
            Err(InjectError::MissingDir(p)) if p == missing
        ));
    }

    #[test]
    fn test_latest_json_uses_mtime() {
        let temp = tempdir().unwrap();
        let old = temp.path().join("a-old.json");
        let new = temp.path().join("z-new.json");
        touch(&old);
        touch(&new);
        set_mtime(&old, 2_000_000);
        set_mtime(&new, 1_000_000);

        assert_eq!(latest_json(temp.path()).unwrap(), Some(old));
    }

    #[test]
    fn test_latest_json_empty_dir() {
        let temp = tempdir().unwrap();
        assert_eq!(latest_json(temp.path()).unwrap(), None);
    }

    #[test]
    fn test_latest_named_dir_is_lexicographic() {
        let temp = tempdir().unwrap();
        for name in ["2024-01-02", "2024-03-01", "2023-12-31"] {
            fs::create_dir_all(temp.path().join(name)).unwrap();
        }
        touch(&temp.path().join("zzz.json"));

        assert_eq!(
            latest_named_dir(temp.path()).unwrap(),
            Some(temp.path().join("2024-03-01"))
        );
    }

    #[test]
    fn test_resolve_repo_exact_then_substring() {
        let temp = tempdir().unwrap();
        for name in ["org-payments-tools", "payments", "zz-payments-fork"] {
            fs::create_dir_all(temp.path().join(name)).unwrap();
        }

        assert_eq!(
            resolve_repo_dir(temp.path(), Some("payments")).unwrap(),
            temp.path().join("payments")
        );
        assert_eq!(
            resolve_repo_dir(temp.path(), Some("payments-")).unwrap(),
            temp.path().join("org-payments-tools")
        );
    }

    #[test]
    fn test_resolve_repo_not_found_lists_available() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("alpha")).unwrap();

        match resolve_repo_dir(temp.path(), Some("beta")) {
            Err(InjectError::RepoNotFound { name, available }) => {
                assert_eq!(name, "beta");
                assert_eq!(available, vec!["alpha".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_repo_without_name_needs_single_repo() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("only")).unwrap();
        assert_eq!(
            resolve_repo_dir(temp.path(), None).unwrap(),
            temp.path().join("only")
        );

        fs::create_dir_all(temp.path().join("second")).unwrap();
        assert!(resolve_repo_dir(temp.path(), None).is_err());
    }

    #[test]
    fn test_find_by_prefix_takes_first_name() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("abc999.json"));
        touch(&temp.path().join("abc123.json"));
        touch(&temp.path().join("def000.json"));

        assert_eq!(
            find_by_prefix(temp.path(), "abc").unwrap(),
            Some(temp.path().join("abc123.json"))
        );
        assert_eq!(find_by_prefix(temp.path(), "fff").unwrap(), None);
    }

    #[test]
    fn test_find_commit_in_repos_exact_and_prefix() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("repo-a/commits/abcdef.json");
        touch(&file);
        touch(&temp.path().join("repo-b/other.json"));

        assert_eq!(
            find_commit_in_repos(temp.path(), "abc", false).unwrap(),
            Some(file.clone())
        );
        assert_eq!(find_commit_in_repos(temp.path(), "abc", true).unwrap(), None);
        assert_eq!(
            find_commit_in_repos(temp.path(), "abcdef", true).unwrap(),
            Some(file)
        );
        assert_eq!(
            find_commit_in_repos(&temp.path().join("missing"), "abc", false).unwrap(),
            None
        );
    }

    #[test]
    fn test_absolutize_normalizes_lexically() {
        assert_eq!(
            absolutize(Path::new("/repo/./src/../lib.rs")).unwrap(),
            PathBuf::from("/repo/lib.rs")
        );
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new(".")).unwrap(), cwd);
        assert_eq!(absolutize(Path::new("a/b")).unwrap(), cwd.join("a/b"));
    }

    #[test]
    fn test_commit_dirs_skips_repos_without_commits() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/commits")).unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();

        assert_eq!(
            commit_dirs(temp.path()).unwrap(),
            vec![temp.path().join("a/commits")]
        );
    }
}
