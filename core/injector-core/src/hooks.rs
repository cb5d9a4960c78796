//! Git hook installation for the CodeBlend injector.
//!
//! Installed hooks are tiny shell wrappers that call the injector binary in
//! `precommit` or `postcommit` mode. They carry [`HOOK_MARKER`] in a comment;
//! uninstall only ever removes files containing it.

use fs_err as fs;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{InjectError, Result};
use crate::ratio::AiRatio;

/// Identifies hook files written by this tool.
pub const HOOK_MARKER: &str = "CodeBlend AI Injector";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Pre,
    Post,
}

impl HookKind {
    pub const ALL: [HookKind; 2] = [HookKind::Pre, HookKind::Post];

    /// File name under `.git/hooks/`.
    pub fn file_name(self) -> &'static str {
        match self {
            HookKind::Pre => "pre-commit",
            HookKind::Post => "post-commit",
        }
    }

    /// Injector subcommand the hook runs.
    pub fn mode(self) -> &'static str {
        match self {
            HookKind::Pre => "precommit",
            HookKind::Post => "postcommit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HookKind::Pre => "Pre-Commit (rewrites document state before CodeBlend reads it)",
            HookKind::Post => "Post-Commit (patches the local commit cache only)",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// What the generated script should invoke.
#[derive(Debug, Clone)]
pub struct HookCommand<'a> {
    pub exe: &'a Path,
    pub repo: &'a Path,
    pub ratio: AiRatio,
    /// Cache root override, forwarded as `--root` when set.
    pub root: Option<&'a Path>,
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn render_script(kind: HookKind, command: &HookCommand<'_>) -> String {
    let mut invocation = shell_quote(&command.exe.to_string_lossy());
    if let Some(root) = command.root {
        invocation.push_str(" --root ");
        invocation.push_str(&shell_quote(&root.to_string_lossy()));
    }
    format!(
        "#!/bin/sh\n# {marker} - {desc}\n{invocation} {mode} --repo {repo} --ratio {ratio} || true\n",
        marker = HOOK_MARKER,
        desc = kind.description(),
        mode = kind.mode(),
        repo = shell_quote(&command.repo.to_string_lossy()),
        ratio = command.ratio.value(),
    )
}

/// `<repo>/.git/hooks`, which must already exist.
pub fn hooks_dir(repo: &Path) -> Result<PathBuf> {
    let dir = repo.join(".git").join("hooks");
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(InjectError::NotGitRepo(repo.to_path_buf()))
    }
}

/// True when the file exists and carries [`HOOK_MARKER`].
pub fn is_managed(hook_path: &Path) -> bool {
    fs::read_to_string(hook_path)
        .map(|content| content.contains(HOOK_MARKER))
        .unwrap_or(false)
}

/// Writes the hook script with executable permissions.
///
/// An existing hook without the marker is only replaced when `force` is set.
pub fn install(kind: HookKind, command: &HookCommand<'_>, force: bool) -> Result<PathBuf> {
    let hook_path = hooks_dir(command.repo)?.join(kind.file_name());

    if hook_path.exists() && !is_managed(&hook_path) && !force {
        return Err(InjectError::ForeignHook(kind.file_name().to_string()));
    }

    fs::write(&hook_path, render_script(kind, command))?;
    set_executable(&hook_path)?;

    tracing::info!(hook = %kind, path = %hook_path.display(), "Hook installed");
    Ok(hook_path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Removes every hook slot that holds one of our scripts.
///
/// Hooks without the marker are left untouched. A repository without a hooks
/// directory simply has nothing to remove.
pub fn uninstall(repo: &Path) -> Result<Vec<HookKind>> {
    let dir = repo.join(".git").join("hooks");
    let mut removed = Vec::new();

    for kind in HookKind::ALL {
        let hook_path = dir.join(kind.file_name());
        if !hook_path.exists() {
            continue;
        }
        if is_managed(&hook_path) {
            fs::remove_file(&hook_path)?;
            tracing::info!(hook = %kind, "Hook removed");
            removed.push(kind);
        } else {
            tracing::debug!(hook = %kind, "Leaving hook without marker in place");
        }
    }

    Ok(removed)
}
