//! Repository detection and discovery.

use crate::constants::{GIT_DIR, UNKNOWN_BRANCH};
use crate::error::DirectoryError;
use crate::git::{self, GitLogger};
use std::path::{Path, PathBuf};

/// A working copy found directly under the scanned base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub path: PathBuf,
    /// Final path segment; unique within one scan.
    pub name: String,
    /// Symbolic branch name, or `"unknown"` when it could not be read.
    pub current_branch: String,
    pub is_valid: bool,
}

impl Repository {
    #[must_use]
    pub fn has_known_branch(&self) -> bool {
        self.current_branch != UNKNOWN_BRANCH
    }
}

/// True when `path` holds a `.git` directory directly beneath it.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(GIT_DIR).is_dir()
}

/// Lists the git repositories that are immediate children of `base_dir`.
///
/// Nested repositories are not discovered. Entries are returned in
/// filesystem enumeration order. A repository whose branch cannot be read is
/// still returned, with `current_branch` set to `"unknown"`.
pub fn scan(base_dir: &Path, logger: GitLogger) -> Result<Vec<Repository>, DirectoryError> {
    tracing::info!(base_dir = %base_dir.display(), "Scanning for git repositories");

    if !base_dir.exists() {
        return Err(DirectoryError::NotFound {
            path: base_dir.to_path_buf(),
        });
    }
    if !base_dir.is_dir() {
        return Err(DirectoryError::NotADirectory {
            path: base_dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(base_dir).map_err(|source| DirectoryError::Unreadable {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let mut repositories = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();

        // Symlinked directories are not followed
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            tracing::debug!(path = %path.display(), "Skipping non-directory entry");
            continue;
        }
        if !is_git_repo(&path) {
            tracing::debug!(directory = %path.display(), "Skipping non-git directory");
            continue;
        }

        let current_branch = git::get_current_branch(&path, logger).unwrap_or_else(|e| {
            tracing::warn!(
                repository = %path.display(),
                error = %e,
                "Could not determine current branch"
            );
            UNKNOWN_BRANCH.to_string()
        });

        let name = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!(
            repository = %path.display(),
            branch = %current_branch,
            "Repository added to update list"
        );
        repositories.push(Repository {
            path,
            name,
            current_branch,
            is_valid: true,
        });
    }

    tracing::info!(count = repositories.len(), "Git repositories found");
    Ok(repositories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::no_op_logger;
    use tempfile::TempDir;

    #[test]
    fn test_scan_rejects_missing_directory() {
        let result = scan(Path::new("/no/such/base/dir"), no_op_logger);
        assert!(matches!(result, Err(DirectoryError::NotFound { .. })));
    }

    #[test]
    fn test_scan_rejects_file_as_base() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "not a dir")?;

        let result = scan(&file, no_op_logger);
        assert!(matches!(result, Err(DirectoryError::NotADirectory { .. })));
        Ok(())
    }

    #[test]
    fn test_scan_ignores_files_and_plain_directories() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("notes.txt"), "x")?;
        std::fs::create_dir(dir.path().join("plain"))?;

        let repos = scan(dir.path(), no_op_logger)?;
        assert!(repos.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_symlinked_directories() -> anyhow::Result<()> {
        let base = TempDir::new()?;
        let elsewhere = TempDir::new()?;
        let target = elsewhere.path().join("real");
        std::fs::create_dir_all(target.join(".git"))?;
        std::os::unix::fs::symlink(&target, base.path().join("linked"))?;

        assert!(is_git_repo(&base.path().join("linked")));
        assert!(scan(base.path(), no_op_logger)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_git_file_is_not_a_repository_marker() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let worktree = dir.path().join("worktree");
        std::fs::create_dir(&worktree)?;
        std::fs::write(worktree.join(".git"), "gitdir: elsewhere")?;

        assert!(!is_git_repo(&worktree));
        Ok(())
    }

    #[test]
    fn test_unreadable_head_yields_unknown_branch() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let broken = dir.path().join("broken");
        std::fs::create_dir_all(broken.join(".git"))?;

        let repos = scan(dir.path(), no_op_logger)?;
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "broken");
        assert_eq!(repos[0].current_branch, UNKNOWN_BRANCH);
        assert!(!repos[0].has_known_branch());
        assert!(repos[0].is_valid);
        Ok(())
    }
}
