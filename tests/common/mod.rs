//! Test infrastructure for update-git integration tests.
#![allow(dead_code)]

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use update_git_rust::git::run_git;
use update_git_rust::repo::Repository;
use update_git_rust::update::{UpdateCallbacks, UpdateResult, UpdateStep};

/// Initializes a repository at `path` on `branch` with one commit.
pub fn init_repo(path: &Path, branch: &str) -> Result<()> {
    std::fs::create_dir_all(path)?;
    run_git(path, &["init", "-b", branch])?;
    run_git(path, &["config", "user.email", "test@example.com"])?;
    run_git(path, &["config", "user.name", "Test User"])?;
    run_git(path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("README.md"), "# Test Repo\n")?;
    run_git(path, &["add", "README.md"])?;
    run_git(path, &["commit", "-m", "Initial commit"])?;
    Ok(())
}

/// Creates a bare remote at `remote`, adds it as origin of `repo` and pushes `branch`.
pub fn attach_remote(repo: &Path, remote: &Path, branch: &str) -> Result<()> {
    std::fs::create_dir_all(remote)?;
    run_git(remote, &["init", "--bare"])?;
    let remote_url = remote
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non UTF-8 temp path"))?;
    run_git(repo, &["remote", "add", "origin", remote_url])?;
    run_git(repo, &["push", "-u", "origin", branch])?;
    Ok(())
}

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped.
pub struct TestRepo {
    _temp_dir: TempDir,
    _remote_dir: Option<TempDir>,
    path: PathBuf,
}

impl TestRepo {
    /// Creates a new test repository with an initial commit on the master branch.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("repo");
        init_repo(&path, "master")?;

        Ok(Self {
            _temp_dir: temp_dir,
            _remote_dir: None,
            path,
        })
    }

    /// Creates a test repository whose master branch tracks a bare remote.
    pub fn with_remote() -> Result<Self> {
        let mut repo = Self::new()?;
        let remote_dir = TempDir::new()?;
        attach_remote(&repo.path, &remote_dir.path().join("origin.git"), "master")?;
        repo._remote_dir = Some(remote_dir);
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote_path(&self) -> Option<PathBuf> {
        self._remote_dir
            .as_ref()
            .map(|dir| dir.path().join("origin.git"))
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        run_git(&self.path, &["branch", name])?;
        Ok(())
    }

    /// Modifies a tracked file.
    pub fn make_dirty(&self) -> Result<()> {
        std::fs::write(self.path.join("README.md"), "# Modified\n")?;
        Ok(())
    }

    pub fn make_untracked(&self) -> Result<()> {
        std::fs::write(self.path.join("untracked.txt"), "untracked content\n")?;
        Ok(())
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    /// Returns `git stash list` as one entry per line.
    pub fn stash_list(&self) -> Result<Vec<String>> {
        let output = run_git(&self.path, &["stash", "list"])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    pub fn has_stash(&self) -> Result<bool> {
        Ok(!self.stash_list()?.is_empty())
    }
}

/// A base directory of repositories plus a separate directory for their remotes.
pub struct Workspace {
    dir: TempDir,
    remotes: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            remotes: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Adds a repository that tracks its own bare remote, so `git pull` succeeds.
    pub fn add_repo(&self, name: &str, branch: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        init_repo(&path, branch)?;
        attach_remote(&path, &self.remotes.path().join(format!("{}.git", name)), branch)?;
        Ok(path)
    }

    /// Adds a repository with no remote, so `git pull` fails.
    pub fn add_repo_without_remote(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        init_repo(&path, "master")?;
        Ok(path)
    }

    pub fn add_plain_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        std::fs::write(path.join("notes.txt"), "just files\n")?;
        Ok(path)
    }
}

pub fn setup_workspace_with_repos(repos: &[(&str, &str)]) -> Result<Workspace> {
    let workspace = Workspace::new()?;
    for (name, branch) in repos {
        workspace.add_repo(name, branch)?;
    }
    Ok(workspace)
}

pub fn names(repos: &[Repository]) -> Vec<String> {
    let mut names: Vec<String> = repos.iter().map(|r| r.name.clone()).collect();
    names.sort();
    names
}

/// Callbacks that count steps and completions across clones.
#[derive(Clone, Default)]
pub struct CountingCallbacks {
    pub steps: Arc<AtomicUsize>,
    pub completions: Arc<AtomicUsize>,
}

impl UpdateCallbacks for CountingCallbacks {
    fn on_step(&self, _step: &UpdateStep) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, _result: &UpdateResult) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}
