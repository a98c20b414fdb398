//! Point-in-time safeguards taken before a repository is pulled.
//!
//! Two strategies exist:
//! - `copy` mirrors the working tree (without `.git`) into
//!   `{backup_dir}/{timestamp}/{repo_name}`, keeping symlinks as symlinks
//! - `stash` shelves uncommitted changes, untracked files included, with a
//!   message carrying the run timestamp
//!
//! Restoring and retention cleanup are not implemented and say so.

use crate::constants::{BACKUP_TIMESTAMP_FORMAT, GIT_DIR, NOTHING_TO_STASH, STASH_MESSAGE_PREFIX};
use crate::error::{BackupCause, BackupError};
use crate::git::{self, GitLogger};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Something that can safeguard a repository before it is mutated.
pub trait Backupable: Send + Sync {
    fn create_backup(&self, repo_path: &Path, repo_name: &str) -> Result<BackupInfo, BackupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupStrategy {
    #[default]
    Copy,
    Stash,
}

impl BackupStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Stash => "stash",
        }
    }
}

impl fmt::Display for BackupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(Self::Copy),
            "stash" => Ok(Self::Stash),
            other => Err(format!(
                "unknown backup strategy '{}' (expected 'copy' or 'stash')",
                other
            )),
        }
    }
}

/// Where a backup ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupLocation {
    Directory(PathBuf),
    Stash { message: String },
    /// Stash strategy on a clean working tree.
    NothingToStash,
}

impl fmt::Display for BackupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(path) => write!(f, "{}", path.display()),
            Self::Stash { message } => write!(f, "stash: {}", message),
            Self::NothingToStash => f.write_str(NOTHING_TO_STASH),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub repository: String,
    pub location: BackupLocation,
    pub strategy: BackupStrategy,
    pub timestamp: DateTime<Local>,
    pub original_path: PathBuf,
}

impl BackupInfo {
    /// The backup path as a string: a directory, a stash description, or `"git-stash"`.
    #[must_use]
    pub fn backup_path(&self) -> String {
        self.location.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStats {
    pub backup_dir: PathBuf,
    pub strategy: BackupStrategy,
    pub timestamp: String,
}

/// Produces backups for one run. The timestamped root directory is created
/// on construction.
#[derive(Debug)]
pub struct BackupManager {
    backup_dir: PathBuf,
    strategy: BackupStrategy,
    timestamp: String,
    logger: GitLogger,
}

impl BackupManager {
    /// Fails if this run's timestamped directory already exists, so two runs
    /// started within the same second never share a backup root.
    pub fn new(root: &Path, strategy: BackupStrategy, logger: GitLogger) -> Result<Self, BackupError> {
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        Self::create(root, strategy, timestamp, logger)
    }

    fn create(
        root: &Path,
        strategy: BackupStrategy,
        timestamp: String,
        logger: GitLogger,
    ) -> Result<Self, BackupError> {
        let backup_dir = root.join(&timestamp);
        let create_root = |source| BackupError::CreateRoot {
            path: backup_dir.clone(),
            source,
        };

        fs::create_dir_all(root).map_err(create_root)?;
        fs::create_dir(&backup_dir).map_err(create_root)?;

        tracing::info!(
            backup_dir = %backup_dir.display(),
            %strategy,
            %timestamp,
            "Backup manager initialized"
        );

        Ok(Self {
            backup_dir,
            strategy,
            timestamp,
            logger,
        })
    }

    /// The timestamped root of this run's backups.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn stats(&self) -> BackupStats {
        BackupStats {
            backup_dir: self.backup_dir.clone(),
            strategy: self.strategy,
            timestamp: self.timestamp.clone(),
        }
    }

    pub fn create_backup(&self, repo_path: &Path, repo_name: &str) -> Result<BackupInfo, BackupError> {
        tracing::info!(
            repository = repo_name,
            path = %repo_path.display(),
            strategy = %self.strategy,
            "Creating repository backup"
        );
        match self.strategy {
            BackupStrategy::Copy => self.create_copy_backup(repo_path, repo_name),
            BackupStrategy::Stash => self.create_stash_backup(repo_path, repo_name),
        }
    }

    pub fn restore_backup(&self, info: &BackupInfo) -> Result<(), BackupError> {
        tracing::info!(
            repository = %info.repository,
            backup_path = %info.location,
            strategy = %info.strategy,
            "Restore functionality not yet implemented"
        );
        Err(BackupError::NotImplemented {
            operation: "restore",
        })
    }

    pub fn cleanup_old_backups(&self, days: u32) -> Result<(), BackupError> {
        tracing::info!(retention_days = days, "Backup cleanup not yet implemented");
        Err(BackupError::NotImplemented {
            operation: "cleanup",
        })
    }

    fn info(&self, repo_path: &Path, repo_name: &str, location: BackupLocation) -> BackupInfo {
        BackupInfo {
            repository: repo_name.to_string(),
            location,
            strategy: self.strategy,
            timestamp: Local::now(),
            original_path: repo_path.to_path_buf(),
        }
    }

    fn create_copy_backup(&self, repo_path: &Path, repo_name: &str) -> Result<BackupInfo, BackupError> {
        let backup_path = self.backup_dir.join(repo_name);
        tracing::debug!(
            repository = repo_name,
            backup_path = %backup_path.display(),
            "Attempting copy backup"
        );

        fs::create_dir_all(&backup_path)
            .map_err(|e| BackupError::operation(repo_name, "create directory", e))?;

        let files = copy_tree(repo_path, &backup_path)
            .map_err(|cause| BackupError::operation(repo_name, "copy files", cause))?;

        tracing::debug!(repository = repo_name, files, "Finished copy backup");
        Ok(self.info(repo_path, repo_name, BackupLocation::Directory(backup_path)))
    }

    fn create_stash_backup(&self, repo_path: &Path, repo_name: &str) -> Result<BackupInfo, BackupError> {
        if !git::has_uncommitted_changes(repo_path, self.logger) {
            tracing::debug!(
                repository = repo_name,
                "No uncommitted changes, skipping stash backup"
            );
            return Ok(self.info(repo_path, repo_name, BackupLocation::NothingToStash));
        }

        let message = format!("{} {}", STASH_MESSAGE_PREFIX, self.timestamp);
        git::stash_push(repo_path, &message, self.logger)
            .map_err(|e| BackupError::operation(repo_name, "git stash", e))?;

        tracing::info!(repository = repo_name, %message, "Git stash backup created");
        Ok(self.info(repo_path, repo_name, BackupLocation::Stash { message }))
    }
}

impl Backupable for BackupManager {
    fn create_backup(&self, repo_path: &Path, repo_name: &str) -> Result<BackupInfo, BackupError> {
        BackupManager::create_backup(self, repo_path, repo_name)
    }
}

/// Mirrors `src` into `dst`, skipping `.git` directories and recreating
/// symlinks instead of following them. Returns the number of regular files copied.
///
/// Directory permissions are applied after all content is in place so a
/// read-only source directory can still be filled.
fn copy_tree(src: &Path, dst: &Path) -> Result<u64, BackupCause> {
    let mut dir_permissions = Vec::new();
    let mut files = 0;

    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == GIT_DIR));

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            tracing::trace!(path = %entry.path().display(), "Copying symlink");
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            dir_permissions.push((target, entry.metadata()?.permissions()));
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(dir, permissions)?;
    }

    Ok(files)
}

fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let _ = fs::remove_file(dst);
    create_symlink(src, &target, dst)
}

#[cfg(unix)]
fn create_symlink(_src: &Path, target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(src: &Path, target: &Path, link: &Path) -> io::Result<()> {
    if fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
