//! Error types for scanning, filtering, git operations, backups and whole runs.
//!
//! Every component signals failure through these values; deciding whether a
//! failure ends the process happens only in `main`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The base directory handed to the scanner is unusable.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to read directory {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A filter could not be constructed.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter pattern '{pattern}' error: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A git invocation against one repository failed.
#[derive(Debug, Error)]
#[error("git {operation} failed for repository '{repository}': {cause}")]
pub struct GitError {
    pub repository: String,
    pub operation: String,
    #[source]
    pub cause: GitCause,
}

#[derive(Debug, Error)]
pub enum GitCause {
    #[error("failed to spawn git command: {0}")]
    Spawn(#[source] io::Error),

    #[error("exited with {code}: {output}")]
    Exit { code: String, output: String },

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("failed waiting for git command: {0}")]
    Wait(#[source] io::Error),
}

impl GitError {
    pub(crate) fn new(repository: &std::path::Path, operation: &str, cause: GitCause) -> Self {
        Self {
            repository: repository.display().to_string(),
            operation: operation.to_string(),
            cause,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, GitCause::Timeout(_))
    }
}

/// A backup could not be produced, or a backup operation is unavailable.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to create backup directory {}: {source}", path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup {operation} failed for repository '{repository}': {cause}")]
    Operation {
        repository: String,
        operation: &'static str,
        #[source]
        cause: BackupCause,
    },

    #[error("backup {operation} is not implemented")]
    NotImplemented { operation: &'static str },
}

#[derive(Debug, Error)]
pub enum BackupCause {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

impl BackupError {
    pub(crate) fn operation(
        repository: &str,
        operation: &'static str,
        cause: impl Into<BackupCause>,
    ) -> Self {
        Self::Operation {
            repository: repository.to_string(),
            operation,
            cause: cause.into(),
        }
    }

    /// The step tag of a per-repository failure, e.g. `"copy files"`.
    #[must_use]
    pub fn operation_name(&self) -> Option<&'static str> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// A run could not start.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("max_concurrent must be at least 1")]
    NoWorkers,
}
