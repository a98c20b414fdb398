//! Configuration types: output verbosity, resolved settings, and the
//! run-scoped configuration handed to the orchestrator.

use crate::backup::{BackupStrategy, Backupable};
use crate::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_BASE_DIR, DEFAULT_MAX_CONCURRENT, DEFAULT_PULL_TIMEOUT,
};
use crate::filter::RepoMatcher;
use crate::git::{self, GitLogger, Prompts};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime output configuration derived from CLI arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// Config only picks which callback to use; the callbacks themselves
    /// live in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Fully resolved options, one field per recognized `section.key`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub git: GitSettings,
    pub backup: BackupSettings,
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    pub base_dir: PathBuf,
    pub parallel_enabled: bool,
    pub max_concurrent: usize,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            parallel_enabled: true,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub enabled: bool,
    pub directory: PathBuf,
    pub strategy: BackupStrategy,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from(DEFAULT_BACKUP_DIR),
            strategy: BackupStrategy::Copy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSettings {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub skip_repos: Vec<String>,
}

/// Concurrency policy of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelUpdateConfig {
    pub enabled: bool,
    pub max_concurrent: usize,
    /// Upper bound on each repository's pull.
    pub timeout: Duration,
}

impl ParallelUpdateConfig {
    #[must_use]
    pub fn sequential(timeout: Duration) -> Self {
        Self {
            enabled: false,
            max_concurrent: 1,
            timeout,
        }
    }

    #[must_use]
    pub fn parallel(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            enabled: true,
            max_concurrent,
            timeout,
        }
    }
}

impl Default for ParallelUpdateConfig {
    fn default() -> Self {
        Self::parallel(DEFAULT_MAX_CONCURRENT, DEFAULT_PULL_TIMEOUT)
    }
}

/// Everything one orchestrator run needs. Built once, never mutated.
#[derive(Clone)]
pub struct UpdateConfig<'a> {
    pub base_dir: PathBuf,
    pub parallel: ParallelUpdateConfig,
    pub backup_enabled: bool,
    pub backup_manager: Option<&'a dyn Backupable>,
    pub filter: Option<&'a dyn RepoMatcher>,
    pub git_logger: GitLogger,
    /// Only honored in sequential mode; parallel pulls never prompt.
    pub prompts: Prompts,
}

impl<'a> UpdateConfig<'a> {
    /// Sequential run over `base_dir` with no filter and no backups.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            parallel: ParallelUpdateConfig::sequential(DEFAULT_PULL_TIMEOUT),
            backup_enabled: false,
            backup_manager: None,
            filter: None,
            git_logger: git::no_op_logger,
            prompts: Prompts::Disabled,
        }
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: ParallelUpdateConfig) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_backup(mut self, manager: &'a dyn Backupable) -> Self {
        self.backup_enabled = true;
        self.backup_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: &'a dyn RepoMatcher) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_git_logger(mut self, logger: GitLogger) -> Self {
        self.git_logger = logger;
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// How pulls of this run may interact with the user.
    #[must_use]
    pub fn effective_prompts(&self) -> Prompts {
        if self.parallel.enabled {
            Prompts::Disabled
        } else {
            self.prompts
        }
    }

    /// True when a backup should be attempted before each pull.
    #[must_use]
    pub fn backups_active(&self) -> bool {
        self.backup_enabled && self.backup_manager.is_some()
    }
}
