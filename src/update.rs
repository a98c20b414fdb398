//! Update orchestration: scan, filter, back up, pull, aggregate.
//!
//! Each accepted repository moves through
//! `Started -> [BackingUp] -> ListingBranches -> Pulling -> Completed`.
//! A failed backup is logged and the pull still happens. A failed pull marks
//! only that repository as failed; nothing done for other repositories is
//! undone.

use crate::backup::BackupInfo;
use crate::config::UpdateConfig;
use crate::error::UpdateError;
use crate::filter;
use crate::git;
use crate::repo::{self, Repository};
use rayon::prelude::*;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    Started,
    BackingUp,
    ListingBranches,
    Pulling,
    Completed,
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "Started",
            Self::BackingUp => "Backing up",
            Self::ListingBranches => "Listing branches",
            Self::Pulling => "Pulling",
            Self::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// What happened to the safeguard step of one repository.
#[derive(Debug, Clone)]
pub enum BackupStatus {
    Skipped,
    Created(BackupInfo),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFailure {
    pub error: String,
    pub step: UpdateStep,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Success,
    Failed(UpdateFailure),
}

#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub repository: Repository,
    pub backup: BackupStatus,
    pub outcome: UpdateOutcome,
    pub duration: Duration,
}

impl UpdateResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, UpdateOutcome::Success)
    }
}

/// Progress notifications for one repository's update.
pub trait UpdateCallbacks {
    fn on_update_start(&self, _repo: &Repository) {}
    fn on_step(&self, step: &UpdateStep);
    fn on_complete(&self, result: &UpdateResult);
}

/// Null object for when no progress reporting is wanted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl UpdateCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &UpdateStep) {}
    fn on_complete(&self, _result: &UpdateResult) {}
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Repositories found by the scanner.
    pub discovered: usize,
    /// Repositories rejected by the filter.
    pub skipped: usize,
    pub results: Vec<UpdateResult>,
    pub duration: Duration,
}

impl RunSummary {
    /// Repositories actually attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.total() - self.success_count()
    }

    /// A run fails as soon as one repository failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }
}

/// Backs up (when enabled) and pulls a single repository.
///
/// Never fails as a whole: every problem ends up in the returned result.
pub fn update_repository<C>(repo: &Repository, config: &UpdateConfig, callbacks: &C) -> UpdateResult
where
    C: UpdateCallbacks + ?Sized,
{
    let start = Instant::now();
    callbacks.on_update_start(repo);
    callbacks.on_step(&UpdateStep::Started);
    tracing::info!(
        repository = %repo.name,
        path = %repo.path.display(),
        branch = %repo.current_branch,
        "Updating repository"
    );
    if !repo.has_known_branch() {
        tracing::warn!(
            repository = %repo.name,
            "Current branch is unknown, pulling anyway"
        );
    }

    let backup = match config.backup_manager {
        Some(manager) if config.backup_enabled => {
            callbacks.on_step(&UpdateStep::BackingUp);
            match manager.create_backup(&repo.path, &repo.name) {
                Ok(info) => BackupStatus::Created(info),
                Err(e) => {
                    tracing::error!(repository = %repo.name, error = %e, "Failed to create backup");
                    BackupStatus::Failed(e.to_string())
                }
            }
        }
        _ => BackupStatus::Skipped,
    };

    callbacks.on_step(&UpdateStep::ListingBranches);
    match git::get_branches(&repo.path, config.git_logger) {
        Ok(branches) => tracing::debug!(repository = %repo.name, "Local branches:\n{}", branches),
        Err(e) => tracing::debug!(repository = %repo.name, error = %e, "Could not list branches"),
    }

    callbacks.on_step(&UpdateStep::Pulling);
    let outcome = match git::pull(
        &repo.path,
        config.parallel.timeout,
        config.effective_prompts(),
        config.git_logger,
    ) {
        Ok(()) => {
            tracing::info!(repository = %repo.name, "Git pull completed successfully");
            callbacks.on_step(&UpdateStep::Completed);
            UpdateOutcome::Success
        }
        Err(e) => {
            tracing::error!(repository = %repo.name, error = %e, "Failed to update repository");
            UpdateOutcome::Failed(UpdateFailure {
                error: e.to_string(),
                step: UpdateStep::Pulling,
                timed_out: e.is_timeout(),
            })
        }
    };

    let result = UpdateResult {
        repository: repo.clone(),
        backup,
        outcome,
        duration: start.elapsed(),
    };
    callbacks.on_complete(&result);
    result
}

/// Updates every repository in `repos`.
///
/// Sequential mode keeps input order. Parallel mode runs on a dedicated pool
/// of `max_concurrent` threads; each repository is handled by exactly one
/// worker and results come back in input order.
pub fn update_all<F, C>(
    repos: &[Repository],
    make_callbacks: F,
    config: &UpdateConfig,
) -> Result<Vec<UpdateResult>, UpdateError>
where
    F: Fn(&Repository) -> C + Sync,
    C: UpdateCallbacks,
{
    let update_one = |repo: &Repository| {
        let callbacks = make_callbacks(repo);
        update_repository(repo, config, &callbacks)
    };

    if !config.parallel.enabled {
        return Ok(repos.iter().map(update_one).collect());
    }

    if config.parallel.max_concurrent == 0 {
        return Err(UpdateError::NoWorkers);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel.max_concurrent)
        .thread_name(|i| format!("update-git-{}", i))
        .build()?;

    let results: Vec<UpdateResult> = pool.install(|| repos.par_iter().map(update_one).collect());
    Ok(results)
}

/// Repositories found by the scanner and the subset the filter accepted.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub found: Vec<Repository>,
    pub accepted: Vec<Repository>,
}

impl Discovery {
    /// Repositories rejected by the filter.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.found.len() - self.accepted.len()
    }
}

/// Scans `config.base_dir` and applies the configured filter. Touches nothing.
pub fn discover(config: &UpdateConfig) -> Result<Discovery, UpdateError> {
    let found = repo::scan(&config.base_dir, config.git_logger)?;

    if found.is_empty() {
        tracing::warn!(base_dir = %config.base_dir.display(), "No git repositories found");
        return Ok(Discovery::default());
    }

    let accepted = match config.filter {
        Some(matcher) => filter::filter_repositories(matcher, found.clone()),
        None => found.clone(),
    };

    if accepted.is_empty() {
        tracing::warn!(
            discovered = found.len(),
            "Every repository was excluded by the filter"
        );
    }

    Ok(Discovery { found, accepted })
}

/// Updates the accepted repositories of `discovery` and aggregates the outcome.
///
/// Fails only when the worker pool cannot be set up. Individual repository
/// failures are reported through [`RunSummary::error_count`].
pub fn execute<F, C>(
    discovery: &Discovery,
    config: &UpdateConfig,
    make_callbacks: F,
) -> Result<RunSummary, UpdateError>
where
    F: Fn(&Repository) -> C + Sync,
    C: UpdateCallbacks,
{
    let start = Instant::now();
    let mut summary = RunSummary {
        discovered: discovery.found.len(),
        skipped: discovery.skipped(),
        ..RunSummary::default()
    };

    if discovery.accepted.is_empty() {
        summary.duration = start.elapsed();
        return Ok(summary);
    }

    tracing::info!(
        count = discovery.accepted.len(),
        parallel = config.parallel.enabled,
        max_concurrent = config.parallel.max_concurrent,
        timeout_secs = config.parallel.timeout.as_secs(),
        backup = config.backups_active(),
        "Starting repository updates"
    );

    summary.results = update_all(&discovery.accepted, make_callbacks, config)?;
    summary.duration = start.elapsed();

    tracing::info!(
        total = summary.total(),
        success = summary.success_count(),
        errors = summary.error_count(),
        "Repository update completed"
    );
    if !summary.is_success() {
        tracing::error!(
            "Update completed with {} errors out of {} repositories",
            summary.error_count(),
            summary.total()
        );
    }

    Ok(summary)
}

/// Performs one complete run against `config.base_dir`: discover, then execute.
pub fn run<F, C>(config: &UpdateConfig, make_callbacks: F) -> Result<RunSummary, UpdateError>
where
    F: Fn(&Repository) -> C + Sync,
    C: UpdateCallbacks,
{
    let discovery = discover(config)?;
    execute(&discovery, config, make_callbacks)
}
