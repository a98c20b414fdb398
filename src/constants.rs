//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for a single repository pull (in seconds).
pub const DEFAULT_PULL_TIMEOUT_SECS: u64 = 5 * 60;

/// Environment variable overriding the pull timeout (in seconds).
///
/// Example: `UPDATE_GIT_TIMEOUT=60 update-git pull`
pub const TIMEOUT_ENV_VAR: &str = "UPDATE_GIT_TIMEOUT";

pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(DEFAULT_PULL_TIMEOUT_SECS);

/// Default worker pool size when parallel updates are enabled.
/// Git pulls are I/O-bound (network, disk), so this is not tied to CPU count.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// How often a running pull is polled for completion.
pub const PULL_POLL_INTERVAL_MS: u64 = 50;

/// Progress bar tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Maximum number of completed repositories to show in the parallel progress display.
pub const MAX_VISIBLE_COMPLETIONS: usize = 5;

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Branch name reported when the symbolic HEAD ref cannot be read.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Default directory scanned for repositories.
pub const DEFAULT_BASE_DIR: &str = "./git_repos";

/// Default root for backup artifacts.
pub const DEFAULT_BACKUP_DIR: &str = "./backups";

/// Format of the per-run backup directory name (`YYYYMMDD-HHMMSS`).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Backup path reported by the stash strategy when there was nothing to stash.
pub const NOTHING_TO_STASH: &str = "git-stash";

/// Prefix of the stash message; the run timestamp is appended.
pub const STASH_MESSAGE_PREFIX: &str = "update-git backup";

