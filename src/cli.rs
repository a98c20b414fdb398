//! Command-line surface.

use crate::backup::BackupStrategy;
use crate::config::{BackupSettings, FilterSettings, GitSettings, Settings, Verbosity};
use crate::constants;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "update-git",
    version,
    about = "Update local git repositories with advanced features",
    long_about = "Scans a base directory for git repositories and runs 'git pull' on each one, \
                  optionally backing them up first and skipping repositories by name or pattern."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Update git repositories
    Pull,
    /// Check preconditions and list the repositories a pull would touch
    Check,
}

#[derive(Debug, Clone, Default, Args)]
pub struct Options {
    /// Base directory for git repositories
    #[arg(short = 'G', long, global = true, value_name = "DIR")]
    pub git_base_dir: Option<PathBuf>,

    /// Enable parallel git repository updates
    #[arg(short = 'P', long, global = true, value_name = "BOOL")]
    pub git_parallel_enabled: Option<bool>,

    /// Maximum number of concurrent repository updates
    #[arg(short = 'J', long, global = true, value_name = "N")]
    pub git_max_concurrent: Option<usize>,

    /// Create a backup before updating
    #[arg(short = 'B', long, global = true)]
    pub backup_enabled: bool,

    /// Directory to store backups
    #[arg(short = 'Z', long = "backup-dir", global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Backup strategy ('copy' or 'stash')
    #[arg(short = 'Y', long, global = true, value_name = "STRATEGY")]
    pub backup_strategy: Option<BackupStrategy>,

    /// Include repositories matching pattern (regex, repeatable)
    #[arg(short = 'I', long, global = true, value_name = "REGEX")]
    pub include_patterns: Vec<String>,

    /// Exclude repositories matching pattern (regex, repeatable)
    #[arg(short = 'E', long, global = true, value_name = "REGEX")]
    pub exclude_patterns: Vec<String>,

    /// Repository names to skip
    #[arg(short = 'S', long, global = true, value_delimiter = ',', value_name = "NAME")]
    pub skip_repos: Vec<String>,

    /// Per-repository pull timeout in seconds [env: UPDATE_GIT_TIMEOUT] [default: 300]
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only print the final count and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print every step and git command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,
}

impl Options {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Default log filter when RUST_LOG is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    /// Layers the given flags over the built-in defaults.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let git = GitSettings::default();
        let backup = BackupSettings::default();

        Settings {
            git: GitSettings {
                base_dir: self.git_base_dir.clone().unwrap_or(git.base_dir),
                parallel_enabled: self.git_parallel_enabled.unwrap_or(git.parallel_enabled),
                max_concurrent: self.git_max_concurrent.unwrap_or(git.max_concurrent),
            },
            backup: BackupSettings {
                enabled: self.backup_enabled || backup.enabled,
                directory: self.backup_dir.clone().unwrap_or(backup.directory),
                strategy: self.backup_strategy.unwrap_or(backup.strategy),
            },
            filter: FilterSettings {
                include_patterns: self.include_patterns.clone(),
                exclude_patterns: self.exclude_patterns.clone(),
                skip_repos: self.skip_repos.clone(),
            },
        }
    }

    /// `--timeout` wins over UPDATE_GIT_TIMEOUT, which wins over the default.
    #[must_use]
    pub fn pull_timeout(&self) -> Duration {
        let from_env = std::env::var(constants::TIMEOUT_ENV_VAR).ok();
        resolve_timeout(self.timeout, from_env.as_deref())
    }
}

/// Zero and unparsable values fall through to the next source.
fn resolve_timeout(flag: Option<u64>, env: Option<&str>) -> Duration {
    flag.filter(|secs| *secs > 0)
        .or_else(|| {
            env.and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
        })
        .map(Duration::from_secs)
        .unwrap_or(constants::DEFAULT_PULL_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("update-git").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = parse(&["pull"]);
        assert_eq!(cli.command, Command::Pull);
        assert_eq!(cli.options.settings(), Settings::default());
        assert_eq!(cli.options.verbosity(), Verbosity::Normal);
        assert_eq!(cli.options.log_level(), "warn");
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "pull",
            "-G",
            "/srv/repos",
            "-P",
            "false",
            "-J",
            "3",
            "-B",
            "-Z",
            "/tmp/bk",
            "-Y",
            "stash",
            "-S",
            "a,b",
            "-S",
            "c",
            "-I",
            "^svc-",
            "--timeout",
            "12",
        ]);
        let settings = cli.options.settings();

        assert_eq!(settings.git.base_dir, PathBuf::from("/srv/repos"));
        assert!(!settings.git.parallel_enabled);
        assert_eq!(settings.git.max_concurrent, 3);
        assert!(settings.backup.enabled);
        assert_eq!(settings.backup.directory, PathBuf::from("/tmp/bk"));
        assert_eq!(settings.backup.strategy, BackupStrategy::Stash);
        assert_eq!(settings.filter.skip_repos, vec!["a", "b", "c"]);
        assert_eq!(settings.filter.include_patterns, vec!["^svc-"]);
        assert_eq!(cli.options.pull_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_global_flags_accepted_before_subcommand() {
        let cli = parse(&["-v", "-D", "check"]);
        assert_eq!(cli.command, Command::Check);
        assert_eq!(cli.options.verbosity(), Verbosity::Verbose);
        assert_eq!(cli.options.log_level(), "debug");
    }

    #[test]
    fn test_patterns_keep_commas_and_repeat() {
        let cli = parse(&[
            "pull",
            "-I",
            "^svc-[a-z]{2,4}$",
            "-I",
            "^lib-",
            "-E",
            "x{1,}",
        ]);
        let settings = cli.options.settings();

        assert_eq!(
            settings.filter.include_patterns,
            vec!["^svc-[a-z]{2,4}$", "^lib-"]
        );
        assert_eq!(settings.filter.exclude_patterns, vec!["x{1,}"]);
        assert!(
            crate::filter::Filter::new(
                &settings.filter.include_patterns,
                &settings.filter.exclude_patterns,
                &settings.filter.skip_repos,
            )
            .is_ok()
        );
    }

    #[test]
    fn test_timeout_precedence() {
        let default = constants::DEFAULT_PULL_TIMEOUT;
        assert_eq!(resolve_timeout(Some(12), Some("40")), Duration::from_secs(12));
        assert_eq!(resolve_timeout(None, Some("40")), Duration::from_secs(40));
        assert_eq!(resolve_timeout(Some(0), Some("40")), Duration::from_secs(40));
        assert_eq!(resolve_timeout(None, Some("soon")), default);
        assert_eq!(resolve_timeout(None, Some("0")), default);
        assert_eq!(resolve_timeout(None, None), default);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = Cli::try_parse_from(["update-git", "pull", "-Y", "rsync"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["update-git", "pull", "-q", "-v"]);
        assert!(result.is_err());
    }
}
