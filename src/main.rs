use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use update_git_rust::backup::BackupManager;
use update_git_rust::cli::{Cli, Command, Options};
use update_git_rust::config::{Config, ParallelUpdateConfig, Settings, UpdateConfig};
use update_git_rust::filter::Filter;
use update_git_rust::git::{self, Prompts};
use update_git_rust::output::{self, SequentialCallbacks};
use update_git_rust::update;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.options);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(options: &Options) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Returns whether every repository was updated.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = Config {
        verbosity: cli.options.verbosity(),
    };
    let settings = cli.options.settings();

    let version = git::ensure_available().context("git executable not found on PATH")?;
    tracing::debug!(%version, "git is available");

    let base_dir = resolve_base_dir(&settings.git.base_dir)?;
    output::print_working_dir(&base_dir, &config);

    let filter = Filter::new(
        &settings.filter.include_patterns,
        &settings.filter.exclude_patterns,
        &settings.filter.skip_repos,
    )
    .context("Failed to initialize filter")?;

    match cli.command {
        Command::Check => check(&base_dir, &filter, &config),
        Command::Pull => pull(&base_dir, &filter, &settings, &cli.options, &config),
    }
}

fn resolve_base_dir(base_dir: &Path) -> anyhow::Result<std::path::PathBuf> {
    if !base_dir.is_dir() {
        anyhow::bail!(
            "Directory validation failed: directory does not exist: {}",
            base_dir.display()
        );
    }
    std::path::absolute(base_dir)
        .with_context(|| format!("Failed to get absolute path of {}", base_dir.display()))
}

fn check(base_dir: &Path, filter: &Filter, config: &Config) -> anyhow::Result<bool> {
    let update_config = UpdateConfig::new(base_dir)
        .with_filter(filter)
        .with_git_logger(config.git_logger());
    let discovery = update::discover(&update_config)?;
    output::print_repositories(&discovery.found, &discovery.accepted, config);
    Ok(true)
}

fn pull(
    base_dir: &Path,
    filter: &Filter,
    settings: &Settings,
    options: &Options,
    config: &Config,
) -> anyhow::Result<bool> {
    if settings.git.parallel_enabled && settings.git.max_concurrent == 0 {
        anyhow::bail!("git.max_concurrent must be at least 1 when parallel updates are enabled");
    }

    let backup_manager = if settings.backup.enabled {
        let manager = BackupManager::new(
            &settings.backup.directory,
            settings.backup.strategy,
            config.git_logger(),
        )
        .context("Failed to initialize backup manager")?;
        Some(manager)
    } else {
        tracing::debug!("Backup disabled, skipping backup manager initialization");
        None
    };

    let backup_stats = backup_manager.as_ref().map(BackupManager::stats);
    output::print_run_settings(config, &filter.stats(), backup_stats.as_ref());

    let parallel = ParallelUpdateConfig {
        enabled: settings.git.parallel_enabled,
        max_concurrent: settings.git.max_concurrent,
        timeout: options.pull_timeout(),
    };
    let mut update_config = UpdateConfig::new(base_dir)
        .with_parallel(parallel)
        .with_filter(filter)
        .with_git_logger(config.git_logger())
        .with_prompts(Prompts::Terminal);
    if let Some(manager) = &backup_manager {
        update_config = update_config.with_backup(manager);
    }

    let discovery = update::discover(&update_config)?;

    let summary = if parallel.enabled {
        let progress = output::create_pull_progress(discovery.accepted.len(), config);
        let summary = update::execute(&discovery, &update_config, |_| progress.tracker(*config));
        progress.finish();
        summary?
    } else {
        update::execute(&discovery, &update_config, |_| {
            SequentialCallbacks::new(*config)
        })?
    };

    output::print_summary(&summary, config);
    Ok(summary.is_success())
}
