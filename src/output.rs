//! Progress bars, colored output, and summary formatting.
//!
//! Sequential runs print a banner around each repository because `git pull`
//! writes straight to the terminal. Parallel runs show a progress bar with the
//! most recent completions instead.

use crate::backup::BackupStats;
use crate::config::Config;
use crate::constants::{MAX_VISIBLE_COMPLETIONS, PROGRESS_TICK_MS};
use crate::filter::FilterStats;
use crate::repo::Repository;
use crate::update::{BackupStatus, RunSummary, UpdateCallbacks, UpdateOutcome, UpdateResult, UpdateStep};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RULE_WIDTH: usize = 50;

/// Prints a repository header in verbose mode.
pub fn print_repo_header(config: &Config, repo_name: &str) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("\n{}", format!("[{}]", repo_name).white().bold());
}

/// Prints a step progress message in verbose mode.
pub fn print_step(config: &Config, step: &UpdateStep) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("  {}", format_step_message(step).dimmed());
}

/// Prints completion status (verbose mode only).
pub fn print_completion_status(config: &Config, result: &UpdateResult) {
    if !config.is_verbose() {
        return;
    }
    match &result.outcome {
        UpdateOutcome::Success => eprintln!("  {} completed successfully", "✓".green()),
        UpdateOutcome::Failed(failure) => eprintln!("  {} failed: {}", "✗".red(), failure.error),
    }
}

/// Callbacks for one-at-a-time runs. Frames each repository so the
/// interleaved `git pull` output stays readable.
#[derive(Debug, Clone, Copy)]
pub struct SequentialCallbacks {
    config: Config,
}

impl SequentialCallbacks {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl UpdateCallbacks for SequentialCallbacks {
    fn on_update_start(&self, repo: &Repository) {
        if self.config.is_quiet() {
            return;
        }
        println!("{}", "------------- BEGIN -------------".cyan().dimmed());
        println!(
            "{} '{}' on branch '{}'",
            "Updating repository:".cyan(),
            repo.name.white().bold(),
            repo.current_branch
        );
        println!(
            "{}",
            "If necessary, enter login/password when prompted.".dimmed()
        );
    }

    fn on_step(&self, step: &UpdateStep) {
        print_step(&self.config, step);
    }

    fn on_complete(&self, result: &UpdateResult) {
        print_completion_status(&self.config, result);
        if self.config.is_quiet() {
            return;
        }
        if let BackupStatus::Failed(error) = &result.backup {
            println!("{} {}", "backup failed:".yellow(), error);
        }
        match &result.outcome {
            UpdateOutcome::Success => println!(
                "{} {} updated",
                "✓".green(),
                result.repository.name
            ),
            UpdateOutcome::Failed(failure) => println!(
                "{} {} failed: {}",
                "✗".red(),
                result.repository.name,
                failure.error
            ),
        }
        println!("{}\n", "-".repeat(33).cyan().dimmed());
    }
}

/// How a repository ended, as shown in the recent-pulls list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullMark {
    Updated,
    Failed,
    TimedOut,
}

impl PullMark {
    fn of(result: &UpdateResult) -> Self {
        match &result.outcome {
            UpdateOutcome::Success => Self::Updated,
            UpdateOutcome::Failed(failure) if failure.timed_out => Self::TimedOut,
            UpdateOutcome::Failed(_) => Self::Failed,
        }
    }

    fn label(self, name: &str) -> String {
        match self {
            Self::Updated => format!("{} {}", "✓".green(), name),
            Self::Failed => format!("{} {}", "✗".red(), name),
            Self::TimedOut => format!("{} {} {}", "✗".red(), name, "(timed out)".dimmed()),
        }
    }
}

/// Everything the workers update together, behind one lock.
#[derive(Default)]
struct PullTally {
    recent: VecDeque<(String, PullMark)>,
    finished: usize,
    failed: usize,
}

impl PullTally {
    fn record(&mut self, name: &str, mark: PullMark) {
        self.finished += 1;
        if mark != PullMark::Updated {
            self.failed += 1;
        }
        self.recent.push_back((name.to_string(), mark));
        if self.recent.len() > MAX_VISIBLE_COMPLETIONS {
            self.recent.pop_front();
        }
    }

    /// Lines for the slots under the bar. The first slot turns into an
    /// ellipsis once older entries have scrolled out.
    fn lines(&self, slots: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(slots);
        let mut recent = self.recent.iter();
        if self.finished > slots {
            lines.push("...".dimmed().to_string());
            recent.next();
        }
        lines.extend(recent.map(|(name, mark)| mark.label(name)));
        lines.resize(slots, String::new());
        lines
    }
}

/// Shared progress display for a parallel run: one bar counting finished
/// repositories and a short list of the latest outcomes.
#[derive(Clone)]
pub struct PullProgress {
    _multi: Arc<MultiProgress>,
    bar: ProgressBar,
    slots: Vec<ProgressBar>,
    tally: Arc<Mutex<PullTally>>,
}

impl PullProgress {
    /// Callbacks for one worker's repository.
    pub fn tracker(&self, config: Config) -> RepoProgressTracker {
        RepoProgressTracker {
            progress: self.clone(),
            config,
        }
    }

    fn record(&self, result: &UpdateResult) {
        let mark = PullMark::of(result);
        let mut tally = self.tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tally.record(&result.repository.name, mark);

        self.bar.inc(1);
        if tally.failed > 0 {
            self.bar
                .set_message(format!("│ {} failed", tally.failed).red().to_string());
        }
        for (slot, line) in self.slots.iter().zip(tally.lines(self.slots.len())) {
            slot.set_message(line);
        }
    }

    #[cfg(test)]
    fn finished(&self) -> usize {
        self.tally
            .lock()
            .map(|tally| tally.finished)
            .unwrap_or_else(|poisoned| poisoned.into_inner().finished)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
        self.slots.iter().for_each(ProgressBar::finish_and_clear);
    }
}

/// Per-repository callbacks for parallel runs. Verbose mode prints steps
/// instead of drawing the bar.
#[derive(Clone)]
pub struct RepoProgressTracker {
    progress: PullProgress,
    config: Config,
}

impl UpdateCallbacks for RepoProgressTracker {
    fn on_update_start(&self, repo: &Repository) {
        print_repo_header(&self.config, &repo.name);
    }

    fn on_step(&self, step: &UpdateStep) {
        print_step(&self.config, step);
    }

    fn on_complete(&self, result: &UpdateResult) {
        print_completion_status(&self.config, result);
        self.progress.record(result);
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Builds the parallel-run display for `total` repositories. Everything is
/// hidden in quiet and verbose mode.
#[must_use]
pub fn create_pull_progress(total: usize, config: &Config) -> PullProgress {
    let multi = Arc::new(MultiProgress::new());

    let (bar, slots) = if config.is_quiet() || config.is_verbose() {
        (ProgressBar::hidden(), Vec::new())
    } else {
        let bar = multi.add(ProgressBar::new(total as u64));
        bar.set_style(
            bar_style("{bar:40.cyan/blue} {pos}/{len} pulled {spinner:.cyan} {msg}")
                .progress_chars("█░"),
        );
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));

        let visible = MAX_VISIBLE_COMPLETIONS.min(total);
        let slots = (0..visible)
            .map(|_| {
                let slot = multi.add(ProgressBar::new_spinner());
                slot.set_style(bar_style("  {msg}"));
                slot
            })
            .collect();
        (bar, slots)
    };

    PullProgress {
        _multi: multi,
        bar,
        slots,
        tally: Arc::new(Mutex::new(PullTally::default())),
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        path.display().to_string().white().bold()
    )
}

/// Describes the configured filter and backup manager in verbose mode.
pub fn print_run_settings(config: &Config, filter: &FilterStats, backup: Option<&BackupStats>) {
    if !config.is_verbose() {
        return;
    }
    let mut parts = vec![format!("skip_count={}", filter.skip_count)];
    if filter.has_include_pattern() {
        parts.push(format!("include={}", filter.include_patterns.join(" | ")));
    }
    if filter.has_exclude_pattern() {
        parts.push(format!("exclude={}", filter.exclude_patterns.join(" | ")));
    }
    eprintln!("{}", format!("filter: {}", parts.join(" ")).dimmed());
    if let Some(stats) = backup {
        eprintln!(
            "{}",
            format!(
                "backup: dir={} strategy={} timestamp={}",
                stats.backup_dir.display(),
                stats.strategy,
                stats.timestamp
            )
            .dimmed()
        );
    }
}

pub fn print_repositories(repos: &[Repository], accepted: &[Repository], config: &Config) {
    if config.is_quiet() {
        return;
    }
    if repos.is_empty() {
        print_no_repos();
        return;
    }
    for repo in repos {
        let marker = if accepted.iter().any(|a| a.path == repo.path) {
            "+".green()
        } else {
            "-".dimmed()
        };
        println!("  {} {} ({})", marker, repo.name, repo.current_branch.dimmed());
    }
    println!(
        "{}",
        format!("{} of {} repositories selected", accepted.len(), repos.len()).dimmed()
    );
}

pub fn print_summary(summary: &RunSummary, config: &Config) {
    if config.is_quiet() {
        print_quiet_summary(summary);
    } else {
        print_normal_summary(summary);
    }
}

fn print_quiet_summary(summary: &RunSummary) {
    // Always print count to stdout
    println!(
        "{}/{} repositories updated",
        summary.success_count(),
        summary.total()
    );

    for result in &summary.results {
        if let UpdateOutcome::Failed(failure) = &result.outcome {
            eprintln!(
                "error: {}: {}",
                result.repository.path.display(),
                failure.error
            );
        }
    }
}

fn print_normal_summary(summary: &RunSummary) {
    if summary.discovered == 0 {
        print_no_repos();
        return;
    }
    if summary.total() == 0 {
        println!(
            "{}",
            format!(
                "All {} repositories were excluded by the filter",
                summary.discovered
            )
            .yellow()
            .bold()
        );
        return;
    }

    print_section("Summary");
    let (successes, failures): (Vec<_>, Vec<_>) =
        summary.results.iter().partition(|r| r.is_success());

    print_successes(&successes);
    print_failures(&failures);

    let skipped = if summary.skipped > 0 {
        format!(" ({} skipped)", summary.skipped).dimmed()
    } else {
        "".normal()
    };
    println!(
        "{}: {}/{} repos in {}{}",
        "Total".white().bold(),
        successes.len(),
        summary.total(),
        format_duration(summary.duration),
        skipped
    );
}

fn print_no_repos() {
    println!("{}", "No git repositories found".yellow().bold())
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

fn print_section(title: &str) {
    let line = "=".repeat(RULE_WIDTH).cyan().dimmed();
    let padding = (RULE_WIDTH - title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}

fn backup_note(status: &BackupStatus) -> String {
    match status {
        BackupStatus::Skipped => String::new(),
        BackupStatus::Created(info) => format!(" (backup: {})", info.location),
        BackupStatus::Failed(_) => " (backup failed)".to_string(),
    }
}

fn print_successes(successes: &[&UpdateResult]) {
    if successes.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("Succeeded ({}):", successes.len()).green().bold()
    );

    for result in successes {
        println!(
            "  {} {} {}{} in {}",
            "OK".green().bold(),
            result.repository.path.display().to_string().white(),
            result.repository.current_branch.cyan(),
            backup_note(&result.backup).yellow(),
            format_duration(result.duration).dimmed(),
        );
    }
    println!();
}

fn print_failures(failures: &[&UpdateResult]) {
    if failures.is_empty() {
        return;
    }

    println!("{}", format!("Failed ({}):", failures.len()).red().bold());

    for result in failures {
        if let UpdateOutcome::Failed(failure) = &result.outcome {
            println!(
                "  {} {} {}{} in {}",
                "FAIL".red().bold(),
                result.repository.path.display().to_string().white(),
                format!("at {}: {}", failure.step, failure.error).red(),
                backup_note(&result.backup).yellow(),
                format_duration(result.duration).dimmed(),
            );
        }
    }
    println!();
}

fn format_step_message(step: &UpdateStep) -> &'static str {
    match step {
        UpdateStep::Started => "Starting update...",
        UpdateStep::BackingUp => "Creating backup...",
        UpdateStep::ListingBranches => "Listing local branches...",
        UpdateStep::Pulling => "Pulling changes from remote...",
        UpdateStep::Completed => "Completed",
    }
}
