//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands,
//! handling command execution and error formatting. Every command runs with
//! its working directory set to the target repository.

use crate::constants::PULL_POLL_INTERVAL_MS;
use crate::error::{GitCause, GitError};
use crate::terminal::Foreground;
use command_group::{CommandGroup, GroupChild};
use colored::Colorize;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

const GIT: &str = "git";
const HEADS_PREFIX: &str = "refs/heads/";

/// Callback invoked with every git command line before it runs.
pub type GitLogger = fn(&Path, &[&str]);

/// Prints each git invocation, dimmed, to stderr.
pub fn verbose_logger(repo: &Path, args: &[&str]) {
    let name = repo
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| repo.to_string_lossy());
    eprintln!(
        "  {} {}",
        format!("[{}]", name).dimmed(),
        format!("git {}", args.join(" ")).dimmed()
    );
}

pub fn no_op_logger(_repo: &Path, _args: &[&str]) {}

fn operation_name<'a>(args: &[&'a str]) -> &'a str {
    args.first().copied().unwrap_or("command")
}

fn check_output(repo: &Path, args: &[&str], output: Output) -> Result<Output, GitError> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(GitError::new(
        repo,
        operation_name(args),
        GitCause::Exit {
            code: output.status.to_string(),
            output: stderr,
        },
    ))
}

fn spawn_output(repo: &Path, args: &[&str]) -> Result<Output, GitError> {
    Command::new(GIT)
        .current_dir(repo)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| GitError::new(repo, operation_name(args), GitCause::Spawn(e)))
}

/// Runs a git command and returns its trimmed stdout.
pub fn run_git(repo: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = check_output(repo, args, spawn_output(repo, args)?)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Runs a git command and returns stdout and stderr together.
/// On failure the error carries the combined text as well.
fn run_git_combined(repo: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = spawn_output(repo, args)?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let combined = combined.trim().to_string();

    if output.status.success() {
        Ok(combined)
    } else {
        Err(GitError::new(
            repo,
            operation_name(args),
            GitCause::Exit {
                code: output.status.to_string(),
                output: combined,
            },
        ))
    }
}

/// Verifies the `git` executable can be launched and returns its version line.
pub fn ensure_available() -> Result<String, GitError> {
    let output = Command::new(GIT)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| GitError::new(Path::new(GIT), "--version", GitCause::Spawn(e)))?;
    let output = check_output(Path::new(GIT), &["--version"], output)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Returns the branch `HEAD` points at symbolically.
///
/// Fails for a detached `HEAD` or an unreadable repository; callers decide
/// what to substitute.
pub fn get_current_branch(repo: &Path, logger: GitLogger) -> Result<String, GitError> {
    let args = ["symbolic-ref", "--quiet", "HEAD"];
    logger(repo, &args);
    let reference = run_git(repo, &args)?;
    Ok(reference
        .strip_prefix(HEADS_PREFIX)
        .unwrap_or(&reference)
        .to_string())
}

/// Returns the raw `git branch` listing.
pub fn get_branches(repo: &Path, logger: GitLogger) -> Result<String, GitError> {
    let args = ["branch"];
    logger(repo, &args);
    run_git(repo, &args)
}

/// Reports whether the working tree has modified, staged or untracked files.
///
/// Answers `true` when the status query itself fails.
pub fn has_uncommitted_changes(repo: &Path, logger: GitLogger) -> bool {
    let args = ["status", "--porcelain"];
    logger(repo, &args);
    match run_git(repo, &args) {
        Ok(output) => !output.is_empty(),
        Err(e) => {
            tracing::warn!(
                path = %repo.display(),
                error = %e,
                "Failed to detect repository status, assuming changes exist"
            );
            true
        }
    }
}

/// Stashes all changes, untracked files included, under `message`.
/// Returns the combined output of `git stash push`.
pub fn stash_push(repo: &Path, message: &str, logger: GitLogger) -> Result<String, GitError> {
    let args = ["stash", "push", "--include-untracked", "-m", message];
    logger(repo, &args);
    run_git_combined(repo, &args)
}

/// Whether a pull may ask the user for credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prompts {
    /// Inherit stdin and lend the terminal to git while it runs.
    Terminal,
    /// No stdin and `GIT_TERMINAL_PROMPT=0`: git fails instead of asking.
    #[default]
    Disabled,
}

/// Runs `git pull` in its own process group.
///
/// Once `timeout` elapses the whole group is killed, including the `git fetch`
/// and transport processes below it, and the pull is reported as failed with
/// [`GitCause::Timeout`].
pub fn pull(
    repo: &Path,
    timeout: Duration,
    prompts: Prompts,
    logger: GitLogger,
) -> Result<(), GitError> {
    let args = ["pull"];
    logger(repo, &args);

    let mut command = Command::new(GIT);
    command
        .current_dir(repo)
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    match prompts {
        Prompts::Terminal => {
            command.stdin(Stdio::inherit());
        }
        Prompts::Disabled => {
            command.stdin(Stdio::null()).env("GIT_TERMINAL_PROMPT", "0");
        }
    }

    let mut child = command
        .group_spawn()
        .map_err(|e| GitError::new(repo, "pull", GitCause::Spawn(e)))?;

    let foreground = match prompts {
        Prompts::Terminal => Foreground::hand_to(child.id()),
        Prompts::Disabled => None,
    };
    let waited = wait_with_timeout(&mut child, timeout);
    drop(foreground);

    match waited {
        Ok(Some(status)) if status.success() => Ok(()),
        Ok(Some(status)) => Err(GitError::new(
            repo,
            "pull",
            GitCause::Exit {
                code: status.to_string(),
                output: String::new(),
            },
        )),
        Ok(None) => Err(GitError::new(repo, "pull", GitCause::Timeout(timeout))),
        Err(e) => Err(GitError::new(repo, "pull", GitCause::Wait(e))),
    }
}

/// Waits for `child` up to `timeout`. On expiry the child's whole process
/// group is killed, the leader is reaped and `Ok(None)` is returned.
fn wait_with_timeout(
    child: &mut GroupChild,
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    let poll = Duration::from_millis(PULL_POLL_INTERVAL_MS);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            // The group may exit between try_wait and kill
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(poll.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_name_uses_first_arg() {
        assert_eq!(operation_name(&["stash", "push"]), "stash");
        assert_eq!(operation_name(&[]), "command");
    }

    #[test]
    fn test_has_uncommitted_changes_fails_safe_for_missing_path() {
        let missing = Path::new("/no/such/repo/for/test");
        assert!(has_uncommitted_changes(missing, no_op_logger));
    }

    #[test]
    fn test_run_git_reports_spawn_failure_for_missing_repo_path() {
        let missing = Path::new("/no/such/repo/for/test");
        let err = run_git(missing, &["status"]).unwrap_err();
        assert!(matches!(err.cause, GitCause::Spawn(_)));
        assert!(err.to_string().contains("failed to spawn git command"));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_with_timeout_kills_slow_child() -> anyhow::Result<()> {
        let mut child = Command::new("sleep").arg("5").group_spawn()?;
        let started = Instant::now();
        let status = wait_with_timeout(&mut child, Duration::from_millis(100))?;
        assert!(status.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_with_timeout_returns_status_of_fast_child() -> anyhow::Result<()> {
        let mut child = Command::new("true").group_spawn()?;
        let status = wait_with_timeout(&mut child, Duration::from_secs(5))?;
        assert!(status.is_some_and(|s| s.success()));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_with_timeout_kills_grandchildren() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let marker = dir.path().join("still-running");
        // The subshell outlives its parent unless the whole group is killed
        let script = format!("(sleep 1; touch '{}') & wait", marker.display());
        let mut child = Command::new("sh").arg("-c").arg(&script).group_spawn()?;

        let status = wait_with_timeout(&mut child, Duration::from_millis(100))?;
        assert!(status.is_none());

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
        Ok(())
    }
}
