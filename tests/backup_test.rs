mod common;

use common::TestRepo;
use tempfile::TempDir;
use update_git_rust::backup::{BackupLocation, BackupManager, BackupStrategy};
use update_git_rust::error::BackupError;
use update_git_rust::git::{self, no_op_logger};

#[test]
fn test_stash_backup_of_clean_repo_creates_nothing() -> anyhow::Result<()> {
    let repo = TestRepo::new()?;
    let backups = TempDir::new()?;
    let manager = BackupManager::new(backups.path(), BackupStrategy::Stash, no_op_logger)?;

    let info = manager.create_backup(repo.path(), "repo")?;

    assert_eq!(info.location, BackupLocation::NothingToStash);
    assert_eq!(info.backup_path(), "git-stash");
    assert!(!repo.has_stash()?);
    Ok(())
}

#[test]
fn test_stash_backup_of_dirty_repo_creates_one_stash() -> anyhow::Result<()> {
    let repo = TestRepo::new()?;
    repo.make_dirty()?;
    repo.make_untracked()?;
    let backups = TempDir::new()?;
    let manager = BackupManager::new(backups.path(), BackupStrategy::Stash, no_op_logger)?;

    let info = manager.create_backup(repo.path(), "repo")?;

    let stashes = repo.stash_list()?;
    assert_eq!(stashes.len(), 1);
    assert!(stashes[0].contains(manager.timestamp()));
    assert!(info.backup_path().starts_with("stash: "));
    assert!(info.backup_path().contains(manager.timestamp()));
    assert!(!git::has_uncommitted_changes(repo.path(), no_op_logger));
    Ok(())
}

#[test]
fn test_copy_backup_of_real_repository() -> anyhow::Result<()> {
    let repo = TestRepo::new()?;
    repo.make_dirty()?;
    repo.make_untracked()?;
    let backups = TempDir::new()?;
    let manager = BackupManager::new(backups.path(), BackupStrategy::Copy, no_op_logger)?;

    let info = manager.create_backup(repo.path(), "repo")?;

    let copy = manager.backup_dir().join("repo");
    assert_eq!(info.location, BackupLocation::Directory(copy.clone()));
    assert_eq!(
        std::fs::read_to_string(copy.join("README.md"))?,
        "# Modified\n"
    );
    assert!(copy.join("untracked.txt").exists());
    assert!(!copy.join(".git").exists());

    // Copying leaves the working tree as it was.
    assert!(git::has_uncommitted_changes(repo.path(), no_op_logger));
    Ok(())
}

#[test]
fn test_stash_backup_of_non_repository_fails() -> anyhow::Result<()> {
    let not_repo = TempDir::new()?;
    let backups = TempDir::new()?;
    let manager = BackupManager::new(backups.path(), BackupStrategy::Stash, no_op_logger)?;

    // The status check fails, so changes are assumed and the stash itself fails.
    let err = manager
        .create_backup(not_repo.path(), "plain")
        .unwrap_err();

    assert!(matches!(err, BackupError::Operation { .. }));
    assert_eq!(err.operation_name(), Some("git stash"));
    Ok(())
}
