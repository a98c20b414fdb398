//! Bulk git repository updater library.
//!
//! This crate updates every git repository found directly under a base
//! directory by:
//! - Discovering repositories and their current branch
//! - Skipping repositories by name or regular expression
//! - Optionally backing each one up (file copy or git stash)
//! - Pulling, one at a time or on a bounded worker pool with a timeout
//! - Reporting a per-repository and aggregate outcome

pub mod backup;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod git;
pub mod output;
pub mod repo;
mod terminal;
pub mod update;
