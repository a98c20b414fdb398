//! Repository selection by skip-list and include/exclude patterns.

use crate::error::FilterError;
use crate::repo::Repository;
use regex::Regex;
use std::collections::HashSet;

/// Decides whether a repository takes part in a run.
pub trait RepoMatcher: Send + Sync {
    fn should_process(&self, repo_name: &str) -> bool;
}

/// Immutable repository filter.
///
/// Checks run in order skip-list, exclude patterns, include patterns; the
/// first failing check rejects the repository.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    skip_repos: HashSet<String>,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

/// Summary of a filter's configuration, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub skip_count: usize,
}

impl FilterStats {
    #[must_use]
    pub fn has_include_pattern(&self) -> bool {
        !self.include_patterns.is_empty()
    }

    #[must_use]
    pub fn has_exclude_pattern(&self) -> bool {
        !self.exclude_patterns.is_empty()
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, FilterError> {
    patterns
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|p| !p.is_empty())
        .map(|pattern| {
            Regex::new(pattern)
                .inspect(|_| tracing::debug!(pattern, "Pattern compiled"))
                .map_err(|source| FilterError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
        })
        .collect()
}

impl Filter {
    /// Builds a filter. Empty pattern strings are ignored; any malformed
    /// pattern fails the whole construction.
    pub fn new<S: AsRef<str>>(
        include_patterns: &[S],
        exclude_patterns: &[S],
        skip_repos: &[S],
    ) -> Result<Self, FilterError> {
        let include = compile_all(include_patterns)?;
        let exclude = compile_all(exclude_patterns)?;
        let skip_repos: HashSet<String> = skip_repos
            .iter()
            .map(|name| name.as_ref().to_string())
            .collect();

        tracing::info!(
            include = include.len(),
            exclude = exclude.len(),
            skip_count = skip_repos.len(),
            "Repository filter configured"
        );

        Ok(Self {
            skip_repos,
            include,
            exclude,
        })
    }

    /// A filter that only applies a skip-list.
    pub fn skip_only<S: AsRef<str>>(skip_repos: &[S]) -> Self {
        Self {
            skip_repos: skip_repos
                .iter()
                .map(|name| name.as_ref().to_string())
                .collect(),
            ..Self::default()
        }
    }

    pub fn should_process(&self, repo_name: &str) -> bool {
        if self.skip_repos.contains(repo_name) {
            tracing::debug!(repository = repo_name, "Repository skipped (in skip list)");
            return false;
        }

        if self.exclude.iter().any(|re| re.is_match(repo_name)) {
            tracing::debug!(repository = repo_name, "Repository excluded by pattern");
            return false;
        }

        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(repo_name)) {
            tracing::debug!(repository = repo_name, "Repository not included by pattern");
            return false;
        }

        true
    }

    /// Keeps the repositories this filter accepts, preserving order.
    pub fn filter_repositories(&self, repos: Vec<Repository>) -> Vec<Repository> {
        filter_repositories(self, repos)
    }

    #[must_use]
    pub fn stats(&self) -> FilterStats {
        FilterStats {
            include_patterns: self.include.iter().map(|re| re.as_str().to_string()).collect(),
            exclude_patterns: self.exclude.iter().map(|re| re.as_str().to_string()).collect(),
            skip_count: self.skip_repos.len(),
        }
    }
}

impl RepoMatcher for Filter {
    fn should_process(&self, repo_name: &str) -> bool {
        Filter::should_process(self, repo_name)
    }
}

/// Keeps the repositories `matcher` accepts, preserving order.
pub fn filter_repositories(matcher: &dyn RepoMatcher, repos: Vec<Repository>) -> Vec<Repository> {
    let total = repos.len();
    let filtered: Vec<Repository> = repos
        .into_iter()
        .filter(|repo| matcher.should_process(&repo.name))
        .collect();

    tracing::info!(
        total,
        filtered = filtered.len(),
        skipped = total - filtered.len(),
        "Repository filtering completed"
    );
    filtered
}
