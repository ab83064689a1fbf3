//! External collaborators: the remote host (GitHub through `gh`) and the
//! local git repository.

pub mod command_runner;
pub mod git;
pub mod github;

pub use command_runner::{CommandError, CommandRunner};
pub use git::GitRepository;
pub use github::GhCli;

use crate::models::{PrKind, PullRequest};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;

/// Remote host holding the pull requests
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// Whether the host CLI has a usable login
    async fn is_authenticated(&self) -> bool;

    /// PRs of one kind targeting the base branch; `today` bounds the merged search
    async fn list_pull_requests(&self, kind: PrKind, today: NaiveDate) -> Result<Vec<PullRequest>>;

    /// Current head commit of a PR, `None` when it cannot be determined
    async fn head_sha(&self, number: u64) -> Option<String>;

    /// Full unified diff of a PR
    async fn pull_request_diff(&self, number: u64) -> Result<String>;
}

/// Local repository queries
pub trait LocalRepo {
    /// Working tree root
    fn root(&self) -> &Path;

    /// Checked-out branch name, `HEAD` when detached
    fn current_branch(&self) -> String;

    /// True when `name` exists locally or as `origin/<name>`
    fn branch_exists(&self, name: &str) -> bool;

    /// Ref to use for `name`: the local branch if present, else `origin/<name>`
    fn resolve_branch_ref(&self, name: &str) -> Option<String>;

    /// Full commit id of a revision
    fn rev_parse(&self, rev: &str) -> Option<String>;

    fn merge_base(&self, a: &str, b: &str) -> Option<String>;

    /// Unified diff between two revisions, limited to `folder` (`.` for everything)
    fn diff(&self, from: &str, to: &str, folder: &str) -> Result<String>;
}
