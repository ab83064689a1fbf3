//! GitHub access through the `gh` CLI

use super::command_runner::CommandRunner;
use super::RemoteHost;
use crate::models::{PrKind, PullRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

const GH: &str = "gh";

/// `gh pr list --json` row
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: Option<GhAuthor>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhHead {
    #[serde(default)]
    head_ref_oid: String,
}

impl GhPullRequest {
    fn into_pull_request(self, state: PrKind) -> PullRequest {
        let author = self
            .author
            .and_then(|a| a.login)
            .unwrap_or_else(|| "unknown".to_string());
        PullRequest {
            number: self.number,
            title: self.title,
            author,
            url: self.url,
            merged_at: self.merged_at,
            created_at: self.created_at,
            state,
        }
    }
}

/// Remote host backed by the GitHub CLI
#[derive(Debug, Clone)]
pub struct GhCli {
    runner: CommandRunner,
    repo: Option<String>,
    base_branch: String,
    list_limit: u32,
}

impl GhCli {
    pub fn new(runner: CommandRunner, base_branch: impl Into<String>, list_limit: u32) -> Self {
        Self {
            runner,
            repo: None,
            base_branch: base_branch.into(),
            list_limit,
        }
    }

    /// Target an explicit `owner/name` instead of the current remote
    pub fn with_repo(mut self, repo: Option<String>) -> Self {
        self.repo = repo;
        self
    }

    fn list_args(&self, kind: PrKind, today: NaiveDate) -> Vec<String> {
        let (state, search, fields) = match kind {
            PrKind::Merged => (
                "merged",
                format!("merged:>={}", today.format("%Y-%m-%d")),
                "number,title,author,url,mergedAt",
            ),
            PrKind::Pending => (
                "open",
                "-is:draft".to_string(),
                "number,title,author,url,createdAt",
            ),
            PrKind::Draft => (
                "open",
                "is:draft".to_string(),
                "number,title,author,url,createdAt",
            ),
        };

        let mut args: Vec<String> = vec!["pr".into(), "list".into()];
        self.push_repo(&mut args);
        args.extend([
            "--base".to_string(),
            self.base_branch.clone(),
            "--state".to_string(),
            state.to_string(),
            "--search".to_string(),
            search,
            "--json".to_string(),
            fields.to_string(),
            "--limit".to_string(),
            self.list_limit.to_string(),
        ]);
        args
    }

    fn view_args(&self, number: u64) -> Vec<String> {
        let mut args: Vec<String> = vec!["pr".into(), "view".into(), number.to_string()];
        self.push_repo(&mut args);
        args.extend(["--json".to_string(), "headRefOid".to_string()]);
        args
    }

    fn diff_args(&self, number: u64) -> Vec<String> {
        let mut args: Vec<String> = vec!["pr".into(), "diff".into(), number.to_string()];
        self.push_repo(&mut args);
        args
    }

    fn push_repo(&self, args: &mut Vec<String>) {
        if let Some(repo) = &self.repo {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }
    }
}

/// Parse `gh pr list` output; blank output means no PRs
fn parse_pr_list(stdout: &str, kind: PrKind) -> Result<Vec<PullRequest>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<GhPullRequest> = serde_json::from_str(stdout)
        .with_context(|| format!("Invalid JSON from {} PRs query", kind))?;
    Ok(rows.into_iter().map(|r| r.into_pull_request(kind)).collect())
}

fn parse_head_sha(stdout: &str) -> Option<String> {
    serde_json::from_str::<GhHead>(stdout)
        .ok()
        .map(|h| h.head_ref_oid.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

#[async_trait]
impl RemoteHost for GhCli {
    async fn is_authenticated(&self) -> bool {
        let args = vec!["auth".to_string(), "status".to_string()];
        match self.runner.run(GH, &args).await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("gh auth status: {}", e);
                false
            }
        }
    }

    async fn list_pull_requests(&self, kind: PrKind, today: NaiveDate) -> Result<Vec<PullRequest>> {
        let stdout = self
            .runner
            .run(GH, &self.list_args(kind, today))
            .await
            .with_context(|| format!("Failed to fetch {} PRs", kind))?;
        parse_pr_list(&stdout, kind)
    }

    async fn head_sha(&self, number: u64) -> Option<String> {
        match self.runner.run(GH, &self.view_args(number)).await {
            Ok(stdout) => parse_head_sha(&stdout),
            Err(e) => {
                log::debug!("head sha for PR #{}: {}", number, e);
                None
            }
        }
    }

    async fn pull_request_diff(&self, number: u64) -> Result<String> {
        let stdout = self
            .runner
            .clone()
            .with_progress(true)
            .run(GH, &self.diff_args(number))
            .await
            .with_context(|| format!("Failed to get diff for PR #{}", number))?;
        Ok(stdout)
    }
}
