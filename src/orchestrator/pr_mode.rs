//! PR mode: list PRs, skip the ones whose head has not moved, fetch the rest

use super::{diff_file, scoped_diff, DiffFile, TrackingSummary};
use crate::context::RunContext;
use crate::error::PreconditionError;
use crate::models::{PrKind, PullRequest};
use crate::output::{filter_diff_to_folder, OutputDir, PrListEntry};
use crate::state::{classify, ChangeReason, Detection, EntityKey, EntityState, SaveReport};
use crate::vcs::{LocalRepo, RemoteHost};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PrRunOptions {
    /// Folder the diffs are limited to, `.` for everything
    pub folder: String,
    pub kinds: Vec<PrKind>,
    pub force: bool,
}

/// Result of listing one PR kind
#[derive(Debug, Clone)]
pub struct Listing {
    pub kind: PrKind,
    pub found: usize,
    /// Set when the listing failed and was treated as empty
    pub error: Option<String>,
}

/// Change verdict for one PR
#[derive(Debug, Clone)]
pub struct PrCheck {
    pub pull_request: PullRequest,
    /// Head commit, empty when it could not be fetched
    pub sha: String,
    pub detection: Detection,
}

#[derive(Debug, Clone)]
pub enum FetchResult {
    Saved(PathBuf),
    /// The PR touches nothing under the folder
    EmptyForFolder,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PrFetch {
    pub number: u64,
    pub state: PrKind,
    pub reason: ChangeReason,
    pub result: FetchResult,
}

#[derive(Debug)]
pub struct PrRunSummary {
    pub listings: Vec<Listing>,
    pub tracking: TrackingSummary,
    pub checks: Vec<PrCheck>,
    pub fetches: Vec<PrFetch>,
    pub my_branch_diff: DiffFile,
    pub saved: SaveReport,
    pub pr_list: PathBuf,
    pub force: bool,
}

impl PrRunSummary {
    pub fn analyzed(&self) -> impl Iterator<Item = &PrCheck> {
        self.checks.iter().filter(|c| c.detection.changed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PrCheck> {
        self.checks.iter().filter(|c| !c.detection.changed)
    }
}

#[derive(Debug)]
pub enum PrRunOutcome {
    /// No PR matched the selection; tracking was not touched
    NothingToDo {
        listings: Vec<Listing>,
        pr_list: PathBuf,
    },
    Completed(PrRunSummary),
}

/// Run a PR check
///
/// Fails before touching any file when the host is not authenticated.
pub async fn run(
    ctx: &RunContext,
    host: &dyn RemoteHost,
    repo: &dyn LocalRepo,
    opts: &PrRunOptions,
) -> Result<PrRunOutcome> {
    if !host.is_authenticated().await {
        return Err(PreconditionError::Unauthenticated.into());
    }

    let out = OutputDir::new(ctx.output_dir());
    out.ensure()?;

    let mut listings = Vec::new();
    let mut pull_requests = Vec::new();
    for &kind in &opts.kinds {
        match host.list_pull_requests(kind, ctx.today).await {
            Ok(prs) => {
                listings.push(Listing {
                    kind,
                    found: prs.len(),
                    error: None,
                });
                pull_requests.extend(prs);
            }
            Err(e) => {
                log::debug!("listing {} PRs failed: {:#}", kind, e);
                listings.push(Listing {
                    kind,
                    found: 0,
                    error: Some(format!("{:#}", e)),
                });
            }
        }
    }

    if pull_requests.is_empty() {
        let pr_list = out.write_empty_pr_list()?;
        return Ok(PrRunOutcome::NothingToDo { listings, pr_list });
    }

    let store = ctx.pr_tracking_store();
    let (mut record, tracking) = TrackingSummary::load(&store);

    let mut checks = Vec::with_capacity(pull_requests.len());
    for pr in pull_requests {
        let key = EntityKey::pull_request(pr.number);
        let sha = host.head_sha(pr.number).await;
        let detection = classify(&key, sha.as_deref(), opts.force, &record);
        log::debug!("PR #{}: {}", pr.number, detection.reason);
        checks.push(PrCheck {
            pull_request: pr,
            sha: sha.unwrap_or_default(),
            detection,
        });
    }

    let mut fetches = Vec::new();
    for check in checks.iter().filter(|c| c.detection.changed) {
        let pr = &check.pull_request;
        let result = match host.pull_request_diff(pr.number).await {
            Ok(raw) => {
                let diff = filter_diff_to_folder(&raw, &opts.folder);
                match out.write_pr_diff(pr.number, &diff)? {
                    Some(path) => FetchResult::Saved(path),
                    None => FetchResult::EmptyForFolder,
                }
            }
            Err(e) => {
                log::debug!("diff for PR #{} failed: {:#}", pr.number, e);
                FetchResult::Failed(format!("{:#}", e))
            }
        };
        fetches.push(PrFetch {
            number: pr.number,
            state: pr.state,
            reason: check.detection.reason,
            result,
        });
    }

    let base_ref = repo
        .resolve_branch_ref(&ctx.config.base_branch)
        .unwrap_or_else(|| ctx.config.base_branch.clone());
    let (diff, error) = scoped_diff(repo, &base_ref, "HEAD", &opts.folder);
    let my_branch_diff = diff_file(out.write_my_branch_diff(&diff)?, &diff, error);

    let today = ctx.today_str();
    for check in checks.iter().filter(|c| c.detection.changed) {
        let pr = &check.pull_request;
        // No identity after a failed fetch, so the next run sees the PR as new
        let fetch_failed = fetches
            .iter()
            .any(|f| f.number == pr.number && matches!(f.result, FetchResult::Failed(_)));
        let identity = if fetch_failed {
            String::new()
        } else {
            check.sha.clone()
        };
        record.upsert(
            &EntityKey::pull_request(pr.number),
            EntityState::new(identity, today.clone())
                .with_aux("title", pr.title.clone())
                .with_aux("state", pr.state.as_str()),
        );
    }
    let saved = store
        .save(&mut record)
        .with_context(|| format!("Failed to save {}", store.path().display()))?;

    let (analyzed, skipped): (Vec<&PrCheck>, Vec<&PrCheck>) =
        checks.iter().partition(|c| c.detection.changed);
    let analyzed: Vec<PrListEntry> = analyzed.into_iter().map(|c| list_entry(c, false)).collect();
    let skipped: Vec<PrListEntry> = skipped.into_iter().map(|c| list_entry(c, true)).collect();
    let pr_list = out.write_pr_list(&analyzed, &skipped)?;

    Ok(PrRunOutcome::Completed(PrRunSummary {
        listings,
        tracking,
        checks,
        fetches,
        my_branch_diff,
        saved,
        pr_list,
        force: opts.force,
    }))
}

fn list_entry(check: &PrCheck, with_last_checked: bool) -> PrListEntry {
    let last_checked = with_last_checked.then(|| {
        if check.detection.last_checked.is_empty() {
            "unknown".to_string()
        } else {
            check.detection.last_checked.clone()
        }
    });
    PrListEntry {
        pull_request: check.pull_request.clone(),
        sha: check.sha.clone(),
        change_reason: check.detection.reason,
        last_checked,
    }
}
