//! Branch mode: compare the current branch with a target branch
//!
//! The comparison is keyed by `target:folder`; when the target tip has not
//! moved since the last check the run stops early and nothing is written.

use super::{diff_file, scoped_diff, DiffFile, TrackingSummary};
use crate::context::RunContext;
use crate::error::PreconditionError;
use crate::output::{BranchInfo, OutputDir};
use crate::state::{classify, Detection, EntityKey, EntityState, SaveReport};
use crate::vcs::LocalRepo;
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BranchRunOptions {
    pub folder: String,
    pub target_branch: String,
    pub force: bool,
}

/// The two sides being compared
#[derive(Debug, Clone)]
pub struct BranchComparison {
    pub target_branch: String,
    /// `target_branch` or `origin/<target_branch>`
    pub target_ref: String,
    pub current_branch: String,
    /// Empty when the ref could not be resolved
    pub target_sha: String,
    pub current_sha: String,
}

#[derive(Debug)]
pub struct BranchRunSummary {
    pub comparison: BranchComparison,
    pub tracking: TrackingSummary,
    pub detection: Detection,
    /// `None` when no common ancestor was found and the target tip was used
    pub merge_base: Option<String>,
    pub merge_base_sha: String,
    pub my_branch_diff: DiffFile,
    pub target_branch_diff: DiffFile,
    pub branch_info: PathBuf,
    pub saved: SaveReport,
}

#[derive(Debug)]
pub enum BranchRunOutcome {
    /// Target unchanged since the last check; tracking was not touched
    Skipped {
        comparison: BranchComparison,
        tracking: TrackingSummary,
        last_checked: String,
    },
    Completed(BranchRunSummary),
}

/// Run a branch comparison
pub fn run(ctx: &RunContext, repo: &dyn LocalRepo, opts: &BranchRunOptions) -> Result<BranchRunOutcome> {
    let target = opts.target_branch.as_str();
    if !repo.branch_exists(target) {
        return Err(PreconditionError::BranchNotFound(target.to_string()).into());
    }
    let current_branch = repo.current_branch();
    if current_branch == target {
        return Err(PreconditionError::SelfComparison(current_branch).into());
    }

    let out = OutputDir::new(ctx.output_dir());
    out.ensure()?;

    let target_ref = repo
        .resolve_branch_ref(target)
        .unwrap_or_else(|| format!("origin/{}", target));
    let comparison = BranchComparison {
        target_branch: target.to_string(),
        target_sha: repo.rev_parse(&target_ref).unwrap_or_default(),
        current_sha: repo.rev_parse("HEAD").unwrap_or_default(),
        target_ref,
        current_branch,
    };

    let store = ctx.branch_tracking_store();
    let (mut record, tracking) = TrackingSummary::load(&store);
    let key = EntityKey::branch(target, &opts.folder);
    let detection = classify(
        &key,
        Some(comparison.target_sha.as_str()),
        opts.force,
        &record,
    );
    log::debug!("branch {}: {}", key, detection.reason);

    if !detection.changed {
        return Ok(BranchRunOutcome::Skipped {
            comparison,
            tracking,
            last_checked: detection.last_checked,
        });
    }

    let merge_base = repo.merge_base(&comparison.target_ref, "HEAD");
    let merge_base_sha = merge_base
        .clone()
        .unwrap_or_else(|| comparison.target_sha.clone());

    let (diff, error) = scoped_diff(repo, &merge_base_sha, "HEAD", &opts.folder);
    let my_branch_diff = diff_file(out.write_my_branch_diff(&diff)?, &diff, error);

    let (diff, error) = scoped_diff(repo, &merge_base_sha, &comparison.target_ref, &opts.folder);
    let target_branch_diff = diff_file(out.write_target_branch_diff(&diff)?, &diff, error);

    let branch_info = out.write_branch_info(&BranchInfo::new(
        &comparison.target_branch,
        &comparison.current_branch,
        &comparison.target_sha,
        &comparison.current_sha,
        &merge_base_sha,
        &opts.folder,
    ))?;

    // A comparison whose diffs could not be produced is re-run next time
    let diff_failed = my_branch_diff.error.is_some() || target_branch_diff.error.is_some();
    let identity = if diff_failed {
        String::new()
    } else {
        comparison.target_sha.clone()
    };
    record.upsert(
        &key,
        EntityState::new(identity, ctx.today_str())
            .with_aux("target_branch", comparison.target_branch.clone())
            .with_aux("my_branch", comparison.current_branch.clone())
            .with_aux("my_sha", comparison.current_sha.clone())
            .with_aux("folder_analyzed", opts.folder.clone())
            .with_aux("change_reason", detection.reason.as_str()),
    );
    let saved = store
        .save(&mut record)
        .with_context(|| format!("Failed to save {}", store.path().display()))?;

    Ok(BranchRunOutcome::Completed(BranchRunSummary {
        comparison,
        tracking,
        detection,
        merge_base,
        merge_base_sha,
        my_branch_diff,
        target_branch_diff,
        branch_info,
        saved,
    }))
}
