//! Terminal rendering of run summaries

use crate::context::RunContext;
use crate::orchestrator::{
    BranchRunOptions, BranchRunOutcome, DiffFile, FetchResult, Listing, PrRunOptions,
    PrRunOutcome, TrackingSummary,
};
use crate::output::folder_scope;
use crate::state::{ChangeReason, LoadOutcome, SaveReport};
use colored::Colorize;

const RULE_WIDTH: usize = 60;

fn rule() {
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// First 8 characters of a commit id
pub fn short_sha(sha: &str) -> &str {
    if sha.is_empty() {
        "unknown"
    } else {
        sha.get(..8).unwrap_or(sha)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

pub fn pr_header(ctx: &RunContext, opts: &PrRunOptions) {
    rule();
    println!("{}", "PR Daily Check".cyan().bold());
    rule();
    println!("Git root:         {}", ctx.git_root.display());
    if let Some(repo) = &ctx.config.repo {
        println!("Repository:       {}", repo);
    }
    println!("Folder focus:     {}", folder_scope(&opts.folder));
    let kinds: Vec<&str> = opts.kinds.iter().map(|k| k.as_str()).collect();
    println!("PR types:         {}", kinds.join(", "));
    println!("Force re-analyze: {}", yes_no(opts.force));
    println!("Date:             {}", ctx.today_str());
    println!();
}

pub fn branch_header(ctx: &RunContext, opts: &BranchRunOptions) {
    rule();
    println!("{}", "Branch Comparison Mode".cyan().bold());
    rule();
    println!("Git root:         {}", ctx.git_root.display());
    println!("Folder focus:     {}", folder_scope(&opts.folder));
    println!("Target branch:    {}", opts.target_branch);
    println!("Force re-analyze: {}", yes_no(opts.force));
    println!("Date:             {}", ctx.today_str());
    println!();
}

fn listings(listings: &[Listing]) {
    println!("{}", "Fetching PRs...".cyan());
    for listing in listings {
        match &listing.error {
            None => println!(
                "  → {}... found {}",
                listing.kind.description(),
                listing.found
            ),
            Some(error) => println!(
                "  → {}... {}",
                listing.kind.description(),
                format!("⚠ {}", error).yellow()
            ),
        }
    }
    let total: usize = listings.iter().map(|l| l.found).sum();
    println!("\nTotal PRs to analyze: {}", total);
    println!();
}

/// Describe how the tracking file was loaded
pub fn tracking_load(label: &str, tracking: &TrackingSummary, force: bool) {
    println!("{}", format!("Loading {} tracking data...", label).cyan());
    match &tracking.outcome {
        LoadOutcome::RecoveredFromBackup { primary, restored } => {
            println!(
                "{}",
                format!("⚠ Tracking file {} ({}), attempting recovery from backup...", primary.kind(), primary)
                    .yellow()
            );
            if *restored {
                println!("{}", "✓ Recovered tracking data from backup".green());
            } else {
                println!(
                    "{}",
                    "✓ Using backup data (could not restore the tracking file)".yellow()
                );
            }
        }
        LoadOutcome::Reset { primary, backup } => {
            println!(
                "{}",
                format!("⚠ Tracking file {} ({})", primary.kind(), primary).yellow()
            );
            println!("{}", format!("⚠ Backup {} ({})", backup.kind(), backup).yellow());
            println!(
                "{}",
                "⚠ All prior tracking lost, everything will be treated as new".yellow()
            );
        }
        LoadOutcome::Fresh | LoadOutcome::Loaded => {}
    }

    if force {
        println!(
            "{}",
            "⚠️  Force mode: will re-analyze (ignoring tracking)".yellow()
        );
    } else if let Some(last_run) = &tracking.last_run {
        println!("✓ Last run: {}", last_run);
        println!("✓ Tracked {}: {}", label, tracking.tracked);
    } else {
        println!("✓ First run - no tracking data yet");
    }
    println!();
}

fn saved(tracking: &TrackingSummary, report: &SaveReport) {
    if let Some(e) = &report.backup_error {
        println!("{}", format!("⚠ Could not create backup: {}", e).yellow());
    }
    println!(
        "{}",
        format!("✓ Tracking data saved to {}", tracking.path.display()).green()
    );
}

fn diff_written(diff: &DiffFile, empty_message: &str) {
    if let Some(error) = &diff.error {
        println!("{}", format!("⚠ Warning: Failed to get diff: {}", error).yellow());
    }
    if diff.is_empty() {
        println!("{}", format!("⚠ {}", empty_message).yellow());
    } else {
        println!(
            "{}",
            format!(
                "✓ Saved to {} ({} changed lines)",
                diff.path.display(),
                diff.changed_lines
            )
            .green()
        );
    }
}

fn reason_line(reason: ChangeReason, last_checked: &str) -> String {
    match reason {
        ChangeReason::New => format!("{} new", reason.emoji()),
        ChangeReason::Updated => format!("{} updated (new commits)", reason.emoji()),
        ChangeReason::Forced => format!("{} forced re-analyze", reason.emoji()),
        ChangeReason::Unknown => "couldn't fetch SHA, will analyze".to_string(),
        ChangeReason::Unchanged => {
            format!("{}  skipped (no changes since {})", reason.emoji(), last_checked)
        }
    }
}

pub fn pr_outcome(ctx: &RunContext, opts: &PrRunOptions, outcome: &PrRunOutcome) {
    let summary = match outcome {
        PrRunOutcome::NothingToDo {
            listings: found,
            pr_list,
        } => {
            listings(found);
            println!("{}", "No PRs found. Nothing to analyze.".yellow());
            println!("✓ Saved empty PR list to {}", pr_list.display());
            return;
        }
        PrRunOutcome::Completed(summary) => summary,
    };

    listings(&summary.listings);
    tracking_load("PRs", &summary.tracking, opts.force);

    println!("{}", "Checking for PR changes...".cyan());
    for check in &summary.checks {
        println!(
            "  → PR #{} ({})... {}",
            check.pull_request.number,
            check.pull_request.state,
            reason_line(check.detection.reason, &check.detection.last_checked)
        );
    }
    let analyzed = summary.analyzed().count();
    let skipped = summary.skipped().count();
    println!();
    println!("PRs to analyze: {}", analyzed);
    println!("PRs skipped (no changes): {}", skipped);
    println!();

    if summary.fetches.is_empty() {
        println!("No PRs need analysis - all unchanged since last check.");
    } else {
        println!("{}", "Fetching PR diffs for changed PRs...".cyan());
        for fetch in &summary.fetches {
            let result = match &fetch.result {
                FetchResult::Saved(_) => "saved".green(),
                FetchResult::EmptyForFolder => "no changes in target folder".normal(),
                FetchResult::Failed(error) => format!("⚠ {}", error).yellow(),
            };
            println!(
                "  → PR #{} ({}, {})... {}",
                fetch.number, fetch.state, fetch.reason, result
            );
        }
    }
    println!();

    println!(
        "{}",
        format!(
            "Getting current branch diff ({}..HEAD)...",
            ctx.config.base_branch
        )
        .cyan()
    );
    diff_written(
        &summary.my_branch_diff,
        &format!(
            "No changes in current branch (or same as {})",
            ctx.config.base_branch
        ),
    );
    println!();

    saved(&summary.tracking, &summary.saved);
    println!(
        "{}",
        format!("✓ Saved to {}", summary.pr_list.display()).green()
    );
    println!();

    rule();
    println!("{}", "✓ Data collection complete!".green().bold());
    println!("  Output directory: {}/", ctx.output_dir().display());
    println!("  Summary:");
    println!("    - PRs analyzed: {}", analyzed);
    println!("    - PRs skipped (no changes): {}", skipped);
    rule();
}

pub fn branch_outcome(ctx: &RunContext, opts: &BranchRunOptions, outcome: &BranchRunOutcome) {
    let (comparison, tracking) = match outcome {
        BranchRunOutcome::Skipped {
            comparison,
            tracking,
            ..
        } => (comparison, tracking),
        BranchRunOutcome::Completed(summary) => (&summary.comparison, &summary.tracking),
    };

    println!("{}", format!("✓ Branch '{}' found", comparison.target_branch).green());
    println!("✓ Current branch: {}", comparison.current_branch);
    println!("  Using target ref: {}", comparison.target_ref);
    println!("  Target SHA: {}", short_sha(&comparison.target_sha));
    println!("  Current SHA: {}", short_sha(&comparison.current_sha));
    println!();
    tracking_load("branches", tracking, opts.force);

    let summary = match outcome {
        BranchRunOutcome::Skipped { last_checked, .. } => {
            println!(
                "{}",
                format!("⏭️  Target branch unchanged since last check ({})", last_checked).yellow()
            );
            println!();
            rule();
            println!(
                "{}",
                "✓ Branch comparison skipped - no changes in target branch".green()
            );
            println!("  Target branch: {}", comparison.target_branch);
            println!("  Last checked: {}", last_checked);
            println!("  Target SHA: {}", short_sha(&comparison.target_sha));
            println!();
            println!("  To force re-analysis, run with --force:");
            println!(
                "    pr-daily-check check {} --branch {} --force",
                opts.folder, comparison.target_branch
            );
            rule();
            return;
        }
        BranchRunOutcome::Completed(summary) => summary,
    };

    match summary.detection.reason {
        ChangeReason::New => println!(
            "🆕 First time comparing against '{}' for folder '{}'",
            comparison.target_branch, opts.folder
        ),
        ChangeReason::Updated => println!(
            "🔄 Target branch has new commits since last check ({})",
            summary.detection.last_checked
        ),
        ChangeReason::Unknown => println!(
            "{}",
            "⚠ Could not resolve the target branch tip, will analyze".yellow()
        ),
        ChangeReason::Forced | ChangeReason::Unchanged => {}
    }
    println!();

    match &summary.merge_base {
        Some(sha) => println!("  Merge-base SHA: {}", short_sha(sha)),
        None => println!(
            "{}",
            "⚠ Could not find merge-base, falling back to direct diff".yellow()
        ),
    }
    println!();

    println!("{}", "Getting YOUR changes (merge-base → HEAD)...".cyan());
    diff_written(
        &summary.my_branch_diff,
        "No changes in your branch since merge-base",
    );
    println!();

    println!(
        "{}",
        format!(
            "Getting TARGET BRANCH changes (merge-base → {})...",
            comparison.target_branch
        )
        .cyan()
    );
    diff_written(
        &summary.target_branch_diff,
        &format!("No changes in {} since merge-base", comparison.target_branch),
    );
    println!();

    println!(
        "{}",
        format!("✓ Saved to {}", summary.branch_info.display()).green()
    );
    saved(tracking, &summary.saved);
    println!();

    rule();
    println!("{}", "✓ Branch comparison data collection complete!".green().bold());
    println!("  Output directory: {}/", ctx.output_dir().display());
    println!("  For conflict analysis, compare files that appear in BOTH diffs.");
    rule();
}
