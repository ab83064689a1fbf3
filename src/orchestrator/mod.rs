//! Fetch orchestration for the two check modes
//!
//! Runners never print; they return summaries that `cli::report` renders.

pub mod branch_mode;
pub mod pr_mode;

pub use branch_mode::{BranchComparison, BranchRunOptions, BranchRunOutcome, BranchRunSummary};
pub use pr_mode::{FetchResult, Listing, PrCheck, PrFetch, PrRunOptions, PrRunOutcome, PrRunSummary};

use crate::output::count_changed_lines;
use crate::state::{LoadOutcome, LoadReport, TrackingRecord, TrackingStore};
use crate::vcs::LocalRepo;
use std::path::PathBuf;

/// What loading a tracking file produced, for reporting
#[derive(Debug)]
pub struct TrackingSummary {
    pub path: PathBuf,
    pub outcome: LoadOutcome,
    pub last_run: Option<String>,
    pub tracked: usize,
}

impl TrackingSummary {
    fn load(store: &TrackingStore) -> (TrackingRecord, Self) {
        let LoadReport { record, outcome } = store.load();
        match &outcome {
            LoadOutcome::RecoveredFromBackup { primary, .. } => {
                log::debug!("{}: {}, recovered from backup", store.path().display(), primary)
            }
            LoadOutcome::Reset { primary, backup } => log::debug!(
                "{}: {}; backup: {}; tracking reset",
                store.path().display(),
                primary,
                backup
            ),
            LoadOutcome::Fresh | LoadOutcome::Loaded => {}
        }
        let summary = Self {
            path: store.path().to_path_buf(),
            outcome,
            last_run: record.last_run.clone(),
            tracked: record.len(),
        };
        (record, summary)
    }
}

/// A diff written to the output directory
#[derive(Debug, Clone)]
pub struct DiffFile {
    pub path: PathBuf,
    pub changed_lines: usize,
    /// Set when the diff could not be computed and an empty file was written
    pub error: Option<String>,
}

impl DiffFile {
    pub fn is_empty(&self) -> bool {
        self.changed_lines == 0
    }
}

/// Diff `from..to` limited to `folder`; failures degrade to an empty diff
fn scoped_diff(repo: &dyn LocalRepo, from: &str, to: &str, folder: &str) -> (String, Option<String>) {
    match repo.diff(from, to, folder) {
        Ok(diff) => (diff, None),
        Err(e) => {
            log::debug!("diff {}..{} failed: {:#}", from, to, e);
            (String::new(), Some(format!("{:#}", e)))
        }
    }
}

fn diff_file(path: PathBuf, diff: &str, error: Option<String>) -> DiffFile {
    DiffFile {
        path,
        changed_lines: count_changed_lines(diff),
        error,
    }
}
