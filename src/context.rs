use crate::models::PrCheckConfig;
use crate::state::{TrackingDomain, TrackingStore};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Everything a run needs to know about where it operates
///
/// Built once at startup and passed down; paths are resolved against the
/// git root so nothing depends on the process working directory.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub git_root: PathBuf,
    pub config: PrCheckConfig,
    /// Local date used for `last_checked` and the merged-today search
    pub today: NaiveDate,
}

impl RunContext {
    pub fn new(git_root: impl Into<PathBuf>, config: PrCheckConfig) -> Self {
        Self {
            git_root: git_root.into(),
            config,
            today: Local::now().date_naive(),
        }
    }

    /// Pin the run date (tests, replays)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today_str(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.config.output_dir)
    }

    pub fn pr_tracking_store(&self) -> TrackingStore {
        TrackingStore::new(
            self.resolve(&self.config.pr_tracking_file),
            TrackingDomain::PullRequests,
        )
    }

    pub fn branch_tracking_store(&self) -> TrackingStore {
        TrackingStore::new(
            self.resolve(&self.config.branch_tracking_file),
            TrackingDomain::Branches,
        )
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.git_root.join(path)
        }
    }
}
