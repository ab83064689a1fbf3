use crate::models::SelectionError;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop a check before any state is touched
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("Not in a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("GitHub CLI not authenticated. Run: gh auth login")]
    Unauthenticated,

    #[error("Branch '{0}' does not exist locally or on origin")]
    BranchNotFound(String),

    #[error("Current branch '{0}' is the comparison target. Please switch to a different branch.")]
    SelfComparison(String),

    #[error(transparent)]
    InvalidSelection(#[from] SelectionError),
}
