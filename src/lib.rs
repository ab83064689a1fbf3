// pr-daily-check - change-aware PR and branch diff collection
// Tracks the last analyzed commit of every PR and branch comparison so daily runs only refetch what moved

pub mod cli;
pub mod context;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod state;
pub mod vcs;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use context::RunContext;
pub use error::PreconditionError;
pub use models::{PrCheckConfig, PrKind, PullRequest};
pub use state::{ChangeReason, Detection, TrackingRecord, TrackingStore};
