//! Errors raised while reading or writing tracking files

use std::path::PathBuf;

/// Result type for tracking store operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors that can occur when working with tracking files
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("Failed to access tracking file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed tracking JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid tracking structure: {0}")]
    InvalidStructure(String),

    #[error("Failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrackingError {
    /// Short label used in diagnostics ("corrupted", "invalid structure", ...)
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::Missing(_) => "missing",
            TrackingError::Io(_) => "unreadable",
            TrackingError::Json(_) => "corrupted",
            TrackingError::InvalidStructure(_) => "invalid structure",
            TrackingError::Persist { .. } => "not replaced",
        }
    }
}
