//! Pull request listing types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of pull request to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrKind {
    /// Merged into the base branch today
    Merged,
    /// Open and ready for review
    Pending,
    /// Open drafts
    Draft,
}

impl PrKind {
    pub const ALL: [PrKind; 3] = [PrKind::Merged, PrKind::Pending, PrKind::Draft];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrKind::Merged => "merged",
            PrKind::Pending => "pending",
            PrKind::Draft => "draft",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PrKind::Merged => "Merged PRs (today)",
            PrKind::Pending => "Pending PRs (open, not draft)",
            PrKind::Draft => "Draft PRs",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "merged" => Some(PrKind::Merged),
            "pending" => Some(PrKind::Pending),
            "draft" => Some(PrKind::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for PrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors in a `--types` selector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid PR types: {0} (valid types: merged, pending, draft, all)")]
    Invalid(String),

    #[error("No PR types given (valid types: merged, pending, draft, all)")]
    Empty,
}

/// Parse a comma-separated selector such as `merged,pending` or `all`
///
/// Case-insensitive; duplicates are dropped, first occurrence wins.
pub fn parse_kinds(selector: &str) -> Result<Vec<PrKind>, SelectionError> {
    let requested: Vec<String> = selector
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if requested.is_empty() {
        return Err(SelectionError::Empty);
    }
    if requested.iter().any(|t| t == "all") {
        return Ok(PrKind::ALL.to_vec());
    }

    let invalid: Vec<&str> = requested
        .iter()
        .filter(|t| PrKind::parse(t).is_none())
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(SelectionError::Invalid(invalid.join(", ")));
    }

    let mut kinds = Vec::new();
    for kind in requested.iter().filter_map(|t| PrKind::parse(t)) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// A pull request as listed by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,

    #[serde(default)]
    pub title: String,

    /// Author login
    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub url: String,

    #[serde(rename = "mergedAt", default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<String>,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Which listing produced this PR
    pub state: PrKind,
}

impl PullRequest {
    pub fn new(number: u64, title: impl Into<String>, state: PrKind) -> Self {
        Self {
            number,
            title: title.into(),
            author: String::new(),
            url: String::new(),
            merged_at: None,
            created_at: None,
            state,
        }
    }
}
