//! Output directory: diffs and metadata handed to the analysis step

use crate::models::PullRequest;
use crate::state::ChangeReason;
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PR_LIST_FILE: &str = "pr-list.json";
pub const BRANCH_INFO_FILE: &str = "branch-info.json";
pub const MY_BRANCH_DIFF: &str = "my-branch.diff";
pub const TARGET_BRANCH_DIFF: &str = "target-branch.diff";

/// True when `folder` selects the whole repository
pub fn is_whole_repo(folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    folder.is_empty() || folder == "."
}

/// Human label for a folder scope
pub fn folder_scope(folder: &str) -> &str {
    if is_whole_repo(folder) {
        "All folders"
    } else {
        folder
    }
}

/// Keep only the file sections of a unified diff that touch `folder`
///
/// A section starts at a `diff --git` header and is kept when the header
/// contains `/<folder>/` or ends with `/<folder>`.
pub fn filter_diff_to_folder(diff: &str, folder: &str) -> String {
    if is_whole_repo(folder) {
        return diff.to_string();
    }
    let folder = folder.trim_matches('/');
    let inner = format!("/{}/", folder);
    let tail = format!("/{}", folder);

    let mut include = false;
    let mut kept: Vec<&str> = Vec::new();
    for line in diff.split('\n') {
        if line.starts_with("diff --git") {
            include = line.contains(&inner) || line.ends_with(&tail);
        }
        if include {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Count added and removed lines, ignoring the `+++`/`---` file headers
pub fn count_changed_lines(diff: &str) -> usize {
    diff.lines()
        .filter(|l| !l.starts_with("+++") && !l.starts_with("---"))
        .filter(|l| l.starts_with('+') || l.starts_with('-'))
        .count()
}

/// One PR row of `pr-list.json`
#[derive(Debug, Clone, Serialize)]
pub struct PrListEntry {
    #[serde(flatten)]
    pub pull_request: PullRequest,
    pub sha: String,
    pub change_reason: ChangeReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}

#[derive(Debug, Serialize)]
struct PrListReport<'a> {
    generated_at: String,
    total_analyzed: usize,
    total_skipped: usize,
    analyzed_prs: &'a [PrListEntry],
    skipped_prs: &'a [PrListEntry],
}

#[derive(Debug, Serialize)]
struct EmptyPrList {
    generated_at: String,
    total_prs: usize,
    prs: Vec<PrListEntry>,
}

/// Content of `branch-info.json`
#[derive(Debug, Clone, Serialize)]
pub struct BranchInfo {
    pub mode: &'static str,
    pub generated_at: String,
    pub target_branch: String,
    pub current_branch: String,
    pub target_sha: String,
    pub current_sha: String,
    pub merge_base_sha: String,
    pub folder_analyzed: String,
}

impl BranchInfo {
    pub fn new(
        target_branch: &str,
        current_branch: &str,
        target_sha: &str,
        current_sha: &str,
        merge_base_sha: &str,
        folder: &str,
    ) -> Self {
        Self {
            mode: "branch",
            generated_at: generated_at(),
            target_branch: target_branch.to_string(),
            current_branch: current_branch.to_string(),
            target_sha: target_sha.to_string(),
            current_sha: current_sha.to_string(),
            merge_base_sha: merge_base_sha.to_string(),
            folder_analyzed: folder.to_string(),
        }
    }
}

fn generated_at() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Writer for the output directory
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create output directory {}", self.root.display())
        })
    }

    /// Write `pr-<n>.diff`; blank diffs are not written
    pub fn write_pr_diff(&self, number: u64, diff: &str) -> Result<Option<PathBuf>> {
        if diff.trim().is_empty() {
            return Ok(None);
        }
        self.write(&format!("pr-{}.diff", number), diff).map(Some)
    }

    pub fn write_my_branch_diff(&self, diff: &str) -> Result<PathBuf> {
        self.write(MY_BRANCH_DIFF, diff)
    }

    pub fn write_target_branch_diff(&self, diff: &str) -> Result<PathBuf> {
        self.write(TARGET_BRANCH_DIFF, diff)
    }

    pub fn write_pr_list(&self, analyzed: &[PrListEntry], skipped: &[PrListEntry]) -> Result<PathBuf> {
        let report = PrListReport {
            generated_at: generated_at(),
            total_analyzed: analyzed.len(),
            total_skipped: skipped.len(),
            analyzed_prs: analyzed,
            skipped_prs: skipped,
        };
        self.write_json(PR_LIST_FILE, &report)
    }

    /// `pr-list.json` for a run that found no PRs
    pub fn write_empty_pr_list(&self) -> Result<PathBuf> {
        let report = EmptyPrList {
            generated_at: generated_at(),
            total_prs: 0,
            prs: Vec::new(),
        };
        self.write_json(PR_LIST_FILE, &report)
    }

    pub fn write_branch_info(&self, info: &BranchInfo) -> Result<PathBuf> {
        self.write_json(BRANCH_INFO_FILE, info)
    }

    /// Remove the whole directory; returns false when it did not exist
    pub fn clean(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("Failed to remove {}", self.root.display()))?;
        Ok(true)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(value)?;
        self.write(name, &content)
    }

    fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrKind;
    use tempfile::TempDir;

    const TWO_FILES: &str = "diff --git a/api/src/lib.rs b/api/src/lib.rs\n\
--- a/api/src/lib.rs\n\
+++ b/api/src/lib.rs\n\
@@ -1 +1 @@\n\
-old\n\
+new\n\
diff --git a/web/app.js b/web/app.js\n\
--- a/web/app.js\n\
+++ b/web/app.js\n\
@@ -1 +1,2 @@\n\
 keep\n\
+added";

    #[test]
    fn test_filter_keeps_matching_sections() {
        let filtered = filter_diff_to_folder(TWO_FILES, "api");

        assert!(filtered.starts_with("diff --git a/api/src/lib.rs"));
        assert!(filtered.contains("+new"));
        assert!(!filtered.contains("web/app.js"));
    }

    #[test]
    fn test_filter_matches_header_ending_in_folder() {
        let diff = "diff --git a/docs b/docs\n+x\ndiff --git a/other b/other\n+y";

        assert_eq!(filter_diff_to_folder(diff, "docs"), "diff --git a/docs b/docs\n+x");
    }

    #[test]
    fn test_filter_whole_repo_is_identity() {
        assert_eq!(filter_diff_to_folder(TWO_FILES, "."), TWO_FILES);
        assert_eq!(filter_diff_to_folder(TWO_FILES, ""), TWO_FILES);
        assert!(filter_diff_to_folder(TWO_FILES, "mobile").is_empty());
    }

    #[test]
    fn test_count_changed_lines_skips_headers() {
        assert_eq!(count_changed_lines(TWO_FILES), 3);
        assert_eq!(count_changed_lines(""), 0);
    }

    #[test]
    fn test_blank_pr_diff_is_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let out = OutputDir::new(temp_dir.path().join("out"));
        out.ensure().unwrap();

        assert!(out.write_pr_diff(5, "  \n").unwrap().is_none());
        let path = out.write_pr_diff(6, TWO_FILES).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "pr-6.diff");
    }

    #[test]
    fn test_pr_list_shape() {
        let temp_dir = TempDir::new().unwrap();
        let out = OutputDir::new(temp_dir.path());
        let mut pr = PullRequest::new(12, "Add cache", PrKind::Merged);
        pr.author = "octo".to_string();
        let analyzed = vec![PrListEntry {
            pull_request: pr,
            sha: "abc".to_string(),
            change_reason: ChangeReason::New,
            last_checked: None,
        }];
        let skipped = vec![PrListEntry {
            pull_request: PullRequest::new(13, "Docs", PrKind::Draft),
            sha: "def".to_string(),
            change_reason: ChangeReason::Unchanged,
            last_checked: Some("2024-01-01".to_string()),
        }];

        let path = out.write_pr_list(&analyzed, &skipped).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(json["total_analyzed"], 1);
        assert_eq!(json["total_skipped"], 1);
        assert_eq!(json["analyzed_prs"][0]["number"], 12);
        assert_eq!(json["analyzed_prs"][0]["author"], "octo");
        assert_eq!(json["analyzed_prs"][0]["state"], "merged");
        assert_eq!(json["analyzed_prs"][0]["change_reason"], "new");
        assert!(json["analyzed_prs"][0].get("last_checked").is_none());
        assert_eq!(json["skipped_prs"][0]["last_checked"], "2024-01-01");
        assert!(json["generated_at"].is_string());
    }

    #[test]
    fn test_empty_pr_list_shape() {
        let temp_dir = TempDir::new().unwrap();
        let out = OutputDir::new(temp_dir.path());

        let path = out.write_empty_pr_list().unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(json["total_prs"], 0);
        assert_eq!(json["prs"], serde_json::json!([]));
    }

    #[test]
    fn test_clean_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out = OutputDir::new(temp_dir.path().join("tmp/daily-pr-check"));

        assert!(!out.clean().unwrap());
        out.ensure().unwrap();
        out.write_my_branch_diff("+x\n").unwrap();
        assert!(out.clean().unwrap());
        assert!(!out.path().exists());
    }
}
