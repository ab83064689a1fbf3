use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name, looked up at the git root
pub const CONFIG_FILE: &str = ".pr-daily-check.toml";

/// Project configuration
///
/// Every field has a default, so a missing or partial config file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrCheckConfig {
    /// GitHub repository (`owner/name`); `gh` infers it from the remote when unset
    #[serde(default)]
    pub repo: Option<String>,

    /// Branch PRs target and `my-branch.diff` is computed against
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Where diffs and metadata are written, relative to the git root
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// PR tracking file, relative to the git root
    #[serde(default = "default_pr_tracking_file")]
    pub pr_tracking_file: PathBuf,

    /// Branch tracking file, relative to the git root
    #[serde(default = "default_branch_tracking_file")]
    pub branch_tracking_file: PathBuf,

    /// Maximum PRs listed per kind
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,

    /// Ceiling for each `gh` invocation
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tmp/daily-pr-check")
}

fn default_pr_tracking_file() -> PathBuf {
    PathBuf::from(".cursor/docs/pr-impact-reports/pr-tracking.json")
}

fn default_branch_tracking_file() -> PathBuf {
    PathBuf::from(".cursor/docs/pr-impact-reports/branch-tracking.json")
}

fn default_list_limit() -> u32 {
    100
}

fn default_command_timeout_secs() -> u64 {
    120
}

impl Default for PrCheckConfig {
    fn default() -> Self {
        Self {
            repo: None,
            base_branch: default_base_branch(),
            output_dir: default_output_dir(),
            pr_tracking_file: default_pr_tracking_file(),
            branch_tracking_file: default_branch_tracking_file(),
            list_limit: default_list_limit(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl PrCheckConfig {
    /// Load config from `<git_root>/.pr-daily-check.toml`
    pub fn load(git_root: &Path) -> anyhow::Result<Self> {
        let config_path = git_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: PrCheckConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = PrCheckConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config, PrCheckConfig::default());
        assert_eq!(config.base_branch, "main");
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "repo = \"acme/widgets\"\nbase_branch = \"develop\"\n",
        )
        .unwrap();

        let config = PrCheckConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config.repo.as_deref(), Some("acme/widgets"));
        assert_eq!(config.base_branch, "develop");
        assert_eq!(config.list_limit, 100);
        assert_eq!(config.output_dir, PathBuf::from("tmp/daily-pr-check"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "list_limit = \"many\"").unwrap();

        let err = PrCheckConfig::load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
