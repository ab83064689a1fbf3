pub mod check;
pub mod clean;
pub mod report;
pub mod status;

use crate::context::RunContext;
use crate::models::PrCheckConfig;
use crate::vcs::{GitRepository, LocalRepo};
use crate::Result;
use std::env;

/// Discover the repository around the working directory and build the run context
pub fn load_context(repo_override: Option<String>) -> Result<(GitRepository, RunContext)> {
    let cwd = env::current_dir()?;
    let git = GitRepository::discover(&cwd)?;

    let mut config = PrCheckConfig::load(git.root())?;
    if repo_override.is_some() {
        config.repo = repo_override;
    }

    let ctx = RunContext::new(git.root(), config);
    Ok((git, ctx))
}
