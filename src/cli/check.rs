use super::{load_context, report};
use crate::error::PreconditionError;
use crate::models::{parse_kinds, PrKind, SelectionError};
use crate::orchestrator::{branch_mode, pr_mode, BranchRunOptions, PrRunOptions};
use crate::vcs::{CommandRunner, GhCli};
use crate::Result;
use clap::{ArgGroup, Args};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["types", "branch"])))]
pub struct CheckArgs {
    /// Folder to focus on (e.g. "backend", "." for everything)
    pub folder: String,

    /// Comma-separated PR types: merged,pending,draft,all
    #[arg(long)]
    pub types: Option<String>,

    /// Compare against a branch instead of PRs
    #[arg(long)]
    pub branch: Option<String>,

    /// Re-analyze even when nothing changed since the last check
    #[arg(long)]
    pub force: bool,

    /// GitHub repository (owner/name), overrides the config file
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Mode {
    PullRequests(Vec<PrKind>),
    Branch(String),
}

impl CheckArgs {
    fn mode(&self) -> Result<Mode, PreconditionError> {
        match (&self.branch, &self.types) {
            (Some(branch), _) => Ok(Mode::Branch(branch.clone())),
            (None, Some(types)) => Ok(Mode::PullRequests(parse_kinds(types)?)),
            (None, None) => Err(SelectionError::Empty.into()),
        }
    }
}

pub async fn run(args: CheckArgs) -> Result<()> {
    // Reject a bad selector before looking at the repository
    let mode = args.mode()?;
    let (git, ctx) = load_context(args.repo.clone())?;

    match mode {
        Mode::PullRequests(kinds) => {
            let opts = PrRunOptions {
                folder: args.folder,
                kinds,
                force: args.force,
            };
            report::pr_header(&ctx, &opts);

            let runner = CommandRunner::new(ctx.config.command_timeout());
            let host = GhCli::new(runner, ctx.config.base_branch.clone(), ctx.config.list_limit)
                .with_repo(ctx.config.repo.clone());

            let outcome = pr_mode::run(&ctx, &host, &git, &opts).await?;
            report::pr_outcome(&ctx, &opts, &outcome);
        }
        Mode::Branch(target_branch) => {
            let opts = BranchRunOptions {
                folder: args.folder,
                target_branch,
                force: args.force,
            };
            report::branch_header(&ctx, &opts);

            let outcome = branch_mode::run(&ctx, &git, &opts)?;
            report::branch_outcome(&ctx, &opts, &outcome);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrKind;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        check: CheckArgs,
    }

    fn parse(args: &[&str]) -> Result<CheckArgs, clap::Error> {
        let argv = std::iter::once("check").chain(args.iter().copied());
        TestCli::try_parse_from(argv).map(|cli| cli.check)
    }

    #[test]
    fn test_types_mode() {
        let args = parse(&["backend", "--types", "merged,draft", "--force"]).unwrap();

        assert!(args.force);
        assert_eq!(
            args.mode().unwrap(),
            Mode::PullRequests(vec![PrKind::Merged, PrKind::Draft])
        );
    }

    #[test]
    fn test_branch_mode() {
        let args = parse(&[".", "--branch", "develop"]).unwrap();

        assert_eq!(args.mode().unwrap(), Mode::Branch("develop".to_string()));
    }

    #[test]
    fn test_modes_are_exclusive_and_required() {
        assert!(parse(&["backend", "--types", "all", "--branch", "develop"]).is_err());
        assert!(parse(&["backend"]).is_err());
        assert!(parse(&["--types", "all"]).is_err());
    }

    #[test]
    fn test_invalid_selector_is_precondition_error() {
        let args = parse(&["backend", "--types", "merged,stale"]).unwrap();

        match args.mode() {
            Err(PreconditionError::InvalidSelection(SelectionError::Invalid(bad))) => {
                assert_eq!(bad, "stale")
            }
            other => panic!("expected invalid selection, got {:?}", other),
        }
    }

    #[test]
    fn test_no_mode_selects_nothing() {
        let args = CheckArgs {
            folder: "backend".to_string(),
            types: None,
            branch: None,
            force: false,
            repo: None,
        };

        assert!(matches!(
            args.mode(),
            Err(PreconditionError::InvalidSelection(SelectionError::Empty))
        ));
    }
}
