use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use env_logger::Env;
use pr_daily_check::cli::check::CheckArgs;
use pr_daily_check::Result;
use std::io;

#[derive(Parser)]
#[command(name = "pr-daily-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect PR and branch diffs for daily conflict analysis", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch diffs for changed PRs, or compare against a branch
    Check(CheckArgs),

    /// Show PR and branch tracking data
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Delete the output directory
    Clean,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: Failed to create tokio runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check(args) => {
            pr_daily_check::cli::check::run(args).await?;
        }
        Commands::Status { json } => {
            pr_daily_check::cli::status::run(json).await?;
        }
        Commands::Clean => {
            pr_daily_check::cli::clean::run()?;
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pr-daily-check", &mut io::stdout());
        }
    }

    Ok(())
}
