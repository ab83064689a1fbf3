use super::load_context;
use crate::output::OutputDir;
use crate::Result;
use colored::Colorize;

/// Remove the output directory and everything in it
pub fn run() -> Result<()> {
    let (_git, ctx) = load_context(None)?;
    let out = OutputDir::new(ctx.output_dir());

    println!("{}", "Cleaning up temporary files...".cyan());
    if out.clean()? {
        println!(
            "{}",
            format!("✓ Cleaned up temporary files: {}/", out.path().display()).green()
        );
    } else {
        println!(
            "✓ No temporary files to clean (directory doesn't exist: {}/)",
            out.path().display()
        );
    }

    Ok(())
}
