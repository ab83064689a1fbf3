use indicatif::{ProgressBar, ProgressStyle};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Failure of one external command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command '{program}' not found. Please ensure it is installed and in your PATH.")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{program}' timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("Command '{program}' failed with exit code {code:?}\nStderr: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command '{program}' could not be waited on: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external CLIs under a fixed timeout
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    show_progress: bool,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            show_progress: false,
        }
    }

    /// Show a spinner while commands run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program args...` and return its stdout
    ///
    /// A non-zero exit or a timeout is an error; the child is killed when
    /// the timeout fires.
    pub async fn run(&self, program: &str, args: &[String]) -> Result<String, CommandError> {
        log::debug!("running: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let progress = self.show_progress.then(|| spinner(program, args));

        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CommandError::Io {
                    program: program.to_string(),
                    source,
                })
            }
            Err(_) => {
                log::debug!("{} timed out after {:?}", program, self.timeout);
                return Err(CommandError::TimedOut {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn spinner(program: &str, args: &[String]) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    let subcommand: Vec<&str> = args.iter().take(2).map(String::as_str).collect();
    pb.set_message(format!("Running {} {}...", program, subcommand.join(" ")));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
