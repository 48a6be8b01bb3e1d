//! Spawning the resolved task through its runner.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::detect::Runner;
use crate::error::Result;

impl Runner {
    /// The executable this runner is driven through.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
            Self::Task => "task",
        }
    }

    /// Canonical argv for invoking `task`, excluding extra user arguments.
    pub fn run_args(&self, task: &str) -> Vec<String> {
        match self {
            Self::Npm | Self::Yarn | Self::Pnpm | Self::Bun => {
                vec!["run".to_string(), task.to_string()]
            }
            Self::Task => vec![task.to_string()],
        }
    }

    /// Whether extra arguments need a `--` separator before them.
    fn needs_separator(&self) -> bool {
        matches!(self, Self::Npm | Self::Task)
    }
}

/// Build the full command for a task, rooted in the project directory.
pub fn command_for(root: &Path, runner: Runner, task: &str, extra_args: &[String]) -> Command {
    let mut cmd = Command::new(runner.program());
    cmd.args(runner.run_args(task));
    if !extra_args.is_empty() {
        if runner.needs_separator() {
            cmd.arg("--");
        }
        cmd.args(extra_args);
    }
    cmd.current_dir(root);
    cmd
}

/// Spawn the task with inherited stdio and wait for it. Returns the child's
/// exit code; death by signal maps to 128 + signal number.
pub fn run_task(root: &Path, runner: Runner, task: &str, extra_args: &[String]) -> Result<i32> {
    let mut cmd = command_for(root, runner, task, extra_args);
    info!(runner = %runner, task, "spawning task");
    let status = cmd.status()?;
    Ok(exit_code(&status))
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
