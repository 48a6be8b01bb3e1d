use std::path::PathBuf;

use clap::Args;
use taskpick_core::config::UserConfig;
use taskpick_core::detect::Runner;

#[derive(Args)]
pub struct RunArgs {
    /// Task name: exact, unique prefix, or unique substring
    pub name: String,

    /// Directory to search from (default: current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Force a runner: npm, yarn, pnpm, bun, task
    #[arg(long)]
    pub runner: Option<String>,

    /// Extra arguments passed through to the task
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub fn run(args: RunArgs, config: &UserConfig) -> anyhow::Result<()> {
    let project = super::open_project(args.dir.as_deref(), config)?;

    let forced: Option<Runner> = match args.runner.as_deref() {
        Some(name) => Some(name.parse().map_err(|e: String| anyhow::anyhow!(e))?),
        None => config.default_runner,
    };

    let code = project.run(&args.name, &args.args, forced)?;
    std::process::exit(code);
}
