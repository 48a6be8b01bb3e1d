mod cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskpick_core::config::UserConfig;

#[derive(Parser)]
#[command(name = "taskpick", about = "Locate and run project tasks without naming the runner")]
struct Cli {
    /// Output as JSON instead of human-readable tables
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: $XDG_CONFIG_HOME/taskpick/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks discovered in the project
    List(cmd::list::ListArgs),
    /// Resolve a task name and run it
    Run(cmd::run::RunArgs),
    /// Show which task runners were detected
    Detect(cmd::detect::DetectArgs),
    /// Run a discovery pass and print cache diagnostics
    Stats(cmd::stats::StatsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List(args) => cmd::list::run(args, &config, json),
        Commands::Run(args) => cmd::run::run(args, &config),
        Commands::Detect(args) => cmd::detect::run(args, &config, json),
        Commands::Stats(args) => cmd::stats::run(args, &config, json),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<UserConfig> {
    match path {
        Some(path) => Ok(UserConfig::load(path)?),
        None => match UserConfig::default_path() {
            Some(path) => Ok(UserConfig::load(&path)?),
            None => Ok(UserConfig::default()),
        },
    }
}
