use std::path::PathBuf;

use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use taskpick_core::config::UserConfig;

#[derive(Args)]
pub struct ListArgs {
    /// Directory to search from (default: current directory)
    pub dir: Option<PathBuf>,
}

pub fn run(args: ListArgs, config: &UserConfig, json: bool) -> anyhow::Result<()> {
    let project = super::open_project(args.dir.as_deref(), config)?;
    let tasks = project.tasks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Task", "Runner", "Command"]);
        for task in &tasks {
            table.add_row(vec![
                task.name.clone(),
                task.runner.to_string(),
                task.summary.clone().unwrap_or_default(),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}
