use std::path::PathBuf;

use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use taskpick_core::config::UserConfig;

#[derive(Args)]
pub struct DetectArgs {
    /// Directory to search from (default: current directory)
    pub dir: Option<PathBuf>,
}

pub fn run(args: DetectArgs, config: &UserConfig, json: bool) -> anyhow::Result<()> {
    let project = super::open_project(args.dir.as_deref(), config)?;
    let detections = project.detections();

    if json {
        println!("{}", serde_json::to_string_pretty(&detections)?);
    } else {
        println!("Project root: {}", project.root().display());
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Runner", "Manifest"]);
        for detection in &detections {
            table.add_row(vec![
                detection.runner.to_string(),
                detection.manifest.display().to_string(),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}
