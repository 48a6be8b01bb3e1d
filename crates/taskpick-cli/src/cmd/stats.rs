use std::path::PathBuf;

use clap::Args;
use taskpick_core::config::UserConfig;

#[derive(Args)]
pub struct StatsArgs {
    /// Directory to search from (default: current directory)
    pub dir: Option<PathBuf>,
}

/// Runs a full discovery pass, then reports what the cache retained.
pub fn run(args: StatsArgs, config: &UserConfig, json: bool) -> anyhow::Result<()> {
    let project = super::open_project(args.dir.as_deref(), config)?;
    let detections = project.detections();
    // Task loading may fail on a malformed manifest; occupancy is still
    // worth reporting in that case.
    let task_count = project.tasks().map(|t| t.len()).unwrap_or(0);
    let stats = project.cache().stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Project root:    {}", project.root().display());
        println!("  Detections:    {}", detections.len());
        println!("  Tasks:         {task_count}");
        println!("  File entries:  {}", stats.file_entries);
        println!("  Dir entries:   {}", stats.dir_entries);
        println!("  LRU entries:   {}", stats.lru_entries);
        println!("  TTL:           {} ms", stats.ttl_ms);
        println!("  Max entries:   {}", stats.max_size);
    }
    Ok(())
}
