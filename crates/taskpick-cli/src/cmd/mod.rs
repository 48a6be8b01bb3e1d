pub mod detect;
pub mod list;
pub mod run;
pub mod stats;

use std::path::Path;
use std::sync::Arc;

use taskpick_core::config::UserConfig;
use taskpick_core::{FsCache, Project};

/// Build the per-invocation cache from config and discover the project.
pub(crate) fn open_project(dir: Option<&Path>, config: &UserConfig) -> anyhow::Result<Project> {
    let cache = Arc::new(FsCache::new(config.cache_ttl(), config.cache_max_entries));
    let start = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    Ok(Project::discover(cache, start)?)
}
