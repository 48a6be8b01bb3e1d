pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod runner;
pub mod tasks;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use cache::FsCache;
pub use error::{Result, TaskPickError};

use detect::{Detection, Runner};
use tasks::Task;

/// A discovered project: the root directory plus the cache every lookup
/// flows through. The cache is constructed by the caller and passed in, so
/// tests run isolated and multiple configurations can coexist.
#[derive(Debug)]
pub struct Project {
    cache: Arc<FsCache>,
    root: PathBuf,
}

impl Project {
    /// Walk up from `start` to the nearest directory carrying a recognized
    /// manifest or lockfile.
    pub fn discover(cache: Arc<FsCache>, start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let root = detect::find_project_root(&cache, start).ok_or_else(|| {
            TaskPickError::NoProjectFound {
                start: start.to_path_buf(),
            }
        })?;
        info!(root = %root.display(), "project discovered");
        Ok(Self { cache, root })
    }

    /// Use `root` directly without walking ancestors.
    pub fn at(cache: Arc<FsCache>, root: impl AsRef<Path>) -> Self {
        Self {
            cache,
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &FsCache {
        &self.cache
    }

    pub fn detections(&self) -> Vec<Detection> {
        detect::detect(&self.cache, &self.root)
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        tasks::all_tasks(&self.cache, &self.root)
    }

    /// Resolve `name` and run it, optionally forcing a runner. Returns the
    /// child's exit code.
    pub fn run(&self, name: &str, extra_args: &[String], forced: Option<Runner>) -> Result<i32> {
        let all = self.tasks()?;
        let task = tasks::resolve(&all, name)?;
        let runner = forced.unwrap_or(task.runner);
        runner::run_task(&self.root, runner, &task.name, extra_args)
    }
}
