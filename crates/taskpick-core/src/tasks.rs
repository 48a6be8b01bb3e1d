//! Task discovery: turning detected manifests into runnable task lists.

use std::collections::BTreeMap;
use std::path::Path;

use crate::cache::FsCache;
use crate::detect::{self, Detection, Runner};
use crate::error::{Result, TaskPickError};

/// A runnable task discovered in a project.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Task {
    pub name: String,
    pub runner: Runner,
    /// The script line or Taskfile description, when one exists.
    pub summary: Option<String>,
}

/// The slice of `package.json` this tool cares about.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct PackageJson {
    pub name: Option<String>,
    #[serde(rename = "packageManager")]
    pub package_manager: Option<String>,
    pub scripts: BTreeMap<String, String>,
}

/// The subset of a Taskfile needed to enumerate tasks.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Taskfile {
    pub version: Option<serde_yaml::Value>,
    pub tasks: BTreeMap<String, TaskfileTask>,
}

/// A Taskfile task: a bare command, a command list, or a detailed mapping.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum TaskfileTask {
    Command(String),
    Commands(Vec<String>),
    Detailed {
        #[serde(default)]
        desc: Option<String>,
        /// Entries may be plain strings or `{task: other}` references.
        #[serde(default)]
        cmds: Vec<serde_yaml::Value>,
    },
}

impl TaskfileTask {
    fn summary(&self) -> Option<String> {
        match self {
            Self::Command(cmd) => Some(cmd.clone()),
            Self::Commands(cmds) => cmds.first().cloned(),
            Self::Detailed { desc, cmds } => desc.clone().or_else(|| {
                cmds.first()
                    .and_then(|v| v.as_str().map(str::to_string))
            }),
        }
    }
}

/// Load the tasks one detection provides, through the parse cache.
pub fn load_tasks(cache: &FsCache, detection: &Detection) -> Result<Vec<Task>> {
    match detection.runner {
        Runner::Task => {
            let taskfile: Taskfile = cache.parse_file(&detection.manifest)?;
            Ok(taskfile
                .tasks
                .iter()
                .map(|(name, task)| Task {
                    name: name.clone(),
                    runner: Runner::Task,
                    summary: task.summary(),
                })
                .collect())
        }
        _ => {
            let pkg: PackageJson = cache.parse_file(&detection.manifest)?;
            Ok(pkg
                .scripts
                .iter()
                .map(|(name, cmd)| Task {
                    name: name.clone(),
                    runner: detection.runner,
                    summary: Some(cmd.clone()),
                })
                .collect())
        }
    }
}

/// Every task from every detection in `dir`.
pub fn all_tasks(cache: &FsCache, dir: &Path) -> Result<Vec<Task>> {
    let detections = detect::detect(cache, dir);
    if detections.is_empty() {
        return Err(TaskPickError::NoRunnerDetected {
            dir: dir.to_path_buf(),
        });
    }
    let mut tasks = Vec::new();
    for detection in &detections {
        tasks.extend(load_tasks(cache, detection)?);
    }
    Ok(tasks)
}

/// Resolve a typed name against the task list: exact match first, then a
/// unique prefix, then a unique substring. Multiple candidates at the same
/// tier is an error naming them.
pub fn resolve<'a>(tasks: &'a [Task], name: &str) -> Result<&'a Task> {
    if let Some(task) = tasks.iter().find(|t| t.name == name) {
        return Ok(task);
    }

    let prefixed: Vec<&Task> = tasks.iter().filter(|t| t.name.starts_with(name)).collect();
    match prefixed.as_slice() {
        [task] => return Ok(task),
        [] => {}
        many => {
            return Err(TaskPickError::AmbiguousTask {
                name: name.to_string(),
                candidates: many.iter().map(|t| t.name.clone()).collect(),
            })
        }
    }

    let containing: Vec<&Task> = tasks.iter().filter(|t| t.name.contains(name)).collect();
    match containing.as_slice() {
        [task] => Ok(task),
        [] => Err(TaskPickError::TaskNotFound {
            name: name.to_string(),
        }),
        many => Err(TaskPickError::AmbiguousTask {
            name: name.to_string(),
            candidates: many.iter().map(|t| t.name.clone()).collect(),
        }),
    }
}
