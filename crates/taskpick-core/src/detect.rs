//! Recognizing which task runners own a project directory.
//!
//! Detection is marker-file based and goes through the cache: one batch
//! existence check per directory, plus a `package.json` parse when the
//! `packageManager` field might settle the JS runner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::FsCache;
use crate::tasks::PackageJson;

/// Task runners taskpick knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runner {
    Npm,
    Yarn,
    Pnpm,
    Bun,
    /// go-task / Taskfile.yml
    Task,
}

impl std::fmt::Display for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::Yarn => write!(f, "yarn"),
            Self::Pnpm => write!(f, "pnpm"),
            Self::Bun => write!(f, "bun"),
            Self::Task => write!(f, "task"),
        }
    }
}

impl std::str::FromStr for Runner {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            "pnpm" => Ok(Self::Pnpm),
            "bun" => Ok(Self::Bun),
            "task" => Ok(Self::Task),
            other => Err(format!("unknown runner: {other}")),
        }
    }
}

/// One detected task source in a project directory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Detection {
    pub runner: Runner,
    /// The file tasks are read from.
    pub manifest: PathBuf,
    pub root: PathBuf,
}

const PACKAGE_MANIFEST: &str = "package.json";

/// Lockfiles in precedence order; the first present one names the JS runner.
const LOCKFILE_PRIORITY: &[(&str, Runner)] = &[
    ("pnpm-lock.yaml", Runner::Pnpm),
    ("yarn.lock", Runner::Yarn),
    ("bun.lockb", Runner::Bun),
    ("bun.lock", Runner::Bun),
    ("package-lock.json", Runner::Npm),
];

const TASKFILE_NAMES: &[&str] = &[
    "Taskfile.yml",
    "Taskfile.yaml",
    "taskfile.yml",
    "taskfile.yaml",
];

fn marker_names() -> Vec<&'static str> {
    let mut names = vec![PACKAGE_MANIFEST];
    names.extend(LOCKFILE_PRIORITY.iter().map(|(name, _)| *name));
    names.extend(TASKFILE_NAMES);
    names
}

/// Detect every task source in `dir`. A `package.json` and a Taskfile can
/// coexist; both are reported.
pub fn detect(cache: &FsCache, dir: &Path) -> Vec<Detection> {
    let present = cache.batch_exists(dir, &marker_names());

    let mut detections = Vec::new();
    if is_present(&present, PACKAGE_MANIFEST) {
        let manifest = dir.join(PACKAGE_MANIFEST);
        let runner = js_runner(cache, &manifest, &present);
        detections.push(Detection {
            runner,
            manifest,
            root: dir.to_path_buf(),
        });
    }
    if let Some(name) = TASKFILE_NAMES.iter().find(|n| is_present(&present, n)) {
        detections.push(Detection {
            runner: Runner::Task,
            manifest: dir.join(name),
            root: dir.to_path_buf(),
        });
    }
    debug!(dir = %dir.display(), count = detections.len(), "runner detection");
    detections
}

/// Walk up from `start` to the nearest directory carrying any marker file.
pub fn find_project_root(cache: &FsCache, start: &Path) -> Option<PathBuf> {
    let names = marker_names();
    for dir in start.ancestors() {
        let present = cache.batch_exists(dir, &names);
        if present.values().any(|p| *p) {
            return Some(dir.to_path_buf());
        }
    }
    None
}

fn is_present(present: &HashMap<String, bool>, name: &str) -> bool {
    present.get(name).copied().unwrap_or(false)
}

/// The `packageManager` field ("pnpm@9.1.0") wins over lockfiles; lockfiles
/// win over the npm fallback.
fn js_runner(cache: &FsCache, manifest: &Path, present: &HashMap<String, bool>) -> Runner {
    if let Ok(pkg) = cache.parse_file::<PackageJson>(manifest) {
        if let Some(pm) = pkg.package_manager.as_deref() {
            if let Some(name) = pm.split('@').next() {
                if let Ok(runner) = name.parse() {
                    return runner;
                }
            }
        }
    }
    for (lockfile, runner) in LOCKFILE_PRIORITY {
        if is_present(present, lockfile) {
            return *runner;
        }
    }
    Runner::Npm
}
