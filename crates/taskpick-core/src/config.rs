use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::Runner;
use crate::error::Result;

/// User configuration, loaded once at startup. A missing file yields the
/// defaults; a malformed one is an error rather than a silent fallback.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Runner to prefer when a task could be driven by several.
    pub default_runner: Option<Runner>,
    /// Staleness bound for cached filesystem observations.
    pub cache_ttl_ms: u64,
    /// Entry-count ceiling across the file and directory stores.
    pub cache_max_entries: usize,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_runner: None,
            cache_ttl_ms: 5_000,
            cache_max_entries: 1_000,
        }
    }
}

impl UserConfig {
    /// Load from `path`; a missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// The conventional config location:
    /// `$XDG_CONFIG_HOME/taskpick/config.json`, falling back to
    /// `~/.config/taskpick/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map(|base| base.join("taskpick").join("config.json"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
