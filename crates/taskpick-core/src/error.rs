use std::path::PathBuf;

/// All errors produced by taskpick-core.
#[derive(Debug, thiserror::Error)]
pub enum TaskPickError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error("unsupported config format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("no project found starting from {}", start.display())]
    NoProjectFound { start: PathBuf },

    #[error("no task runner detected in {}", dir.display())]
    NoRunnerDetected { dir: PathBuf },

    #[error("no task named {name:?}")]
    TaskNotFound { name: String },

    #[error("task name {name:?} is ambiguous: {}", candidates.join(", "))]
    AmbiguousTask { name: String, candidates: Vec<String> },
}

pub type Result<T> = std::result::Result<T, TaskPickError>;
