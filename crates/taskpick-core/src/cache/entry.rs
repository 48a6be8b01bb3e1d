use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// A filesystem failure in cacheable form.
///
/// `std::io::Error` is not `Clone`, but negative results must be stored and
/// handed back on every hit within the TTL window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CacheError {
    pub kind: io::ErrorKind,
    pub message: String,
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        self.kind == io::ErrorKind::NotFound
    }
}

impl From<&io::Error> for CacheError {
    fn from(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Metadata captured from a successful stat.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileMeta {
    pub name: String,
    pub len: u64,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

impl FileMeta {
    pub(crate) fn capture(path: &Path, meta: &std::fs::Metadata) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            len: meta.len(),
            is_dir: meta.is_dir(),
            modified: meta.modified().ok(),
        }
    }
}

/// Format-tagged decoded tree, shared between calls via `Arc`.
///
/// Callers never receive this directly; `parse_file` deserializes a
/// structural clone into the destination type.
#[derive(Debug, Clone)]
pub enum ParsedValue {
    Json(Arc<serde_json::Value>),
    Yaml(Arc<serde_yaml::Value>),
}

/// Everything known about one path that names a regular file.
///
/// `content` is populated only once a read has been requested; a stat alone
/// leaves it empty. `parsed` implies `content`, and both imply the metadata
/// was captured in the same observation.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub meta: Option<FileMeta>,
    pub content: Option<Arc<[u8]>>,
    pub parsed: Option<ParsedValue>,
    pub error: Option<CacheError>,
    pub fetched_at: Instant,
}

impl CachedFile {
    pub(crate) fn from_stat(path: &Path, probed: &io::Result<std::fs::Metadata>) -> Self {
        let (meta, error) = match probed {
            Ok(m) => (Some(FileMeta::capture(path, m)), None),
            Err(e) => (None, Some(CacheError::from(e))),
        };
        Self {
            meta,
            content: None,
            parsed: None,
            error,
            fetched_at: Instant::now(),
        }
    }

    pub(crate) fn failed(err: &io::Error) -> Self {
        Self {
            meta: None,
            content: None,
            parsed: None,
            error: Some(CacheError::from(err)),
            fetched_at: Instant::now(),
        }
    }

    pub(crate) fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// One directory entry as observed during a listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// One directory's listing plus a membership set for O(1) name lookups.
///
/// Both views are built in a single pass and installed together; the
/// membership set is never visible half-populated.
#[derive(Debug, Clone)]
pub struct CachedDir {
    pub entries: Arc<Vec<DirEntry>>,
    pub membership: Arc<HashSet<String>>,
    pub error: Option<CacheError>,
    pub fetched_at: Instant,
}

impl CachedDir {
    pub(crate) fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}
