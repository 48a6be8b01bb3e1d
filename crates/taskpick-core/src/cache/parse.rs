//! Decoding cached file content into caller types.
//!
//! The decoder is chosen purely by file extension. The cache keeps a
//! format-tagged intermediate tree per path; every call deserializes a
//! structural clone of that tree, so no caller ever holds a reference into
//! cache-owned data and mutating one result cannot corrupt another.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::trace;

use super::entry::ParsedValue;
use super::FsCache;
use crate::error::{Result, TaskPickError};

/// Config formats the parse layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Selects the decoder from the extension alone. Anything but
    /// `.json`/`.yaml`/`.yml` is a configuration error.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl FsCache {
    /// Parse a JSON or YAML file into `T`, reusing the cached decoded tree
    /// when it is still fresh. Decode failures surface immediately and are
    /// never cached; the raw content stays cached either way.
    pub fn parse_file<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            TaskPickError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
        })?;

        {
            let files = self.files.read().unwrap();
            if let Some(entry) = files.get(path) {
                if entry.is_fresh(self.ttl) {
                    if let Some(parsed) = &entry.parsed {
                        let out = materialize::<T>(parsed)?;
                        self.lru.lock().unwrap().touch(path);
                        trace!(path = %path.display(), "parse hit");
                        return Ok(out);
                    }
                }
            }
        }

        let content = self.read_file(path)?;
        let parsed = decode(format, &content)?;
        let out = materialize::<T>(&parsed)?;

        // Attach the decoded tree to the live entry. If the entry was evicted
        // or replaced since the read, skip caching rather than resurrect it.
        let mut files = self.files.write().unwrap();
        if let Some(entry) = files.get_mut(path) {
            if entry.content.is_some() {
                entry.parsed = Some(parsed);
            }
        }
        Ok(out)
    }
}

fn decode(format: ConfigFormat, bytes: &[u8]) -> Result<ParsedValue> {
    match format {
        ConfigFormat::Json => Ok(ParsedValue::Json(Arc::new(serde_json::from_slice(bytes)?))),
        ConfigFormat::Yaml => Ok(ParsedValue::Yaml(Arc::new(serde_yaml::from_slice(bytes)?))),
    }
}

/// Deserialize an independent `T` from a structural clone of the cached tree.
fn materialize<T: DeserializeOwned>(parsed: &ParsedValue) -> Result<T> {
    match parsed {
        ParsedValue::Json(tree) => Ok(serde_json::from_value(serde_json::Value::clone(tree))?),
        ParsedValue::Yaml(tree) => Ok(serde_yaml::from_value(serde_yaml::Value::clone(tree))?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
    use std::collections::BTreeMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cache() -> FsCache {
        FsCache::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }

    #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
    struct Sample {
        name: String,
        values: Vec<i64>,
    }

    #[test]
    fn parses_json_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, r#"{"name": "build", "values": [1, 2, 3]}"#).unwrap();

        let cache = cache();
        let sample: Sample = cache.parse_file(&path).unwrap();
        assert_eq!(sample.name, "build");
        assert_eq!(sample.values, vec![1, 2, 3]);
    }

    #[test]
    fn parses_yaml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.yml");
        fs::write(&path, "name: deploy\nvalues: [4, 5]\n").unwrap();

        let cache = cache();
        let sample: Sample = cache.parse_file(&path).unwrap();
        assert_eq!(sample.name, "deploy");
        assert_eq!(sample.values, vec![4, 5]);
    }

    #[test]
    fn unknown_extension_fails_without_caching() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.toml");
        fs::write(&path, "name = \"x\"").unwrap();

        let cache = cache();
        let err = cache.parse_file::<Sample>(&path).unwrap_err();
        assert!(matches!(err, TaskPickError::UnsupportedFormat { .. }));
        assert_eq!(cache.stats().file_entries, 0);
    }

    #[test]
    fn malformed_content_surfaces_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let cache = cache();
        let err = cache.parse_file::<Sample>(&path).unwrap_err();
        assert!(matches!(err, TaskPickError::Json(_)));
        // Content is cached; the decode failure is not.
        assert_eq!(cache.stats().file_entries, 1);
    }

    #[test]
    fn deep_copy_isolates_callers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.json");
        fs::write(&path, r#"{"name": "x", "values": [1]}"#).unwrap();

        let cache = cache();
        let mut first: serde_json::Value = cache.parse_file(&path).unwrap();
        let second: serde_json::Value = cache.parse_file(&path).unwrap();

        first["name"] = serde_json::json!("mutated");
        first["values"][0] = serde_json::json!(99);

        assert_eq!(second["name"], "x");
        assert_eq!(second["values"][0], 1);

        // A later parse is also unaffected by the mutation.
        let third: serde_json::Value = cache.parse_file(&path).unwrap();
        assert_eq!(third["name"], "x");
    }

    #[test]
    fn reparse_within_ttl_serves_cached_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stable.json");
        fs::write(&path, r#"{"name": "a", "values": []}"#).unwrap();

        let cache = cache();
        let _: Sample = cache.parse_file(&path).unwrap();
        // Disk changes are invisible while the parsed tree is fresh.
        fs::write(&path, r#"{"name": "b", "values": []}"#).unwrap();
        let again: Sample = cache.parse_file(&path).unwrap();
        assert_eq!(again.name, "a");
    }

    #[test]
    fn expired_parse_redecodes_fresh_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rolling.json");
        fs::write(&path, r#"{"name": "old", "values": []}"#).unwrap();

        let ttl = Duration::from_millis(50);
        let cache = FsCache::new(ttl, DEFAULT_MAX_ENTRIES);
        let _: Sample = cache.parse_file(&path).unwrap();

        fs::write(&path, r#"{"name": "new", "values": []}"#).unwrap();
        std::thread::sleep(ttl + Duration::from_millis(20));
        let sample: Sample = cache.parse_file(&path).unwrap();
        assert_eq!(sample.name, "new");
    }

    #[test]
    fn yaml_maps_deserialize_into_btreemap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.yaml");
        fs::write(&path, "build: cargo build\ntest: cargo test\n").unwrap();

        let cache = cache();
        let map: BTreeMap<String, String> = cache.parse_file(&path).unwrap();
        assert_eq!(map["build"], "cargo build");
        assert_eq!(map.len(), 2);
    }
}
