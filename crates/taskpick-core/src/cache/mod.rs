//! Bounded, TTL-based, concurrency-safe cache over the real filesystem.
//!
//! Memoizes stat results, directory listings, raw file content, and parsed
//! JSON/YAML for the duration of one invocation. Entries older than the TTL
//! are treated as misses on next access; total occupancy is bounded by
//! evicting the globally least-recently-touched keys across both stores.
//!
//! The file store, directory store, and LRU index each sit behind their own
//! lock so readers of files and readers of directories never block one
//! another. Lock acquisition order when nesting: files, then dirs, then lru.

mod entry;
mod lru;
mod parse;

pub use entry::{CacheError, DirEntry, FileMeta};
pub use parse::ConfigFormat;

use entry::{CachedDir, CachedFile};

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use lru::LruIndex;

/// Default staleness bound for cached entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);
/// Default entry-count ceiling across both stores.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Eviction batch floor: at least this many keys go per eviction pass.
const EVICT_BATCH_MIN: usize = 10;

/// Snapshot of cache occupancy and configuration. Diagnostics only.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub file_entries: usize,
    pub dir_entries: usize,
    pub lru_entries: usize,
    pub ttl_ms: u64,
    pub max_size: usize,
}

/// Existence probe result for one name in a directory batch.
#[derive(Debug, Clone)]
pub struct NameProbe {
    pub exists: bool,
    pub content: Option<Arc<[u8]>>,
    pub error: Option<CacheError>,
}

/// The cache facade. Construct one per invocation and pass it down
/// explicitly; there is no process-wide instance.
#[derive(Debug)]
pub struct FsCache {
    files: RwLock<HashMap<PathBuf, CachedFile>>,
    dirs: RwLock<HashMap<PathBuf, CachedDir>>,
    lru: Mutex<LruIndex>,
    ttl: Duration,
    max_size: usize,
}

impl FsCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            dirs: RwLock::new(HashMap::new()),
            lru: Mutex::new(LruIndex::new()),
            ttl,
            max_size,
        }
    }

    /// Stat a path, serving from cache within the TTL window. Failed stats
    /// are cached as negative results, so repeated probes of a missing path
    /// cost one syscall per TTL window.
    pub fn stat(&self, path: impl AsRef<Path>) -> Result<FileMeta, CacheError> {
        let path = path.as_ref();
        {
            let files = self.files.read().unwrap();
            if let Some(entry) = files.get(path) {
                if entry.is_fresh(self.ttl) {
                    if let Some(meta) = &entry.meta {
                        let meta = meta.clone();
                        self.lru.lock().unwrap().touch(path);
                        trace!(path = %path.display(), "stat hit");
                        return Ok(meta);
                    }
                    if let Some(err) = &entry.error {
                        let err = err.clone();
                        self.lru.lock().unwrap().touch(path);
                        trace!(path = %path.display(), "stat hit (negative)");
                        return Err(err);
                    }
                    // Content without metadata: the re-stat that should have
                    // accompanied the read failed. Re-probe below.
                }
            }
        }

        let probed = std::fs::metadata(path);
        trace!(path = %path.display(), ok = probed.is_ok(), "stat miss");
        let result = match &probed {
            Ok(meta) => Ok(FileMeta::capture(path, meta)),
            Err(err) => Err(CacheError::from(err)),
        };
        self.install_file(path, CachedFile::from_stat(path, &probed));
        result
    }

    /// Whether the path exists, per the (possibly cached) stat result.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.stat(path).is_ok()
    }

    /// Read a file's content, serving from cache only when content was
    /// actually captured before — a stat-only entry does not satisfy a read.
    /// A miss re-stats alongside the read so metadata and content describe
    /// the same observation.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Arc<[u8]>, CacheError> {
        let path = path.as_ref();
        {
            let files = self.files.read().unwrap();
            if let Some(entry) = files.get(path) {
                if entry.is_fresh(self.ttl) {
                    if let Some(content) = &entry.content {
                        let content = Arc::clone(content);
                        self.lru.lock().unwrap().touch(path);
                        trace!(path = %path.display(), "read hit");
                        return Ok(content);
                    }
                }
            }
        }

        let (entry, result) = match std::fs::read(path) {
            Ok(bytes) => {
                let meta = std::fs::metadata(path)
                    .ok()
                    .map(|m| FileMeta::capture(path, &m));
                let content: Arc<[u8]> = Arc::from(bytes);
                let entry = CachedFile {
                    meta,
                    content: Some(Arc::clone(&content)),
                    parsed: None,
                    error: None,
                    fetched_at: Instant::now(),
                };
                (entry, Ok(content))
            }
            Err(err) => {
                let cached = CacheError::from(&err);
                (CachedFile::failed(&err), Err(cached))
            }
        };
        trace!(path = %path.display(), ok = result.is_ok(), "read miss");
        self.install_file(path, entry);
        result
    }

    /// List a directory, serving from cache within the TTL window. The
    /// ordered entry list and the membership set are built in one pass and
    /// installed together.
    pub fn list_dir(&self, path: impl AsRef<Path>) -> Result<Arc<Vec<DirEntry>>, CacheError> {
        let entry = self.fetch_dir(path.as_ref());
        match entry.error {
            None => Ok(entry.entries),
            Some(err) => Err(err),
        }
    }

    /// Check several names against one directory listing. Never issues one
    /// stat per name; if the listing itself failed, every name maps to false.
    pub fn batch_exists<S: AsRef<str>>(
        &self,
        dir: impl AsRef<Path>,
        names: &[S],
    ) -> HashMap<String, bool> {
        let entry = self.fetch_dir(dir.as_ref());
        let membership = entry.error.is_none().then_some(&entry.membership);
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let exists = membership.is_some_and(|m| m.contains(name));
                (name.to_string(), exists)
            })
            .collect()
    }

    /// As [`batch_exists`](Self::batch_exists), but names that exist also get
    /// their content through the file store, so repeated probes stay cheap.
    pub fn batch_exists_with_content<S: AsRef<str>>(
        &self,
        dir: impl AsRef<Path>,
        names: &[S],
    ) -> HashMap<String, NameProbe> {
        let dir = dir.as_ref();
        let entry = self.fetch_dir(dir);
        let membership = entry.error.is_none().then_some(&entry.membership);
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let probe = if membership.is_some_and(|m| m.contains(name)) {
                    match self.read_file(dir.join(name)) {
                        Ok(content) => NameProbe {
                            exists: true,
                            content: Some(content),
                            error: None,
                        },
                        Err(err) => NameProbe {
                            exists: true,
                            content: None,
                            error: Some(err),
                        },
                    }
                } else {
                    NameProbe {
                        exists: false,
                        content: None,
                        error: None,
                    }
                };
                (name.to_string(), probe)
            })
            .collect()
    }

    /// Remove entries older than the TTL from both stores and the LRU index.
    /// Expired entries are otherwise only lazily treated as misses.
    pub fn clear_expired(&self) {
        let mut files = self.files.write().unwrap();
        let mut dirs = self.dirs.write().unwrap();
        let mut lru = self.lru.lock().unwrap();
        let before = files.len() + dirs.len();
        files.retain(|key, entry| {
            let fresh = entry.is_fresh(self.ttl);
            if !fresh {
                lru.remove(key);
            }
            fresh
        });
        dirs.retain(|key, entry| {
            let fresh = entry.is_fresh(self.ttl);
            if !fresh {
                lru.remove(key);
            }
            fresh
        });
        debug!(
            removed = before - (files.len() + dirs.len()),
            "expired entries swept"
        );
    }

    /// Drop everything. Used to force a fully cold cache.
    pub fn clear(&self) {
        let mut files = self.files.write().unwrap();
        let mut dirs = self.dirs.write().unwrap();
        files.clear();
        dirs.clear();
        self.lru.lock().unwrap().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let files = self.files.read().unwrap();
        let dirs = self.dirs.read().unwrap();
        let lru = self.lru.lock().unwrap();
        CacheStats {
            file_entries: files.len(),
            dir_entries: dirs.len(),
            lru_entries: lru.len(),
            ttl_ms: self.ttl.as_millis() as u64,
            max_size: self.max_size,
        }
    }

    /// Hit/miss path shared by the directory operations. Returns a clone of
    /// the cached record (the listing and membership set are behind `Arc`s).
    fn fetch_dir(&self, path: &Path) -> CachedDir {
        {
            let dirs = self.dirs.read().unwrap();
            if let Some(entry) = dirs.get(path) {
                if entry.is_fresh(self.ttl) {
                    let entry = entry.clone();
                    self.lru.lock().unwrap().touch(path);
                    trace!(path = %path.display(), "list hit");
                    return entry;
                }
            }
        }

        let entry = match Self::read_dir_once(path) {
            Ok((entries, membership)) => CachedDir {
                entries: Arc::new(entries),
                membership: Arc::new(membership),
                error: None,
                fetched_at: Instant::now(),
            },
            Err(err) => CachedDir {
                entries: Arc::new(Vec::new()),
                membership: Arc::new(HashSet::new()),
                error: Some(CacheError::from(&err)),
                fetched_at: Instant::now(),
            },
        };
        trace!(path = %path.display(), ok = entry.error.is_none(), "list miss");
        self.install_dir(path, entry.clone());
        entry
    }

    fn read_dir_once(path: &Path) -> io::Result<(Vec<DirEntry>, HashSet<String>)> {
        let mut entries = Vec::new();
        let mut membership = HashSet::new();
        for dent in std::fs::read_dir(path)? {
            let dent = dent?;
            let name = dent.file_name().to_string_lossy().into_owned();
            let is_dir = dent.file_type().map(|t| t.is_dir()).unwrap_or(false);
            membership.insert(name.clone());
            entries.push(DirEntry { name, is_dir });
        }
        Ok((entries, membership))
    }

    fn install_file(&self, path: &Path, entry: CachedFile) {
        {
            let mut files = self.files.write().unwrap();
            files.insert(path.to_path_buf(), entry);
            self.lru.lock().unwrap().touch(path);
        }
        self.enforce_capacity();
    }

    fn install_dir(&self, path: &Path, entry: CachedDir) {
        {
            let mut dirs = self.dirs.write().unwrap();
            dirs.insert(path.to_path_buf(), entry);
            self.lru.lock().unwrap().touch(path);
        }
        self.enforce_capacity();
    }

    /// Evict a batch of the globally least-recently-touched keys whenever the
    /// combined entry count exceeds the ceiling. Holds both store write locks
    /// so no reader observes a key present in the LRU index but gone from its
    /// store.
    fn enforce_capacity(&self) {
        let mut files = self.files.write().unwrap();
        let mut dirs = self.dirs.write().unwrap();
        if files.len() + dirs.len() <= self.max_size {
            return;
        }
        let batch = (self.max_size / 5).max(EVICT_BATCH_MIN);
        let victims = self.lru.lock().unwrap().evict_oldest(batch);
        for key in &victims {
            if files.remove(key).is_none() {
                dirs.remove(key);
            }
        }
        debug!(
            evicted = victims.len(),
            remaining = files.len() + dirs.len(),
            "capacity eviction"
        );
    }
}

impl Default for FsCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::thread;
    use tempfile::TempDir;

    const LONG_TTL: Duration = Duration::from_secs(60);
    const SHORT_TTL: Duration = Duration::from_millis(50);

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn stat_hit_and_negative_caching() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 100);
        let missing = dir.path().join("ghost.txt");

        let err = cache.stat(&missing).unwrap_err();
        assert!(err.is_not_found());

        // The file appears on disk, but the negative result is still fresh.
        File::create(&missing).unwrap();
        let err = cache.stat(&missing).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(cache.stats().file_entries, 1);
    }

    #[test]
    fn ttl_expiry_triggers_fresh_read() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(SHORT_TTL, 100);
        let path = write_file(&dir, "config.txt", "initial");

        let content = cache.read_file(&path).unwrap();
        assert_eq!(&*content, b"initial");

        // Within the TTL the overwrite is invisible.
        fs::write(&path, "modified").unwrap();
        let content = cache.read_file(&path).unwrap();
        assert_eq!(&*content, b"initial");

        thread::sleep(SHORT_TTL + Duration::from_millis(20));
        let content = cache.read_file(&path).unwrap();
        assert_eq!(&*content, b"modified");
    }

    #[test]
    fn expired_refresh_failure_replaces_stale_success() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(SHORT_TTL, 100);
        let path = write_file(&dir, "vanishing.txt", "here");

        cache.stat(&path).unwrap();
        fs::remove_file(&path).unwrap();
        thread::sleep(SHORT_TTL + Duration::from_millis(20));

        // The old success is not resurrected after a failed refresh.
        let err = cache.stat(&path).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn stat_only_entry_does_not_satisfy_read() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 100);
        let path = write_file(&dir, "a.txt", "first");

        cache.stat(&path).unwrap();
        // The stat hit must not fabricate content; the read goes to disk and
        // observes the current bytes.
        fs::write(&path, "second").unwrap();
        let content = cache.read_file(&path).unwrap();
        assert_eq!(&*content, b"second");
    }

    #[test]
    fn read_refreshes_metadata_alongside_content() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 100);
        let path = write_file(&dir, "grow.txt", "1234");

        let meta = cache.stat(&path).unwrap();
        assert_eq!(meta.len, 4);
        assert_eq!(cache.read_file(&path).unwrap().len(), 4);
    }

    #[test]
    fn exists_reuses_stat_path() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 100);
        let path = write_file(&dir, "present.txt", "x");

        assert!(cache.exists(&path));
        assert!(!cache.exists(dir.path().join("absent.txt")));
        // One entry per probed path, hit or miss.
        assert_eq!(cache.stats().file_entries, 2);
    }

    #[test]
    fn capacity_bound_evicts_least_recently_touched() {
        let dir = TempDir::new().unwrap();
        // max_size 15 -> eviction batch max(3, 10) = 10.
        let cache = FsCache::new(LONG_TTL, 15);

        let paths: Vec<PathBuf> = (0..16)
            .map(|i| write_file(&dir, &format!("f{i}.txt"), "x"))
            .collect();
        for path in &paths {
            cache.stat(path).unwrap();
        }

        // The 16th insertion overflowed and evicted the 10 oldest keys.
        let stats = cache.stats();
        assert_eq!(stats.file_entries, 6);
        assert_eq!(stats.lru_entries, 6);

        // Deleting the files from disk makes eviction observable: surviving
        // entries still answer from cache, evicted ones re-probe and fail.
        for path in &paths {
            fs::remove_file(path).unwrap();
        }
        assert!(cache.stat(&paths[5]).is_err());
        assert!(cache.stat(&paths[12]).is_ok());
    }

    #[test]
    fn capacity_never_exceeded_over_long_sequences() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 20);

        for i in 0..200 {
            let path = write_file(&dir, &format!("n{i}.txt"), "x");
            cache.stat(&path).unwrap();
            let stats = cache.stats();
            assert!(stats.file_entries + stats.dir_entries <= 20);
        }
    }

    #[test]
    fn list_dir_builds_membership_atomically() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "one.txt", "");
        write_file(&dir, "two.txt", "");
        fs::create_dir(dir.path().join("sub")).unwrap();

        let cache = FsCache::new(LONG_TTL, 100);
        let entries = cache.list_dir(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e.name == "sub" && e.is_dir));

        let exists = cache.batch_exists(dir.path(), &["one.txt", "sub", "nope"]);
        assert!(exists["one.txt"]);
        assert!(exists["sub"]);
        assert!(!exists["nope"]);
    }

    #[test]
    fn batch_exists_matches_pointwise_exists() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "a", "");
        write_file(&dir, "b", "");

        let cache = FsCache::new(LONG_TTL, 100);
        let names = ["a", "b", "c"];
        let batch = cache.batch_exists(dir.path(), &names);
        for name in names {
            assert_eq!(batch[name], cache.exists(dir.path().join(name)), "{name}");
        }
    }

    #[test]
    fn batch_exists_on_missing_dir_maps_all_false() {
        let dir = TempDir::new().unwrap();
        let cache = FsCache::new(LONG_TTL, 100);
        let batch = cache.batch_exists(dir.path().join("nowhere"), &["a", "b"]);
        assert!(batch.values().all(|v| !v));
        // The failed listing itself is cached.
        assert_eq!(cache.stats().dir_entries, 1);
    }

    #[test]
    fn batch_exists_with_content_reads_present_names() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "package.json", "{}");

        let cache = FsCache::new(LONG_TTL, 100);
        let probes = cache.batch_exists_with_content(dir.path(), &["package.json", "yarn.lock"]);

        let pkg = &probes["package.json"];
        assert!(pkg.exists);
        assert_eq!(pkg.content.as_deref(), Some(b"{}".as_slice()));

        let lock = &probes["yarn.lock"];
        assert!(!lock.exists);
        assert!(lock.content.is_none());
    }

    #[test]
    fn clear_resets_all_counts() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x.txt", "x");
        let cache = FsCache::new(LONG_TTL, 100);
        cache.read_file(&path).unwrap();
        cache.list_dir(dir.path()).unwrap();

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.file_entries, 0);
        assert_eq!(stats.dir_entries, 0);
        assert_eq!(stats.lru_entries, 0);
    }

    #[test]
    fn clear_expired_keeps_refreshed_entries() {
        let dir = TempDir::new().unwrap();
        let keep = write_file(&dir, "keep.txt", "k");
        let drop = write_file(&dir, "drop.txt", "d");
        let cache = FsCache::new(SHORT_TTL, 100);

        cache.stat(&keep).unwrap();
        cache.stat(&drop).unwrap();
        thread::sleep(SHORT_TTL + Duration::from_millis(20));
        cache.stat(&keep).unwrap(); // refresh one of the two

        cache.clear_expired();
        let stats = cache.stats();
        assert_eq!(stats.file_entries, 1);
        assert_eq!(stats.lru_entries, 1);
    }

    #[test]
    fn concurrent_mixed_workload_stays_consistent() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| write_file(&dir, &format!("w{i}.json"), "{\"n\": 1}"))
            .collect();
        let root = dir.path().to_path_buf();
        // Small ceiling so eviction runs constantly under contention.
        let cache = Arc::new(FsCache::new(Duration::from_millis(10), 12));

        let mut handles = Vec::new();
        for worker in 0..8 {
            let cache = Arc::clone(&cache);
            let paths = paths.clone();
            let root = root.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let path = &paths[(worker + i) % paths.len()];
                    match i % 4 {
                        0 => {
                            let _ = cache.read_file(path);
                        }
                        1 => {
                            let _ = cache.list_dir(&root);
                        }
                        2 => {
                            let _ = cache.parse_file::<serde_json::Value>(path);
                        }
                        _ => {
                            let _ = cache.batch_exists(&root, &["w0.json", "gone"]);
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.file_entries + stats.dir_entries <= 12);
        assert!(stats.lru_entries <= stats.file_entries + stats.dir_entries);
    }
}
