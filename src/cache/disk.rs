use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use super::CacheBackend;
use crate::types::CachedResponse;

/// On-disk backend: one JSON file per cache key, `<hex-key>.json`, under an
/// exclusively-owned directory. Corrupted files are deleted on parse
/// failure so the cache self-heals. Capacity eviction deletes the
/// oldest-by-modification-time files first.
pub struct DiskBackend {
    dir: PathBuf,
}

impl DiskBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }

    fn read_entry(&self, path: &Path) -> Option<CachedResponse> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "deleting corrupt cache file");
                let _ = fs::remove_file(path);
                None
            }
        }
    }
}

impl CacheBackend for DiskBackend {
    fn get(&mut self, key: &str) -> Option<CachedResponse> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        self.read_entry(&path)
    }

    fn set(&mut self, key: &str, entry: CachedResponse) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to create cache dir");
            return;
        }
        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(self.entry_path(key), data) {
                    warn!(key, error = %e, "failed to write cache file");
                }
            }
            Err(e) => warn!(key, error = %e, "failed to serialize cache entry"),
        }
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.entry_path(key));
    }

    fn clear(&mut self) {
        for path in self.entry_files() {
            let _ = fs::remove_file(path);
        }
    }

    fn len(&self) -> usize {
        self.entry_files().len()
    }

    fn entries(&self) -> Vec<CachedResponse> {
        self.entry_files()
            .iter()
            .filter_map(|p| self.read_entry(p))
            .collect()
    }

    fn enforce_capacity(&mut self, max_entries: usize) {
        let mut files: Vec<(PathBuf, SystemTime)> = self
            .entry_files()
            .into_iter()
            .filter_map(|p| {
                let mtime = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((p, mtime))
            })
            .collect();
        if files.len() <= max_entries {
            return;
        }
        files.sort_by_key(|(_, mtime)| *mtime);
        let excess = files.len() - max_entries;
        for (path, _) in files.into_iter().take(excess) {
            let _ = fs::remove_file(path);
        }
    }
}
