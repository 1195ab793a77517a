pub mod disk;
pub mod memory;

use std::collections::HashMap;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{CacheStats, CachedResponse};

pub use disk::DiskBackend;
pub use memory::MemoryBackend;

/// Storage backend for cached responses.
///
/// Backends only store and enumerate entries; TTL policy, hit counting,
/// key generation, and stats live in [`ResponseCache`].
pub trait CacheBackend {
    fn get(&mut self, key: &str) -> Option<CachedResponse>;

    /// Insert or replace an entry. Replacing must not change the entry's
    /// position in the backend's eviction order for the memory backend
    /// (eviction there is oldest-by-insertion, and hit-count updates go
    /// through `set`).
    fn set(&mut self, key: &str, entry: CachedResponse);

    fn remove(&mut self, key: &str);

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all live entries, for stats.
    fn entries(&self) -> Vec<CachedResponse>;

    /// Drop the oldest entries until at most `max_entries` remain.
    /// "Oldest" is insertion order for memory, modification time for disk.
    fn enforce_capacity(&mut self, max_entries: usize);
}

/// Which sampling parameters participate in the cache key.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyConfig {
    pub include_temperature: bool,
    pub include_max_tokens: bool,
}

impl Default for CacheKeyConfig {
    fn default() -> Self {
        Self {
            include_temperature: true,
            include_max_tokens: true,
        }
    }
}

/// New-entry parameters for [`ResponseCache::set`].
#[derive(Debug, Clone, Default)]
pub struct CacheInsert {
    pub response: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    /// Explicit TTL override; falls back to the per-model default, then the
    /// global default.
    pub ttl_secs: Option<u64>,
    pub model: Option<String>,
}

/// Content-addressed cache of prior LLM responses with TTL expiry and
/// size-bounded eviction, over a pluggable backend.
pub struct ResponseCache {
    backend: Box<dyn CacheBackend>,
    max_entries: usize,
    default_ttl_secs: u64,
    model_ttl_secs: HashMap<String, u64>,
    key_config: CacheKeyConfig,
}

impl ResponseCache {
    pub fn new(
        backend: Box<dyn CacheBackend>,
        max_entries: usize,
        default_ttl_secs: u64,
        model_ttl_secs: HashMap<String, u64>,
        key_config: CacheKeyConfig,
    ) -> Self {
        Self {
            backend,
            max_entries,
            default_ttl_secs,
            model_ttl_secs,
            key_config,
        }
    }

    /// Deterministic key: prompt text plus the configured sampling-parameter
    /// suffixes, hashed with SHA-256 to a fixed-length hex string.
    pub fn cache_key(
        &self,
        prompt: &str,
        temperature: Option<f64>,
        max_tokens: Option<u64>,
    ) -> String {
        let mut material = prompt.to_string();
        if self.key_config.include_temperature {
            if let Some(t) = temperature {
                material.push_str(&format!("|temp:{t}"));
            }
        }
        if self.key_config.include_max_tokens {
            if let Some(n) = max_tokens {
                material.push_str(&format!("|max:{n}"));
            }
        }
        hex::encode(Sha256::digest(material.as_bytes()))
    }

    /// Miss if absent or expired; expired entries are deleted as a side
    /// effect. On a hit the entry's hit counter is bumped and persisted.
    pub fn get(&mut self, key: &str) -> Option<CachedResponse> {
        let mut entry = self.backend.get(key)?;
        if entry.is_expired(Utc::now()) {
            debug!(key, "cache entry expired");
            self.backend.remove(key);
            return None;
        }
        entry.hit_count += 1;
        self.backend.set(key, entry.clone());
        Some(entry)
    }

    pub fn set(&mut self, key: &str, insert: CacheInsert) {
        let ttl_secs = insert
            .ttl_secs
            .or_else(|| {
                insert
                    .model
                    .as_deref()
                    .and_then(|m| self.model_ttl_secs.get(m).copied())
            })
            .unwrap_or(self.default_ttl_secs);

        let entry = CachedResponse {
            response: insert.response,
            input_tokens: insert.input_tokens,
            output_tokens: insert.output_tokens,
            cost: insert.cost,
            created_at: Utc::now(),
            ttl_secs,
            hit_count: 0,
        };
        self.backend.set(key, entry);
        self.backend.enforce_capacity(self.max_entries);
    }

    pub fn clear(&mut self) {
        self.backend.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.backend.entries();
        let size = entries.len();
        let total_hits: u64 = entries.iter().map(|e| e.hit_count).sum();
        let total_cost_saved: f64 = entries.iter().map(|e| e.cost * e.hit_count as f64).sum();
        CacheStats {
            size,
            total_hits,
            total_cost_saved,
            average_hit_rate: if size > 0 {
                total_hits as f64 / size as f64
            } else {
                0.0
            },
        }
    }
}
