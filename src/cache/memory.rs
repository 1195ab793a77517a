use std::collections::HashMap;

use super::CacheBackend;
use crate::types::CachedResponse;

/// Process-lifetime in-memory backend. Capacity eviction drops the entry
/// with the lowest insertion sequence; replacing an existing key keeps its
/// original sequence so hit-count updates never rejuvenate an entry.
pub struct MemoryBackend {
    entries: HashMap<String, Slot>,
    next_seq: u64,
}

struct Slot {
    seq: u64,
    entry: CachedResponse,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&mut self, key: &str) -> Option<CachedResponse> {
        self.entries.get(key).map(|slot| slot.entry.clone())
    }

    fn set(&mut self, key: &str, entry: CachedResponse) {
        let seq = match self.entries.get(key) {
            Some(slot) => slot.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.entries.insert(key.to_string(), Slot { seq, entry });
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<CachedResponse> {
        self.entries.values().map(|s| s.entry.clone()).collect()
    }

    fn enforce_capacity(&mut self, max_entries: usize) {
        while self.entries.len() > max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
