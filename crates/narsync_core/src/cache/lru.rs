//! Bounded in-memory artifact map with least-recently-used eviction.

use std::collections::{BTreeMap, HashMap};

use super::key::CacheKey;
use crate::models::AudioArtifact;

struct Slot {
    artifact: AudioArtifact,
    last_used: u64,
}

/// In-memory artifact store.
///
/// Recency is tracked with a monotonically increasing tick; the `order` map
/// gives the oldest entry in O(log n).
pub(crate) struct LruMap {
    entries: HashMap<CacheKey, Slot>,
    order: BTreeMap<u64, CacheKey>,
    tick: u64,
    /// 0 means unbounded.
    capacity: usize,
}

impl LruMap {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up and mark as most recently used.
    pub(crate) fn get(&mut self, key: &CacheKey) -> Option<AudioArtifact> {
        let tick = self.next_tick();
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.last_used);
        slot.last_used = tick;
        self.order.insert(tick, key.clone());
        Some(slot.artifact.clone())
    }

    /// Insert or replace; returns the key evicted to make room, if any.
    pub(crate) fn insert(&mut self, key: CacheKey, artifact: AudioArtifact) -> Option<CacheKey> {
        let tick = self.next_tick();
        if let Some(old) = self.entries.insert(
            key.clone(),
            Slot {
                artifact,
                last_used: tick,
            },
        ) {
            self.order.remove(&old.last_used);
        }
        self.order.insert(tick, key);

        if self.capacity > 0 && self.entries.len() > self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
                return Some(oldest);
            }
        }
        None
    }

    pub(crate) fn remove(&mut self, key: &CacheKey) {
        if let Some(slot) = self.entries.remove(key) {
            self.order.remove(&slot.last_used);
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
