//! Content-addressed synthesis cache.
//!
//! Maps `(normalized text, voice)` to a previously produced audio artifact so
//! the same narration is never paid for twice. Two layers:
//!
//! - an in-memory map capped by least-recently-used eviction
//! - an optional on-disk store that makes repeated runs idempotent
//!
//! A miss only ever costs a re-synthesis, so eviction and corrupt disk
//! entries degrade to misses instead of errors. The cache is shared by the
//! scheduler's workers; writes are serialized and the first writer for a key
//! wins (later writes for the same key are no-ops).

mod disk;
mod key;
mod lru;

pub use key::{normalize_text, CacheKey};

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::{CacheSettings, PathSettings};
use crate::models::AudioArtifact;

use disk::DiskStore;
use lru::LruMap;

/// Errors from cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A stored entry exists but cannot be trusted.
    #[error("Cache entry {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// Filesystem failure.
    #[error("Cache I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    pub fn corrupt(key: &CacheKey, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.as_str().to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Outcome of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The artifact was stored.
    Stored,
    /// An entry already existed; the first writer's artifact is kept.
    AlreadyPresent,
    /// Not cacheable (silence placeholder or invalid duration).
    Rejected,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub disk_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub corrupt_entries: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    corrupt: u64,
    evictions: u64,
}

/// Process-scoped synthesis cache, passed explicitly to the scheduler.
pub struct SynthesisCache {
    memory: Mutex<LruMap>,
    disk: Option<DiskStore>,
    /// Serializes `put` so check-then-store is atomic per cache.
    write_lock: Mutex<()>,
    counters: Mutex<Counters>,
}

impl SynthesisCache {
    /// Memory-only cache holding at most `max_entries` artifacts (0 = unbounded).
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            memory: Mutex::new(LruMap::new(max_entries)),
            disk: None,
            write_lock: Mutex::new(()),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Cache backed by a directory that persists across runs.
    pub fn persistent(dir: impl Into<PathBuf>, max_entries: usize) -> CacheResult<Self> {
        let disk = DiskStore::open(dir)?;
        tracing::debug!("Opened synthesis cache at {}", disk.root().display());
        Ok(Self {
            disk: Some(disk),
            ..Self::in_memory(max_entries)
        })
    }

    /// Build from settings; `None` when caching is disabled.
    pub fn from_settings(
        cache: &CacheSettings,
        paths: &PathSettings,
    ) -> CacheResult<Option<Self>> {
        if !cache.enabled {
            return Ok(None);
        }
        if cache.persist {
            Self::persistent(&paths.cache_folder, cache.max_entries).map(Some)
        } else {
            Ok(Some(Self::in_memory(cache.max_entries)))
        }
    }

    /// Directory of the persistent layer, if any.
    pub fn disk_root(&self) -> Option<&Path> {
        self.disk.as_ref().map(|d| d.root())
    }

    /// Look up an artifact.
    ///
    /// The returned artifact's `segment_index` is meaningless; callers rebind
    /// it to the requesting segment. Corrupt disk entries are logged, removed
    /// and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<AudioArtifact> {
        if let Some(artifact) = self.memory.lock().get(key) {
            self.counters.lock().hits += 1;
            return Some(artifact);
        }

        let Some(disk) = &self.disk else {
            self.counters.lock().misses += 1;
            return None;
        };

        match disk.load(key) {
            Ok(Some(artifact)) => {
                self.remember(key.clone(), artifact.clone());
                self.counters.lock().hits += 1;
                Some(artifact)
            }
            Ok(None) => {
                self.counters.lock().misses += 1;
                None
            }
            Err(CacheError::Corrupt { reason, .. }) => {
                tracing::warn!("Dropping corrupt cache entry {}: {}", key, reason);
                disk.remove(key);
                self.memory.lock().remove(key);
                let mut counters = self.counters.lock();
                counters.corrupt += 1;
                counters.misses += 1;
                None
            }
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                self.counters.lock().misses += 1;
                None
            }
        }
    }

    /// Store an artifact under `key`.
    ///
    /// First writer wins: if the key is already present (in memory or on
    /// disk) the call is a no-op. A disk failure still leaves the artifact in
    /// memory and is returned so the caller can log it.
    pub fn put(&self, key: &CacheKey, artifact: &AudioArtifact) -> CacheResult<PutOutcome> {
        if artifact.is_silence() || !artifact.has_valid_duration(0.0) {
            return Ok(PutOutcome::Rejected);
        }

        let _guard = self.write_lock.lock();

        let in_memory = self.memory.lock().contains(key);
        let on_disk = self.disk.as_ref().is_some_and(|d| d.contains(key));
        if in_memory || on_disk {
            return Ok(PutOutcome::AlreadyPresent);
        }

        let disk_result = match &self.disk {
            Some(disk) => disk.store(key, artifact),
            None => Ok(()),
        };
        self.remember(key.clone(), artifact.clone());
        disk_result.map(|_| PutOutcome::Stored)
    }

    pub fn stats(&self) -> CacheStats {
        let memory_entries = self.memory.lock().len();
        let counters = self.counters.lock();
        CacheStats {
            memory_entries,
            disk_entries: self.disk.as_ref().map(|d| d.entry_count()).unwrap_or(0),
            hits: counters.hits,
            misses: counters.misses,
            corrupt_entries: counters.corrupt,
            evictions: counters.evictions,
        }
    }

    fn remember(&self, key: CacheKey, artifact: AudioArtifact) {
        if let Some(evicted) = self.memory.lock().insert(key, artifact) {
            tracing::trace!("Evicted {} from memory cache", evicted);
            self.counters.lock().evictions += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoiceConfig;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn key(text: &str) -> CacheKey {
        CacheKey::new(text, &VoiceConfig::default())
    }

    fn artifact(duration: f64, byte: u8) -> AudioArtifact {
        AudioArtifact::new(0, duration, "mp3", vec![byte; 8])
    }

    #[test]
    fn miss_then_hit() {
        let cache = SynthesisCache::in_memory(16);
        assert!(cache.get(&key("a")).is_none());

        assert_eq!(cache.put(&key("a"), &artifact(1.5, 1)).unwrap(), PutOutcome::Stored);

        let hit = cache.get(&key("a")).unwrap();
        assert_eq!(hit.duration_secs, 1.5);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn first_writer_wins() {
        let cache = SynthesisCache::in_memory(16);
        cache.put(&key("a"), &artifact(1.0, 1)).unwrap();
        let second = cache.put(&key("a"), &artifact(9.0, 2)).unwrap();

        assert_eq!(second, PutOutcome::AlreadyPresent);
        assert_eq!(cache.get(&key("a")).unwrap().duration_secs, 1.0);
    }

    #[test]
    fn concurrent_writers_store_exactly_once() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(SynthesisCache::persistent(dir.path(), 16).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.put(&key("same"), &artifact(1.0 + i as f64, i)).unwrap())
            })
            .collect();

        let stored = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == PutOutcome::Stored)
            .count();
        assert_eq!(stored, 1);
        assert_eq!(cache.stats().disk_entries, 1);
    }

    #[test]
    fn rejects_silence_and_zero_duration() {
        let cache = SynthesisCache::in_memory(16);
        assert_eq!(
            cache.put(&key("a"), &AudioArtifact::silence(0, 1.0)).unwrap(),
            PutOutcome::Rejected
        );
        assert_eq!(cache.put(&key("b"), &artifact(0.0, 1)).unwrap(), PutOutcome::Rejected);
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let cache = SynthesisCache::persistent(dir.path(), 16).unwrap();
            cache.put(&key("narration"), &artifact(3.0, 7)).unwrap();
        }

        let reopened = SynthesisCache::persistent(dir.path(), 16).unwrap();
        let hit = reopened.get(&key("narration")).unwrap();
        assert_eq!(hit.duration_secs, 3.0);
        assert_eq!(&*hit.payload, &[7u8; 8]);
    }

    #[test]
    fn corrupt_disk_entry_is_a_miss() {
        crate::logging::init_test_tracing();
        let dir = tempdir().unwrap();
        {
            let cache = SynthesisCache::persistent(dir.path(), 16).unwrap();
            cache.put(&key("narration"), &artifact(3.0, 7)).unwrap();
        }
        let payload = dir.path().join(format!("{}.audio", key("narration").as_str()));
        std::fs::write(&payload, b"truncated").unwrap();

        let reopened = SynthesisCache::persistent(dir.path(), 16).unwrap();
        assert!(reopened.get(&key("narration")).is_none());
        assert_eq!(reopened.stats().corrupt_entries, 1);

        // Entry was dropped, so a fresh put is stored again
        assert_eq!(
            reopened.put(&key("narration"), &artifact(3.0, 7)).unwrap(),
            PutOutcome::Stored
        );
    }

    #[test]
    fn eviction_falls_back_to_disk() {
        let dir = tempdir().unwrap();
        let cache = SynthesisCache::persistent(dir.path(), 1).unwrap();
        cache.put(&key("a"), &artifact(1.0, 1)).unwrap();
        cache.put(&key("b"), &artifact(2.0, 2)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(cache.get(&key("a")).unwrap().duration_secs, 1.0);
    }
}
