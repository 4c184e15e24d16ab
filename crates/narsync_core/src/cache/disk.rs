//! Persistent artifact store on disk.
//!
//! Layout per entry, under the cache directory:
//!
//! ```text
//! <key>.audio   payload bytes
//! <key>.json    metadata (written last; its presence commits the entry)
//! ```
//!
//! Both files are written to a temp name and renamed into place, so a crash
//! or an abandoned worker never leaves a readable half-written entry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::key::CacheKey;
use super::{CacheError, CacheResult};
use crate::models::AudioArtifact;

const ENTRY_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    version: u32,
    duration_secs: f64,
    format: String,
    payload_len: usize,
    payload_sha256: String,
    created_at: String,
}

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub(crate) struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub(crate) fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::io("create cache directory", e))?;
        Ok(Self { root })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }

    fn payload_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.audio", key.as_str()))
    }

    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.meta_path(key).exists()
    }

    /// Load an entry.
    ///
    /// `Ok(None)` for a plain miss, `Err(Corrupt)` when the entry exists but
    /// cannot be trusted.
    pub(crate) fn load(&self, key: &CacheKey) -> CacheResult<Option<AudioArtifact>> {
        let meta_path = self.meta_path(key);
        let meta_text = match fs::read_to_string(&meta_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io("read cache metadata", e)),
        };

        let meta: EntryMeta = serde_json::from_str(&meta_text)
            .map_err(|e| CacheError::corrupt(key, format!("unreadable metadata: {}", e)))?;

        if meta.version != ENTRY_VERSION {
            return Err(CacheError::corrupt(
                key,
                format!("unsupported entry version {}", meta.version),
            ));
        }
        if !(meta.duration_secs.is_finite() && meta.duration_secs > 0.0) {
            return Err(CacheError::corrupt(
                key,
                format!("invalid duration {}", meta.duration_secs),
            ));
        }

        let payload = fs::read(self.payload_path(key))
            .map_err(|e| CacheError::corrupt(key, format!("missing payload: {}", e)))?;

        if payload.len() != meta.payload_len || sha256_hex(&payload) != meta.payload_sha256 {
            return Err(CacheError::corrupt(key, "payload checksum mismatch"));
        }

        Ok(Some(AudioArtifact::new(
            0,
            meta.duration_secs,
            meta.format,
            payload,
        )))
    }

    /// Store an entry atomically (payload first, metadata last).
    pub(crate) fn store(&self, key: &CacheKey, artifact: &AudioArtifact) -> CacheResult<()> {
        let meta = EntryMeta {
            version: ENTRY_VERSION,
            duration_secs: artifact.duration_secs,
            format: artifact.format.clone(),
            payload_len: artifact.payload.len(),
            payload_sha256: sha256_hex(&artifact.payload),
            created_at: chrono::Local::now().to_rfc3339(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| CacheError::io("serialize cache metadata", io::Error::other(e)))?;

        atomic_write(&self.payload_path(key), &artifact.payload)
            .map_err(|e| CacheError::io("write cache payload", e))?;
        atomic_write(&self.meta_path(key), &meta_json)
            .map_err(|e| CacheError::io("write cache metadata", e))?;
        Ok(())
    }

    /// Delete an entry (used to drop corrupt entries).
    pub(crate) fn remove(&self, key: &CacheKey) {
        let _ = fs::remove_file(self.meta_path(key));
        let _ = fs::remove_file(self.payload_path(key));
    }

    /// Number of committed entries on disk.
    pub(crate) fn entry_count(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".{}.tmp", std::process::id()));
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)
}
