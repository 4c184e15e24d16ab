//! Content-addressed cache keys.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::models::{Segment, VoiceConfig};

/// SHA-256 of the synthesizer namespace, normalized text and voice key,
/// hex encoded.
///
/// The namespace identifies what produced the audio (engine, command,
/// output format), so switching engines never serves stale artifacts.
/// Segment index and target frame are not part of the key, so identical
/// narration on different slides shares one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key in the empty namespace.
    pub fn new(text: &str, voice: &VoiceConfig) -> Self {
        Self::namespaced("", text, voice)
    }

    pub fn namespaced(namespace: &str, text: &str, voice: &VoiceConfig) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        // Unit separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update([0x1f]);
        hasher.update(normalize_text(text).as_bytes());
        hasher.update([0x1f]);
        hasher.update(voice.as_str().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn for_segment(namespace: &str, segment: &Segment) -> Self {
        Self::namespaced(namespace, &segment.text, &segment.voice)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a key previously produced by `as_str` (64 lowercase hex chars).
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == 64
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(value.to_string()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12])
    }
}

/// Normalize narration text for keying: trim and collapse whitespace runs.
///
/// Case and punctuation are kept since they change how the text is spoken.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
