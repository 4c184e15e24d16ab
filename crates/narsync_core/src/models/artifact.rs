//! Synthesized audio artifacts.

use std::sync::Arc;

/// Format marker for substituted silence (no payload, rendered at export).
pub const SILENCE_FORMAT: &str = "silence";

/// Synthesized audio for one segment, with its measured duration.
///
/// The payload is reference counted so cache hits and fan-out to duplicate
/// segments do not copy audio bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    /// Segment this artifact is bound to.
    pub segment_index: usize,
    /// Measured playback duration in seconds.
    pub duration_secs: f64,
    /// Container/codec extension of the payload (e.g. "mp3", "wav").
    pub format: String,
    /// Encoded audio bytes.
    pub payload: Arc<[u8]>,
}

impl AudioArtifact {
    pub fn new(
        segment_index: usize,
        duration_secs: f64,
        format: impl Into<String>,
        payload: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            segment_index,
            duration_secs,
            format: format.into(),
            payload: payload.into(),
        }
    }

    /// Silence placeholder used when a failed segment is substituted.
    pub fn silence(segment_index: usize, duration_secs: f64) -> Self {
        Self::new(segment_index, duration_secs, SILENCE_FORMAT, Vec::new())
    }

    pub fn is_silence(&self) -> bool {
        self.format == SILENCE_FORMAT
    }

    /// Whether the duration is usable (finite and at least `min_secs`).
    ///
    /// A zero or near-zero duration signals a failed synthesis.
    pub fn has_valid_duration(&self, min_secs: f64) -> bool {
        self.duration_secs.is_finite() && self.duration_secs > 0.0 && self.duration_secs >= min_secs
    }

    /// Same audio, bound to a different segment.
    pub fn rebind(&self, segment_index: usize) -> Self {
        Self {
            segment_index,
            ..self.clone()
        }
    }
}
