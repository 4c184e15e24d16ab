//! Narration segments and voice configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::artifact::AudioArtifact;

/// Opaque voice/config key passed through to the synthesizer.
///
/// Two segments with the same text but different voices never share
/// a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceConfig(String);

impl VoiceConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for VoiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of narration text mapped to a target frame.
///
/// Immutable once loaded into a `SegmentStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in narration order (dense, 0-based).
    pub index: usize,
    /// Slide frame this narration belongs to.
    pub target_frame: usize,
    /// Text to speak.
    pub text: String,
    /// Voice key for synthesis.
    pub voice: VoiceConfig,
}

impl Segment {
    pub fn new(
        index: usize,
        target_frame: usize,
        text: impl Into<String>,
        voice: VoiceConfig,
    ) -> Self {
        Self {
            index,
            target_frame,
            text: text.into(),
            voice,
        }
    }

    /// Short single-line preview of the text for log output.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// A segment paired with the audio that will be played for it.
///
/// This is the unit handed from synthesis to the timeline assembler,
/// always in ascending segment order.
#[derive(Debug, Clone)]
pub struct NarratedSegment {
    pub segment: Segment,
    pub artifact: AudioArtifact,
}

impl NarratedSegment {
    pub fn new(segment: Segment, artifact: AudioArtifact) -> Self {
        Self { segment, artifact }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_and_flattens() {
        let seg = Segment::new(0, 0, "Hello\n\nworld   of slides", VoiceConfig::default());
        assert_eq!(seg.preview(100), "Hello world of slides");
        assert_eq!(seg.preview(5), "Hello...");
    }

    #[test]
    fn voice_config_serializes_as_string() {
        let voice = VoiceConfig::new("en-US-alloy");
        let json = serde_json::to_string(&voice).unwrap();
        assert_eq!(json, "\"en-US-alloy\"");
    }
}
