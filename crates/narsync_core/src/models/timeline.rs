//! Timeline types handed to the compositor.
//!
//! All times are seconds as `f64`. Field names are part of the compositor
//! contract (they appear verbatim in `timeline.json`).

use serde::{Deserialize, Serialize};

use super::artifact::AudioArtifact;

/// Display window for one slide frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Frame shown during this window.
    pub frame_index: usize,
    /// Offset from the start of the video.
    pub start_time: f64,
    /// How long the frame stays on screen.
    pub duration: f64,
    /// Segments narrated over this frame, in narration order.
    #[serde(default)]
    pub segments: Vec<usize>,
    /// True when the frame had no narration and received padding.
    #[serde(default)]
    pub padded: bool,
}

impl TimelineEntry {
    /// End of the display window.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Where a segment's audio sits on the timeline.
#[derive(Debug, Clone)]
pub struct AudioPlacement {
    pub segment_index: usize,
    pub frame_index: usize,
    pub start_time: f64,
    pub artifact: AudioArtifact,
}

/// Fully assembled timeline: frame windows plus the audio placed on them.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub clips: Vec<AudioPlacement>,
}

impl Timeline {
    /// Number of frame entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total duration (end of the last entry).
    pub fn total_duration(&self) -> f64 {
        self.entries.last().map(|e| e.end_time()).unwrap_or(0.0)
    }

    /// Frames that received minimum-duration padding.
    pub fn padded_frames(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.padded)
            .map(|e| e.frame_index)
            .collect()
    }

    /// Sum of the durations of all placed audio.
    pub fn audio_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.artifact.duration_secs).sum()
    }

    /// Check the contiguity invariant: every entry starts exactly where the
    /// previous one ends, frames ascend by one, and durations are positive.
    pub fn is_contiguous(&self) -> bool {
        let mut expected_start = 0.0;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.frame_index != i || entry.duration <= 0.0 {
                return false;
            }
            if entry.start_time != expected_start {
                return false;
            }
            expected_start = entry.start_time + entry.duration;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(frame: usize, start: f64, duration: f64) -> TimelineEntry {
        TimelineEntry {
            frame_index: frame,
            start_time: start,
            duration,
            segments: vec![frame],
            padded: false,
        }
    }

    #[test]
    fn contiguity_detects_gap() {
        let ok = Timeline {
            entries: vec![entry(0, 0.0, 1.5), entry(1, 1.5, 2.0)],
            clips: Vec::new(),
        };
        assert!(ok.is_contiguous());
        assert_eq!(ok.total_duration(), 3.5);

        let gap = Timeline {
            entries: vec![entry(0, 0.0, 1.5), entry(1, 1.6, 2.0)],
            clips: Vec::new(),
        };
        assert!(!gap.is_contiguous());
    }

    #[test]
    fn entry_serializes_with_stable_names() {
        let json = serde_json::to_string(&entry(2, 4.0, 1.0)).unwrap();
        assert!(json.contains("\"frame_index\":2"));
        assert!(json.contains("\"start_time\":4.0"));
        assert!(json.contains("\"duration\":1.0"));
    }
}
