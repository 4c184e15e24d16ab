//! Frame/segment reconciliation.
//!
//! Each frame gets one timeline entry. A frame's duration is the sum of the
//! audio of every segment targeting it; a frame nobody narrates is shown for
//! the minimum display duration. Entries start where the previous one ends.

use super::{AlignmentError, AlignmentResult};
use crate::config::TimelineSettings;
use crate::models::{
    AudioPlacement, FramePolicy, NarratedSegment, Segment, Timeline, TimelineEntry,
};

/// Reconciliation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerConfig {
    /// Duration given to frames without narration.
    pub min_frame_secs: f64,
    pub frame_policy: FramePolicy,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self::from(&TimelineSettings::default())
    }
}

impl From<&TimelineSettings> for AssemblerConfig {
    fn from(settings: &TimelineSettings) -> Self {
        Self {
            min_frame_secs: settings.min_frame_secs,
            frame_policy: settings.frame_policy,
        }
    }
}

/// Builds a contiguous timeline from ordered narration.
#[derive(Debug, Clone, Default)]
pub struct TimelineAssembler {
    config: AssemblerConfig,
}

impl TimelineAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Lay `narrated` (ascending segment index) onto `frame_count` frames.
    ///
    /// Fails without producing a partial timeline when any segment targets a
    /// frame outside `0..frame_count`, targets regress, durations are
    /// unusable, or the strict policy sees anything but a one-to-one mapping.
    pub fn assemble(&self, narrated: &[NarratedSegment], frame_count: usize) -> AlignmentResult<Timeline> {
        self.validate(narrated, frame_count)?;

        let mut per_frame: Vec<Vec<&NarratedSegment>> = vec![Vec::new(); frame_count];
        for item in narrated {
            per_frame[item.segment.target_frame].push(item);
        }

        if self.config.frame_policy == FramePolicy::Strict {
            check_one_to_one(&per_frame)?;
        }

        let mut timeline = Timeline::default();
        let mut start = 0.0;

        for (frame_index, items) in per_frame.iter().enumerate() {
            let padded = items.is_empty();
            let duration = if padded {
                self.config.min_frame_secs
            } else {
                items.iter().map(|n| n.artifact.duration_secs).sum()
            };

            let mut clip_start = start;
            for item in items {
                timeline.clips.push(AudioPlacement {
                    segment_index: item.segment.index,
                    frame_index,
                    start_time: clip_start,
                    artifact: item.artifact.clone(),
                });
                clip_start += item.artifact.duration_secs;
            }

            timeline.entries.push(TimelineEntry {
                frame_index,
                start_time: start,
                duration,
                segments: items.iter().map(|n| n.segment.index).collect(),
                padded,
            });
            start += duration;
        }

        let padded = timeline.padded_frames();
        if !padded.is_empty() {
            tracing::info!(
                "Padded {} unnarrated frame(s) with {:.2}s: {:?}",
                padded.len(),
                self.config.min_frame_secs,
                padded
            );
        }
        tracing::debug!(
            "Assembled {} entries, {} clips, {:.3}s total",
            timeline.len(),
            timeline.clips.len(),
            timeline.total_duration()
        );
        Ok(timeline)
    }

    /// Check frame targets against the deck before any audio exists.
    ///
    /// Every target outside `0..frame_count` is reported in one error;
    /// targets must not move backwards in segment order.
    pub fn check_targets<'a>(
        segments: impl IntoIterator<Item = &'a Segment>,
        frame_count: usize,
    ) -> AlignmentResult<()> {
        let segments: Vec<&Segment> = segments.into_iter().collect();

        let out_of_range: Vec<(usize, usize)> = segments
            .iter()
            .filter(|s| s.target_frame >= frame_count)
            .map(|s| (s.index, s.target_frame))
            .collect();
        if !out_of_range.is_empty() {
            return Err(AlignmentError::TargetOutOfRange {
                targets: out_of_range,
                frame_count,
            });
        }

        for pair in segments.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.target_frame < prev.target_frame {
                return Err(AlignmentError::TargetRegression {
                    segment_index: next.index,
                    target_frame: next.target_frame,
                    previous_frame: prev.target_frame,
                });
            }
        }
        Ok(())
    }

    fn validate(&self, narrated: &[NarratedSegment], frame_count: usize) -> AlignmentResult<()> {
        Self::check_targets(narrated.iter().map(|n| &n.segment), frame_count)?;

        for pair in narrated.windows(2) {
            let (prev, next) = (&pair[0].segment, &pair[1].segment);
            if next.index <= prev.index {
                return Err(AlignmentError::NotInOrder {
                    segment_index: next.index,
                    previous_index: prev.index,
                });
            }
        }

        if let Some(bad) = narrated.iter().find(|n| !n.artifact.has_valid_duration(0.0)) {
            return Err(AlignmentError::InvalidDuration {
                segment_index: bad.segment.index,
                duration_secs: bad.artifact.duration_secs,
            });
        }

        if !(self.config.min_frame_secs > 0.0 && self.config.min_frame_secs.is_finite()) {
            return Err(AlignmentError::InvalidPadding {
                min_frame_secs: self.config.min_frame_secs,
            });
        }
        Ok(())
    }
}

fn check_one_to_one(per_frame: &[Vec<&NarratedSegment>]) -> AlignmentResult<()> {
    let unmapped_frames: Vec<usize> = per_frame
        .iter()
        .enumerate()
        .filter(|(_, items)| items.is_empty())
        .map(|(i, _)| i)
        .collect();
    let shared_frames: Vec<usize> = per_frame
        .iter()
        .enumerate()
        .filter(|(_, items)| items.len() > 1)
        .map(|(i, _)| i)
        .collect();

    if unmapped_frames.is_empty() && shared_frames.is_empty() {
        Ok(())
    } else {
        Err(AlignmentError::Mismatch {
            unmapped_frames,
            shared_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioArtifact, Segment, VoiceConfig};

    fn narrated(index: usize, target_frame: usize, duration: f64) -> NarratedSegment {
        NarratedSegment::new(
            Segment::new(index, target_frame, format!("text {}", index), VoiceConfig::default()),
            AudioArtifact::new(index, duration, "mp3", vec![0u8]),
        )
    }

    fn one_to_one(durations: &[f64]) -> Vec<NarratedSegment> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| narrated(i, i, *d))
            .collect()
    }

    #[test]
    fn equal_counts_sum_durations() {
        let durations = [1.5, 2.25, 0.75, 3.0];
        let timeline = TimelineAssembler::default()
            .assemble(&one_to_one(&durations), 4)
            .unwrap();

        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline.total_duration(), 7.5);
        assert!(timeline.is_contiguous());
        assert!(timeline.padded_frames().is_empty());
        assert_eq!(timeline.entries[2].start_time, 3.75);
    }

    #[test]
    fn extra_frames_are_padded() {
        let timeline = TimelineAssembler::default()
            .assemble(&one_to_one(&[1.0, 2.0, 3.0, 4.0, 5.0]), 7)
            .unwrap();

        assert_eq!(timeline.len(), 7);
        assert_eq!(timeline.padded_frames(), vec![5, 6]);
        assert_eq!(timeline.entries[6].duration, 1.0);
        assert_eq!(timeline.total_duration(), 15.0 + 2.0);
        assert!(timeline.is_contiguous());
    }

    #[test]
    fn segments_sharing_a_frame_are_concatenated() {
        let items = vec![narrated(0, 0, 1.25), narrated(1, 0, 2.0), narrated(2, 1, 3.5)];
        let timeline = TimelineAssembler::default().assemble(&items, 2).unwrap();

        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.entries[0].duration, 3.25);
        assert_eq!(timeline.entries[0].segments, vec![0, 1]);
        assert_eq!(timeline.entries[1].start_time, 3.25);
        assert_eq!(timeline.entries[1].duration, 3.5);

        // Clips play back to back inside the shared frame
        assert_eq!(timeline.clips[1].start_time, 1.25);
        assert_eq!(timeline.clips[2].start_time, 3.25);
        assert_eq!(timeline.audio_duration(), timeline.total_duration());
    }

    #[test]
    fn target_out_of_range_is_an_error() {
        let items = vec![narrated(0, 0, 1.0), narrated(1, 5, 1.0)];
        let err = TimelineAssembler::default().assemble(&items, 3).unwrap_err();

        assert_eq!(
            err,
            AlignmentError::TargetOutOfRange {
                targets: vec![(1, 5)],
                frame_count: 3
            }
        );
    }

    #[test]
    fn regressing_targets_are_rejected() {
        let items = vec![narrated(0, 1, 1.0), narrated(1, 0, 1.0)];
        let err = TimelineAssembler::default().assemble(&items, 2).unwrap_err();
        assert!(matches!(err, AlignmentError::TargetRegression { segment_index: 1, .. }));
    }

    #[test]
    fn skipped_segment_leaves_padded_frame() {
        // Segment 1 was dropped by the gap policy
        let items = vec![narrated(0, 0, 2.0), narrated(2, 2, 2.0)];
        let timeline = TimelineAssembler::default().assemble(&items, 3).unwrap();
        assert_eq!(timeline.padded_frames(), vec![1]);
        assert_eq!(timeline.total_duration(), 5.0);
    }

    #[test]
    fn strict_policy_rejects_mismatch() {
        let assembler = TimelineAssembler::new(AssemblerConfig {
            min_frame_secs: 1.0,
            frame_policy: FramePolicy::Strict,
        });
        let items = vec![narrated(0, 0, 1.0), narrated(1, 0, 1.0)];

        let err = assembler.assemble(&items, 2).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::Mismatch {
                unmapped_frames: vec![1],
                shared_frames: vec![0]
            }
        );
        assert!(assembler.assemble(&one_to_one(&[1.0, 2.0]), 2).is_ok());
    }

    #[test]
    fn zero_duration_artifact_is_rejected() {
        let items = vec![narrated(0, 0, 0.0)];
        let err = TimelineAssembler::default().assemble(&items, 1).unwrap_err();
        assert!(matches!(err, AlignmentError::InvalidDuration { segment_index: 0, .. }));
    }

    #[test]
    fn no_narration_pads_every_frame() {
        let timeline = TimelineAssembler::default().assemble(&[], 3).unwrap();
        assert_eq!(timeline.padded_frames(), vec![0, 1, 2]);
        assert_eq!(timeline.total_duration(), 3.0);
    }

    #[test]
    fn targets_checked_without_audio() {
        let voice = VoiceConfig::default();
        let ordered = [Segment::new(0, 0, "a", voice.clone()), Segment::new(1, 1, "b", voice.clone())];
        TimelineAssembler::check_targets(&ordered, 2).unwrap();

        let backwards = [Segment::new(0, 1, "a", voice.clone()), Segment::new(1, 0, "b", voice)];
        assert!(matches!(
            TimelineAssembler::check_targets(&backwards, 2),
            Err(AlignmentError::TargetRegression { segment_index: 1, target_frame: 0, previous_frame: 1 })
        ));
        assert!(matches!(
            TimelineAssembler::check_targets(&ordered, 1),
            Err(AlignmentError::TargetOutOfRange { frame_count: 1, .. })
        ));
    }
}
