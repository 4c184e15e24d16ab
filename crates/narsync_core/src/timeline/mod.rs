//! Timeline assembly: reconcile narrated segments with slide frames.

mod assembler;

pub use assembler::{AssemblerConfig, TimelineAssembler};

use thiserror::Error;

/// Narration cannot be laid onto the frames.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// One or more segments point past the last frame.
    #[error(
        "{} segment(s) target frames outside 0..{frame_count}: {}",
        targets.len(),
        describe_targets(targets)
    )]
    TargetOutOfRange {
        /// `(segment_index, target_frame)` pairs.
        targets: Vec<(usize, usize)>,
        frame_count: usize,
    },

    /// Frame targets must not move backwards in narration order.
    #[error("Segment {segment_index} targets frame {target_frame} after frame {previous_frame}")]
    TargetRegression {
        segment_index: usize,
        target_frame: usize,
        previous_frame: usize,
    },

    /// Segments were not handed over in ascending index order.
    #[error("Segment {segment_index} arrived after segment {previous_index}")]
    NotInOrder {
        segment_index: usize,
        previous_index: usize,
    },

    #[error("Segment {segment_index} has unusable audio duration {duration_secs}s")]
    InvalidDuration {
        segment_index: usize,
        duration_secs: f64,
    },

    #[error("Minimum frame duration must be positive, got {min_frame_secs}s")]
    InvalidPadding { min_frame_secs: f64 },

    /// Strict frame policy: counts must match one-to-one.
    #[error(
        "Frame/segment mismatch: unnarrated frames {:?}, frames with several segments {:?}",
        unmapped_frames,
        shared_frames
    )]
    Mismatch {
        unmapped_frames: Vec<usize>,
        shared_frames: Vec<usize>,
    },
}

/// Result type for alignment.
pub type AlignmentResult<T> = Result<T, AlignmentError>;

fn describe_targets(targets: &[(usize, usize)]) -> String {
    targets
        .iter()
        .map(|(segment, frame)| format!("#{}->{}", segment, frame))
        .collect::<Vec<_>>()
        .join(", ")
}
