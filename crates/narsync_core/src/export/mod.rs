//! Compositor handoff.
//!
//! Rendering the final video is external. A [`Compositor`] receives the
//! assembled timeline plus the frame images and produces whatever the
//! renderer consumes.

mod manifest;
mod wav;

pub use manifest::{ClipRecord, ManifestCompositor, TimelineDocument, MANIFEST_VERSION};
pub use wav::{silence_wav, SILENCE_SAMPLE_RATE};

use std::path::PathBuf;

use thiserror::Error;

use crate::frames::{FrameError, FrameSource};
use crate::models::Timeline;

/// Errors raised while exporting a timeline.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize timeline: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Timeline has {timeline} entries but the deck has {frames} frames")]
    FrameCountMismatch { timeline: usize, frames: usize },

    #[error("{duration_secs}s of silence at {sample_rate} Hz exceeds the WAV size limit")]
    SilenceTooLong { duration_secs: f64, sample_rate: u32 },
}

impl ExportError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Files produced by an export.
#[derive(Debug, Clone, Default)]
pub struct ExportOutput {
    pub output_dir: PathBuf,
    /// `timeline.json`.
    pub manifest_path: PathBuf,
    /// ffconcat script showing each frame for its duration.
    pub frames_script: PathBuf,
    /// ffconcat script playing the narration (and padding silence) in order.
    pub audio_script: PathBuf,
    /// Audio files written, in playback order.
    pub audio_files: Vec<PathBuf>,
}

/// Consumer of an assembled timeline.
pub trait Compositor: Send + Sync {
    fn name(&self) -> &str;

    fn compose(&self, timeline: &Timeline, frames: &dyn FrameSource) -> ExportResult<ExportOutput>;
}
