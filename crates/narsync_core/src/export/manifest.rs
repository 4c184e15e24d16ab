//! Manifest compositor: writes a renderer-ready bundle.
//!
//! Output layout:
//!
//! ```text
//! <output_dir>/
//!   timeline.json      entries, clips and padding, seconds as f64
//!   frames.ffconcat    frame images with display durations
//!   audio.ffconcat     narration clips and padding silence in order
//!   audio/
//!     segment_0000.mp3
//!     pad_frame_0005.wav
//! ```
//!
//! Both scripts use the ffmpeg concat demuxer format, so a renderer can
//! combine them with a single ffmpeg invocation.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::wav::{silence_wav, SILENCE_SAMPLE_RATE};
use super::{Compositor, ExportError, ExportOutput, ExportResult};
use crate::frames::FrameSource;
use crate::models::{Timeline, TimelineEntry};

/// Format version of `timeline.json`.
pub const MANIFEST_VERSION: u32 = 1;

const AUDIO_DIR: &str = "audio";

/// One audio file on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    /// Narration segment, `None` for padding silence.
    pub segment_index: Option<usize>,
    pub frame_index: usize,
    pub start_time: f64,
    pub duration: f64,
    /// Path relative to the output directory.
    pub file: String,
    /// True for generated silence (failed segment or padded frame).
    pub silence: bool,
}

/// Serialized form of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub version: u32,
    pub generated_at: String,
    pub frame_count: usize,
    pub total_duration: f64,
    pub padded_frames: Vec<usize>,
    pub entries: Vec<TimelineEntry>,
    pub clips: Vec<ClipRecord>,
}

/// Writes `timeline.json`, audio files and ffconcat scripts.
#[derive(Debug, Clone)]
pub struct ManifestCompositor {
    output_dir: PathBuf,
}

impl ManifestCompositor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write(&self, relative: &str, content: &[u8]) -> ExportResult<PathBuf> {
        let path = self.output_dir.join(relative);
        fs::write(&path, content).map_err(|e| ExportError::io(format!("write {}", relative), e))?;
        Ok(path)
    }

    /// Write every audio file and return the clip records in playback order.
    fn write_audio(&self, timeline: &Timeline) -> ExportResult<Vec<ClipRecord>> {
        let mut records = Vec::new();
        let mut clips = timeline.clips.iter().peekable();

        for entry in &timeline.entries {
            if entry.padded {
                let file = format!("{}/pad_frame_{:04}.wav", AUDIO_DIR, entry.frame_index);
                self.write(&file, &silence_wav(entry.duration, SILENCE_SAMPLE_RATE)?)?;
                records.push(ClipRecord {
                    segment_index: None,
                    frame_index: entry.frame_index,
                    start_time: entry.start_time,
                    duration: entry.duration,
                    file,
                    silence: true,
                });
                continue;
            }

            while let Some(clip) = clips.next_if(|c| c.frame_index == entry.frame_index) {
                let artifact = &clip.artifact;
                let silence = artifact.is_silence();
                let extension = if silence { "wav" } else { artifact.format.as_str() };
                let file = format!("{}/segment_{:04}.{}", AUDIO_DIR, clip.segment_index, extension);

                if silence {
                    self.write(&file, &silence_wav(artifact.duration_secs, SILENCE_SAMPLE_RATE)?)?;
                } else {
                    self.write(&file, &artifact.payload)?;
                }
                records.push(ClipRecord {
                    segment_index: Some(clip.segment_index),
                    frame_index: clip.frame_index,
                    start_time: clip.start_time,
                    duration: artifact.duration_secs,
                    file,
                    silence,
                });
            }
        }
        Ok(records)
    }
}

impl Compositor for ManifestCompositor {
    fn name(&self) -> &str {
        "manifest"
    }

    fn compose(&self, timeline: &Timeline, frames: &dyn FrameSource) -> ExportResult<ExportOutput> {
        if timeline.len() != frames.frame_count() {
            return Err(ExportError::FrameCountMismatch {
                timeline: timeline.len(),
                frames: frames.frame_count(),
            });
        }

        fs::create_dir_all(self.output_dir.join(AUDIO_DIR))
            .map_err(|e| ExportError::io("create output directory", e))?;

        let clips = self.write_audio(timeline)?;

        let images = (0..frames.frame_count())
            .map(|i| frames.frame_image(i))
            .collect::<Result<Vec<_>, _>>()?;

        let frames_script = self.write(
            "frames.ffconcat",
            frames_concat_script(&timeline.entries, &images).as_bytes(),
        )?;
        let audio_script = self.write("audio.ffconcat", audio_concat_script(&clips).as_bytes())?;

        let document = TimelineDocument {
            version: MANIFEST_VERSION,
            generated_at: chrono::Local::now().to_rfc3339(),
            frame_count: timeline.len(),
            total_duration: timeline.total_duration(),
            padded_frames: timeline.padded_frames(),
            entries: timeline.entries.clone(),
            clips: clips.clone(),
        };
        let manifest_path = self.write(
            "timeline.json",
            serde_json::to_string_pretty(&document)?.as_bytes(),
        )?;

        tracing::info!(
            "Exported {} frame(s), {} audio file(s) to {}",
            timeline.len(),
            clips.len(),
            self.output_dir.display()
        );

        Ok(ExportOutput {
            output_dir: self.output_dir.clone(),
            manifest_path,
            frames_script,
            audio_script,
            audio_files: clips.iter().map(|c| self.output_dir.join(&c.file)).collect(),
        })
    }
}

/// Concat-demuxer script for the frame images.
///
/// The demuxer ignores the duration of the final entry, so the last image
/// is listed once more.
fn frames_concat_script(entries: &[TimelineEntry], images: &[PathBuf]) -> String {
    let mut script = String::from("ffconcat version 1.0\n");
    for (entry, image) in entries.iter().zip(images) {
        let _ = writeln!(script, "file {}", quote_path(image));
        let _ = writeln!(script, "duration {:.6}", entry.duration);
    }
    if let Some(last) = images.get(entries.len().saturating_sub(1)) {
        let _ = writeln!(script, "file {}", quote_path(last));
    }
    script
}

fn audio_concat_script(clips: &[ClipRecord]) -> String {
    let mut script = String::from("ffconcat version 1.0\n");
    for clip in clips {
        let _ = writeln!(script, "file {}", quote_path(Path::new(&clip.file)));
        let _ = writeln!(script, "duration {:.6}", clip.duration);
    }
    script
}

/// Single-quote a path for the concat demuxer.
fn quote_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    format!("'{}'", text.replace('\'', r"'\''"))
}
