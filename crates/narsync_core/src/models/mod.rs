//! Data models for Narration Sync.
//!
//! This module contains the core data structures shared across the engine:
//! - Segments and voice keys (narration input)
//! - Audio artifacts (synthesis output)
//! - Timeline entries and clip placements (compositor input)
//! - Policy enums for gap and frame reconciliation

mod artifact;
mod enums;
mod segment;
mod timeline;

pub use artifact::{AudioArtifact, SILENCE_FORMAT};
pub use enums::{FramePolicy, GapPolicy};
pub use segment::{NarratedSegment, Segment, VoiceConfig};
pub use timeline::{AudioPlacement, Timeline, TimelineEntry};
