//! Ordered, immutable store of narration segments.
//!
//! The store is the ground truth for narration order: segment indices are
//! checked to be dense and strictly increasing on construction, and the
//! segments cannot be modified afterwards.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{Segment, VoiceConfig};

/// Errors raised when building a segment store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Segment indices must be 0, 1, 2, ... in order.
    #[error("Segment at position {position} has index {found}, expected {position}")]
    NonDenseIndex { position: usize, found: usize },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Immutable ordered list of segments, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Arc<[Segment]>,
}

impl SegmentStore {
    /// Build a store, validating index density and order.
    pub fn new(segments: Vec<Segment>) -> StoreResult<Self> {
        for (position, segment) in segments.iter().enumerate() {
            if segment.index != position {
                return Err(StoreError::NonDenseIndex {
                    position,
                    found: segment.index,
                });
            }
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    /// Build a store where segment `i` narrates frame `i`.
    pub fn from_texts<I, S>(texts: I, voice: &VoiceConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<Segment> = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Segment::new(i, i, text, voice.clone()))
            .collect();
        Self {
            segments: segments.into(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Highest target frame referenced, if any.
    pub fn max_target_frame(&self) -> Option<usize> {
        self.segments.iter().map(|s| s.target_frame).max()
    }
}
