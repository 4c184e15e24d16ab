//! Policy enums used by configuration and reconciliation.

use serde::{Deserialize, Serialize};

/// What to do with a segment whose synthesis terminally failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Drop the segment; its frame is padded if nothing else narrates it.
    Skip,
    /// Substitute silence of the configured duration.
    Silence,
    /// Fail the whole run with the list of failed segments.
    #[default]
    Abort,
}

impl std::fmt::Display for GapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapPolicy::Skip => write!(f, "skip"),
            GapPolicy::Silence => write!(f, "silence"),
            GapPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// How frame/segment count mismatches are handled by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePolicy {
    /// Pad unnarrated frames, concatenate segments sharing a frame.
    #[default]
    Reconcile,
    /// Require exactly one segment per frame; anything else is an alignment error.
    Strict,
}

impl std::fmt::Display for FramePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramePolicy::Reconcile => write!(f, "reconcile"),
            FramePolicy::Strict => write!(f, "strict"),
        }
    }
}
