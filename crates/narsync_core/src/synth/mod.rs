//! Speech synthesis boundary.
//!
//! The synthesizer itself is an external collaborator; this module defines
//! the trait the scheduler calls, the error classification that drives
//! retries, the backoff policy, and a subprocess-backed implementation.

mod command;
mod retry;

pub use command::CommandSynthesizer;
pub use retry::RetryPolicy;

use std::time::Duration;

use thiserror::Error;

use crate::models::{AudioArtifact, VoiceConfig};

/// Errors reported by a synthesizer, classified for retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The attempt exceeded its per-attempt timeout.
    #[error("Synthesis timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Rate limiting, service unavailable, network hiccup: worth retrying.
    #[error("Transient synthesis failure: {0}")]
    Transient(String),

    /// Malformed input or rejected request: retrying cannot help.
    #[error("Permanent synthesis failure: {0}")]
    Permanent(String),

    /// The synthesizer produced audio with an unusable duration.
    #[error("Synthesizer returned unusable duration {duration_secs}s")]
    InvalidDuration { duration_secs: f64 },
}

impl SynthesisError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SynthesisError::Timeout(_)
            | SynthesisError::Transient(_)
            | SynthesisError::InvalidDuration { .. } => true,
            SynthesisError::Permanent(_) => false,
        }
    }
}

/// Result type for synthesis calls.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// One synthesis attempt.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    /// Segment the audio is for.
    pub segment_index: usize,
    pub text: &'a str,
    pub voice: &'a VoiceConfig,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Budget for this attempt; implementations should stop at this point.
    pub timeout: Duration,
}

/// Text-to-speech backend.
///
/// Implementations are called concurrently from worker threads and may
/// block. They must report the measured duration of the produced audio,
/// not an estimate.
pub trait Synthesizer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Identity of the audio this backend produces, folded into cache keys.
    ///
    /// Two synthesizers must return different namespaces whenever they could
    /// produce different audio for the same text and voice.
    fn cache_namespace(&self) -> String {
        self.name().to_string()
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> SynthesisResult<AudioArtifact>;
}
