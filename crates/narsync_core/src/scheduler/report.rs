//! Ordered synthesis outcomes and gap policy resolution.

use thiserror::Error;

use crate::models::{AudioArtifact, GapPolicy, NarratedSegment};
use crate::store::SegmentStore;
use crate::synth::SynthesisError;

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    /// Produced by the synthesizer after `attempts` calls.
    Synthesized { artifact: AudioArtifact, attempts: u32 },
    /// Reused without a synthesizer call (cache hit or identical sibling).
    Cached { artifact: AudioArtifact },
    /// Terminal failure after `attempts` calls.
    Failed { error: SynthesisError, attempts: u32 },
    /// Never completed because the run was cancelled.
    Cancelled,
}

impl SegmentOutcome {
    pub fn artifact(&self) -> Option<&AudioArtifact> {
        match self {
            SegmentOutcome::Synthesized { artifact, .. } | SegmentOutcome::Cached { artifact } => {
                Some(artifact)
            }
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.artifact().is_some()
    }
}

/// Outcome for one segment index.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentResult {
    pub segment_index: usize,
    pub outcome: SegmentOutcome,
}

/// A terminal synthesis failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFailure {
    pub segment_index: usize,
    pub attempts: u32,
    pub error: SynthesisError,
}

/// Per-index outcomes in ascending segment order.
#[derive(Debug, Clone, Default)]
pub struct SynthesisReport {
    results: Vec<SegmentResult>,
}

impl SynthesisReport {
    pub(crate) fn new(results: Vec<SegmentResult>) -> Self {
        debug_assert!(results
            .iter()
            .enumerate()
            .all(|(i, r)| r.segment_index == i));
        Self { results }
    }

    pub fn results(&self) -> &[SegmentResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn synthesized_count(&self) -> usize {
        self.count(|o| matches!(o, SegmentOutcome::Synthesized { .. }))
    }

    pub fn cached_count(&self) -> usize {
        self.count(|o| matches!(o, SegmentOutcome::Cached { .. }))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, SegmentOutcome::Cancelled))
    }

    /// Synthesizer calls made across all segments.
    pub fn total_attempts(&self) -> u32 {
        self.results
            .iter()
            .map(|r| match r.outcome {
                SegmentOutcome::Synthesized { attempts, .. }
                | SegmentOutcome::Failed { attempts, .. } => attempts,
                _ => 0,
            })
            .sum()
    }

    /// Terminal failures in segment order.
    pub fn failures(&self) -> Vec<SegmentFailure> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                SegmentOutcome::Failed { error, attempts } => Some(SegmentFailure {
                    segment_index: r.segment_index,
                    attempts: *attempts,
                    error: error.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Every segment has audio.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    /// Apply the gap policy, pairing each surviving segment with its audio.
    ///
    /// - `Skip` drops failed segments (their frame may end up padded)
    /// - `Silence` substitutes `silence_secs` of silence
    /// - `Abort` fails with the full list of failures
    ///
    /// Cancelled segments always fail the resolution.
    pub fn resolve(
        &self,
        store: &SegmentStore,
        policy: GapPolicy,
        silence_secs: f64,
    ) -> Result<ResolvedNarration, GapError> {
        let cancelled = self.cancelled_count();
        if cancelled > 0 {
            return Err(GapError::Cancelled { pending: cancelled });
        }

        let failures = self.failures();
        if policy == GapPolicy::Abort && !failures.is_empty() {
            return Err(GapError::SegmentsFailed { failures });
        }

        let mut resolved = ResolvedNarration::default();
        for (segment, result) in store.iter().zip(&self.results) {
            match result.outcome.artifact() {
                Some(artifact) => resolved
                    .narrated
                    .push(NarratedSegment::new(segment.clone(), artifact.clone())),
                None if policy == GapPolicy::Silence => {
                    resolved.narrated.push(NarratedSegment::new(
                        segment.clone(),
                        AudioArtifact::silence(segment.index, silence_secs),
                    ));
                    resolved.silenced.push(segment.index);
                }
                None => resolved.skipped.push(segment.index),
            }
        }
        Ok(resolved)
    }

    fn count(&self, pred: impl Fn(&SegmentOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Narration ready for timeline assembly.
#[derive(Debug, Clone, Default)]
pub struct ResolvedNarration {
    /// Segments with audio, ascending index.
    pub narrated: Vec<NarratedSegment>,
    /// Failed segments dropped under `GapPolicy::Skip`.
    pub skipped: Vec<usize>,
    /// Failed segments replaced by silence under `GapPolicy::Silence`.
    pub silenced: Vec<usize>,
}

/// Reasons a report cannot be turned into narration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GapError {
    #[error("{} segment(s) failed synthesis: {}", failures.len(), describe(failures))]
    SegmentsFailed { failures: Vec<SegmentFailure> },

    #[error("Synthesis cancelled with {pending} segment(s) outstanding")]
    Cancelled { pending: usize },
}

fn describe(failures: &[SegmentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("#{} after {} attempt(s): {}", f.segment_index, f.attempts, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoiceConfig;

    fn store(n: usize) -> SegmentStore {
        SegmentStore::from_texts((0..n).map(|i| format!("text {}", i)), &VoiceConfig::default())
    }

    fn ok(i: usize, duration: f64) -> SegmentResult {
        SegmentResult {
            segment_index: i,
            outcome: SegmentOutcome::Synthesized {
                artifact: AudioArtifact::new(i, duration, "mp3", vec![1u8]),
                attempts: 1,
            },
        }
    }

    fn failed(i: usize) -> SegmentResult {
        SegmentResult {
            segment_index: i,
            outcome: SegmentOutcome::Failed {
                error: SynthesisError::permanent("rejected"),
                attempts: 1,
            },
        }
    }

    #[test]
    fn abort_lists_every_failure() {
        let report = SynthesisReport::new(vec![ok(0, 1.0), failed(1), failed(2)]);
        let err = report.resolve(&store(3), GapPolicy::Abort, 1.0).unwrap_err();

        match &err {
            GapError::SegmentsFailed { failures } => {
                let indices: Vec<_> = failures.iter().map(|f| f.segment_index).collect();
                assert_eq!(indices, vec![1, 2]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("#1"));
    }

    #[test]
    fn skip_drops_failed_segments() {
        let report = SynthesisReport::new(vec![ok(0, 1.0), failed(1), ok(2, 2.0)]);
        let resolved = report.resolve(&store(3), GapPolicy::Skip, 1.0).unwrap();

        let indices: Vec<_> = resolved.narrated.iter().map(|n| n.segment.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(resolved.skipped, vec![1]);
    }

    #[test]
    fn silence_substitutes_placeholder() {
        let report = SynthesisReport::new(vec![failed(0), ok(1, 2.0)]);
        let resolved = report.resolve(&store(2), GapPolicy::Silence, 1.5).unwrap();

        assert_eq!(resolved.narrated.len(), 2);
        assert!(resolved.narrated[0].artifact.is_silence());
        assert_eq!(resolved.narrated[0].artifact.duration_secs, 1.5);
        assert_eq!(resolved.silenced, vec![0]);
    }

    #[test]
    fn cancelled_never_resolves() {
        let report = SynthesisReport::new(vec![
            ok(0, 1.0),
            SegmentResult {
                segment_index: 1,
                outcome: SegmentOutcome::Cancelled,
            },
        ]);
        assert_eq!(
            report.resolve(&store(2), GapPolicy::Skip, 1.0).unwrap_err(),
            GapError::Cancelled { pending: 1 }
        );
    }

    #[test]
    fn counts() {
        let report = SynthesisReport::new(vec![
            ok(0, 1.0),
            SegmentResult {
                segment_index: 1,
                outcome: SegmentOutcome::Cached {
                    artifact: AudioArtifact::new(1, 1.0, "mp3", vec![1u8]),
                },
            },
            failed(2),
        ]);
        assert_eq!(report.synthesized_count(), 1);
        assert_eq!(report.cached_count(), 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.total_attempts(), 2);
        assert!(!report.is_complete());
    }
}
