//! Per-segment synthesis job state machine.
//!
//! ```text
//! Pending -> InFlight -> Succeeded
//!                     -> Failed(retryable) -> Pending
//!                     -> Failed(terminal)
//! ```

use std::time::Duration;

use crate::synth::{RetryPolicy, SynthesisError};

/// Lifecycle state of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    InFlight,
    Succeeded,
    Failed {
        error: SynthesisError,
        terminal: bool,
    },
}

/// Mutable retry state for one segment.
///
/// Owned by the worker running it; never shared between threads.
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    segment_index: usize,
    attempt: u32,
    state: JobState,
}

impl SynthesisJob {
    pub fn new(segment_index: usize) -> Self {
        Self {
            segment_index,
            attempt: 0,
            state: JobState::Pending,
        }
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Pending -> InFlight. Returns the 1-based attempt number.
    pub fn start(&mut self) -> u32 {
        debug_assert_eq!(self.state, JobState::Pending, "start from {:?}", self.state);
        self.attempt += 1;
        self.state = JobState::InFlight;
        self.attempt
    }

    /// InFlight -> Succeeded.
    pub fn succeed(&mut self) {
        debug_assert_eq!(self.state, JobState::InFlight);
        self.state = JobState::Succeeded;
    }

    /// InFlight -> Failed.
    ///
    /// Returns the backoff delay when the failure is retryable under
    /// `policy`, `None` when it is terminal.
    pub fn fail(&mut self, error: SynthesisError, policy: &RetryPolicy) -> Option<Duration> {
        debug_assert_eq!(self.state, JobState::InFlight);
        let retryable = error.is_transient() && policy.allows_another(self.attempt);
        self.state = JobState::Failed {
            error,
            terminal: !retryable,
        };
        retryable.then(|| policy.delay_after(self.attempt))
    }

    /// Failed(retryable) -> Pending.
    pub fn retry(&mut self) {
        debug_assert!(matches!(self.state, JobState::Failed { terminal: false, .. }));
        self.state = JobState::Pending;
    }

    /// Whether no further transition is possible.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            JobState::Succeeded | JobState::Failed { terminal: true, .. }
        )
    }
}
