//! Cooperative cancellation shared by the pipeline and the scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Handle for cancelling a running narration job.
///
/// Clones share the same flag. Cancellation is observed at step boundaries,
/// before each synthesis dispatch, and during retry backoff sleeps.
#[derive(Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any thread sleeping in `sleep`.
    pub fn cancel(&self) {
        let mut cancelled = self.state.cancelled.lock();
        *cancelled = true;
        self.state.wakeup.notify_all();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.state.cancelled.lock()
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.state.cancelled.lock();
        while !*cancelled {
            if self
                .state
                .wakeup
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return !*cancelled;
            }
        }
        false
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
