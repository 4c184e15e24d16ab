//! Bounded-concurrency synthesis with strict-order release.
//!
//! Cache hits complete immediately. Misses are queued in index order and
//! pulled by a fixed pool of worker threads; each worker drives a
//! [`SynthesisJob`] through its retry state machine. Completions arrive in
//! any order over a channel and pass through a [`ReorderBuffer`], so results
//! are released strictly by ascending segment index.
//!
//! Segments sharing a cache key are synthesized once: the lowest index is
//! dispatched and the others reuse its outcome.

mod job;
mod reorder;
mod report;

pub use job::{JobState, SynthesisJob};
pub use reorder::ReorderBuffer;
pub use report::{
    GapError, ResolvedNarration, SegmentFailure, SegmentOutcome, SegmentResult, SynthesisReport,
};

use std::collections::{HashMap, VecDeque};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::{CacheKey, SynthesisCache};
use crate::cancel::CancelHandle;
use crate::config::SynthesisSettings;
use crate::models::{AudioArtifact, Segment};
use crate::store::SegmentStore;
use crate::synth::{RetryPolicy, SynthesisError, SynthesisRequest, Synthesizer};

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Worker pool size.
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Budget for a single synthesizer call.
    pub attempt_timeout: Duration,
    /// Artifacts shorter than this count as failed synthesis.
    pub min_audio_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SynthesisSettings::default())
    }
}

impl From<&SynthesisSettings> for SchedulerConfig {
    fn from(settings: &SynthesisSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            retry: RetryPolicy::from(settings),
            attempt_timeout: settings.attempt_timeout(),
            min_audio_secs: settings.min_audio_secs,
        }
    }
}

/// Where a segment's outcome comes from.
enum Plan {
    /// Outcome already known (cache hit).
    Ready(SegmentOutcome),
    /// Dispatched to the worker pool.
    Dispatch,
    /// Reuses the outcome of an earlier segment with the same key.
    Follow(usize),
}

/// Drives synthesis for a segment store.
pub struct SynthesisScheduler {
    synthesizer: Arc<dyn Synthesizer>,
    /// Cache namespace of `synthesizer`, resolved once per scheduler.
    namespace: String,
    cache: Option<Arc<SynthesisCache>>,
    config: SchedulerConfig,
    cancel: CancelHandle,
}

impl SynthesisScheduler {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, config: SchedulerConfig) -> Self {
        Self {
            namespace: synthesizer.cache_namespace(),
            synthesizer,
            cache: None,
            config,
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<SynthesisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Synthesize every segment and return ordered per-index outcomes.
    pub fn synthesize_all(&self, store: &SegmentStore) -> SynthesisReport {
        self.synthesize_each(store, |_| {})
    }

    /// Like [`synthesize_all`](Self::synthesize_all), calling `on_release`
    /// for each result as soon as it is released in index order.
    pub fn synthesize_each<F>(&self, store: &SegmentStore, mut on_release: F) -> SynthesisReport
    where
        F: FnMut(&SegmentResult),
    {
        let segments = store.segments();
        let plans = self.plan(segments);

        let queue: VecDeque<usize> = plans
            .iter()
            .enumerate()
            .filter(|(_, plan)| matches!(plan, Plan::Dispatch))
            .map(|(i, _)| i)
            .collect();
        let dispatched = queue.len();
        let worker_count = self.config.workers.max(1).min(dispatched);

        tracing::info!(
            "Synthesizing {} segment(s) with {}: {} to dispatch on {} worker(s)",
            segments.len(),
            self.synthesizer.name(),
            dispatched,
            worker_count
        );

        let mut buffer = ReorderBuffer::new(segments.len());
        let mut released = Vec::with_capacity(segments.len());
        let mut hits: HashMap<usize, SegmentOutcome> = HashMap::new();
        let mut followers: HashMap<usize, Vec<usize>> = HashMap::new();

        for (index, plan) in plans.into_iter().enumerate() {
            match plan {
                Plan::Ready(outcome) => {
                    hits.insert(index, outcome);
                }
                Plan::Follow(leader) => followers.entry(leader).or_default().push(index),
                Plan::Dispatch => {}
            }
        }

        // Followers of cache hits resolve now; dispatched leaders resolve on completion
        for (index, outcome) in hits {
            if let Some(follower_list) = followers.remove(&index) {
                fan_out(&mut buffer, &follower_list, &outcome);
            }
            buffer.insert(index, SegmentResult { segment_index: index, outcome });
        }
        release(&mut buffer, &mut released, &mut on_release);

        let queue = Mutex::new(queue);
        let (tx, rx) = mpsc::channel::<(usize, SegmentOutcome)>();

        thread::scope(|scope| {
            for worker in 0..worker_count {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    tracing::trace!("Synthesis worker {} started", worker);
                    loop {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let Some(index) = queue.lock().pop_front() else {
                            break;
                        };
                        let outcome = self.run_job(&segments[index]);
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (index, outcome) in rx {
                if let Some(follower_list) = followers.remove(&index) {
                    fan_out(&mut buffer, &follower_list, &outcome);
                }
                buffer.insert(index, SegmentResult { segment_index: index, outcome });
                release(&mut buffer, &mut released, &mut on_release);
            }
        });

        // Anything still queued was never dispatched
        for index in queue.into_inner() {
            buffer.insert(
                index,
                SegmentResult {
                    segment_index: index,
                    outcome: SegmentOutcome::Cancelled,
                },
            );
            if let Some(follower_list) = followers.remove(&index) {
                fan_out(&mut buffer, &follower_list, &SegmentOutcome::Cancelled);
            }
        }
        release(&mut buffer, &mut released, &mut on_release);

        let report = SynthesisReport::new(released);
        tracing::info!(
            "Synthesis finished: {} synthesized, {} reused, {} failed, {} cancelled",
            report.synthesized_count(),
            report.cached_count(),
            report.failures().len(),
            report.cancelled_count()
        );
        report
    }

    /// Decide per segment: cache hit, dispatch, or follow an identical sibling.
    fn plan(&self, segments: &[Segment]) -> Vec<Plan> {
        let mut leaders: HashMap<CacheKey, usize> = HashMap::new();
        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let key = CacheKey::for_segment(&self.namespace, segment);
                if let Some(&leader) = leaders.get(&key) {
                    return Plan::Follow(leader);
                }
                leaders.insert(key.clone(), index);

                match self.cache.as_ref().and_then(|cache| cache.get(&key)) {
                    Some(artifact) if artifact.has_valid_duration(self.config.min_audio_secs) => {
                        tracing::debug!("Segment {} served from cache ({})", index, key);
                        Plan::Ready(SegmentOutcome::Cached {
                            artifact: artifact.rebind(index),
                        })
                    }
                    _ => Plan::Dispatch,
                }
            })
            .collect()
    }

    /// Run one segment through its retry loop on the current thread.
    fn run_job(&self, segment: &Segment) -> SegmentOutcome {
        let mut job = SynthesisJob::new(segment.index);

        loop {
            if self.cancel.is_cancelled() {
                return SegmentOutcome::Cancelled;
            }

            let attempt = job.start();
            let request = SynthesisRequest {
                segment_index: segment.index,
                text: &segment.text,
                voice: &segment.voice,
                attempt,
                timeout: self.config.attempt_timeout,
            };

            match self.attempt(&request) {
                Ok(artifact) => {
                    job.succeed();
                    self.store_in_cache(segment, &artifact);
                    tracing::debug!(
                        "Segment {} synthesized in {} attempt(s): {:.3}s",
                        segment.index,
                        attempt,
                        artifact.duration_secs
                    );
                    return SegmentOutcome::Synthesized {
                        artifact,
                        attempts: attempt,
                    };
                }
                Err(error) => match job.fail(error.clone(), &self.config.retry) {
                    Some(delay) => {
                        tracing::warn!(
                            "Segment {} attempt {} failed ({}), retrying in {}ms",
                            segment.index,
                            attempt,
                            error,
                            delay.as_millis()
                        );
                        if !self.cancel.sleep(delay) {
                            return SegmentOutcome::Cancelled;
                        }
                        job.retry();
                    }
                    None => {
                        tracing::warn!(
                            "Segment {} failed after {} attempt(s): {}",
                            segment.index,
                            attempt,
                            error
                        );
                        return SegmentOutcome::Failed {
                            error,
                            attempts: attempt,
                        };
                    }
                },
            }
        }
    }

    /// One synthesizer call, with timeout and duration checks applied.
    fn attempt(&self, request: &SynthesisRequest<'_>) -> Result<AudioArtifact, SynthesisError> {
        let started = Instant::now();
        let artifact = self.synthesizer.synthesize(request)?;

        // Late results are discarded so they never reach the cache
        if started.elapsed() > request.timeout {
            return Err(SynthesisError::Timeout(request.timeout));
        }
        if !artifact.has_valid_duration(self.config.min_audio_secs) {
            return Err(SynthesisError::InvalidDuration {
                duration_secs: artifact.duration_secs,
            });
        }
        Ok(artifact.rebind(request.segment_index))
    }

    fn store_in_cache(&self, segment: &Segment, artifact: &AudioArtifact) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.put(&CacheKey::for_segment(&self.namespace, segment), artifact) {
            tracing::warn!("Failed to cache segment {}: {}", segment.index, e);
        }
    }
}

/// Give each follower a copy of the leader's outcome, rebound to its index.
fn fan_out(
    buffer: &mut ReorderBuffer<SegmentResult>,
    followers: &[usize],
    outcome: &SegmentOutcome,
) {
    for &index in followers {
        let outcome = match outcome {
            SegmentOutcome::Synthesized { artifact, .. } | SegmentOutcome::Cached { artifact } => {
                SegmentOutcome::Cached {
                    artifact: artifact.rebind(index),
                }
            }
            SegmentOutcome::Failed { error, .. } => SegmentOutcome::Failed {
                error: error.clone(),
                attempts: 0,
            },
            SegmentOutcome::Cancelled => SegmentOutcome::Cancelled,
        };
        buffer.insert(index, SegmentResult { segment_index: index, outcome });
    }
}

fn release<F>(buffer: &mut ReorderBuffer<SegmentResult>, released: &mut Vec<SegmentResult>, on_release: &mut F)
where
    F: FnMut(&SegmentResult),
{
    for result in buffer.drain_ready() {
        on_release(&result);
        released.push(result);
    }
}
