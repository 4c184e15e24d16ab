//! Synthesize step - turns every segment into audio.
//!
//! Runs the scheduler over the context's segment store, logs each segment
//! as it is released in order, then applies the configured gap policy.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, SynthesisOutput};
use crate::scheduler::{SchedulerConfig, SegmentOutcome, SynthesisScheduler};
use crate::timeline::TimelineAssembler;

pub struct SynthesizeStep;

impl SynthesizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SynthesizeStep {
    fn name(&self) -> &str {
        "Synthesize"
    }

    fn description(&self) -> &str {
        "Synthesize narration audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.store.is_empty() {
            return Err(StepError::invalid_input("No narration segments to synthesize"));
        }
        // A script that outruns the deck fails here, before any synthesis is paid for
        TimelineAssembler::check_targets(ctx.store.segments(), ctx.frames.frame_count())?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let config = SchedulerConfig::from(&ctx.settings.synthesis);
        ctx.logger.info(&format!(
            "Synthesizing {} segment(s) with '{}' ({} worker(s), {} attempt(s) max)",
            ctx.store.len(),
            ctx.synthesizer.name(),
            config.workers,
            config.retry.max_attempts
        ));

        let mut scheduler = SynthesisScheduler::new(ctx.synthesizer.clone(), config)
            .with_cancel(ctx.cancel.clone());
        if let Some(cache) = &ctx.cache {
            scheduler = scheduler.with_cache(cache.clone());
        }

        let total = ctx.store.len();
        let mut released = 0usize;
        let report = scheduler.synthesize_each(&ctx.store, |result| {
            released += 1;
            match &result.outcome {
                SegmentOutcome::Synthesized { artifact, attempts } => ctx.logger.segment(
                    result.segment_index,
                    &format!("{:.2}s ({} attempt(s))", artifact.duration_secs, attempts),
                ),
                SegmentOutcome::Cached { artifact } => ctx.logger.segment(
                    result.segment_index,
                    &format!("{:.2}s (cached)", artifact.duration_secs),
                ),
                SegmentOutcome::Failed { error, attempts } => ctx.logger.warn(&format!(
                    "Segment {} failed after {} attempt(s): {}",
                    result.segment_index, attempts, error
                )),
                SegmentOutcome::Cancelled => {}
            }
            if ctx.logger.progress(released, total) {
                let percent = ((released as f64 / total as f64) * 100.0) as u32;
                ctx.report_progress(self.name(), percent, "Synthesizing");
            }
        });

        ctx.logger.info(&format!(
            "Synthesized {}, cached {}, failed {}, {} synthesizer call(s)",
            report.synthesized_count(),
            report.cached_count(),
            report.failures().len(),
            report.total_attempts()
        ));
        if let Some(cache) = &ctx.cache {
            let stats = cache.stats();
            ctx.logger.debug(&format!(
                "Cache: {} hit(s), {} miss(es), {} corrupt, {} in memory, {} on disk",
                stats.hits,
                stats.misses,
                stats.corrupt_entries,
                stats.memory_entries,
                stats.disk_entries
            ));
        }

        let timeline = &ctx.settings.timeline;
        let narration = report.resolve(&ctx.store, timeline.gap_policy, timeline.silence_secs)?;

        if !narration.silenced.is_empty() {
            ctx.logger.warn(&format!(
                "Replaced {} failed segment(s) with {:.1}s silence: {:?}",
                narration.silenced.len(),
                timeline.silence_secs,
                narration.silenced
            ));
        }
        if !narration.skipped.is_empty() {
            ctx.logger.warn(&format!(
                "Skipped {} failed segment(s): {:?}",
                narration.skipped.len(),
                narration.skipped
            ));
        }

        state.synthesis = Some(SynthesisOutput { report, narration });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let output = state
            .synthesis
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Synthesis results not recorded"))?;

        let accounted = output.narration.narrated.len() + output.narration.skipped.len();
        if accounted != ctx.store.len() {
            return Err(StepError::invalid_output(format!(
                "{} of {} segments accounted for",
                accounted,
                ctx.store.len()
            )));
        }
        Ok(())
    }
}
