//! Assemble step - lays the narration onto the slide frames.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AssembleOutput, Context, RunState, StepOutcome};
use crate::timeline::{AssemblerConfig, TimelineAssembler};

pub struct AssembleStep;

impl AssembleStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AssembleStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AssembleStep {
    fn name(&self) -> &str {
        "Assemble"
    }

    fn description(&self) -> &str {
        "Align narration with slide frames"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.frames.frame_count() == 0 {
            return Err(StepError::invalid_input("Frame source has no frames"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let synthesis = state
            .synthesis
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Synthesis has not run"))?;

        let frame_count = ctx.frames.frame_count();
        let narrated = &synthesis.narration.narrated;
        if narrated.len() != frame_count {
            ctx.logger.info(&format!(
                "{} narrated segment(s) for {} frame(s), reconciling with '{}' policy",
                narrated.len(),
                frame_count,
                ctx.settings.timeline.frame_policy
            ));
        }

        let assembler = TimelineAssembler::new(AssemblerConfig::from(&ctx.settings.timeline));
        let timeline = assembler.assemble(narrated, frame_count)?;

        let padded = timeline.padded_frames();
        if !padded.is_empty() {
            ctx.logger.warn(&format!(
                "Padded {} frame(s) without narration to {:.1}s: {:?}",
                padded.len(),
                assembler.config().min_frame_secs,
                padded
            ));
        }
        ctx.logger.info(&format!(
            "Timeline: {} entries, {:.2}s total",
            timeline.len(),
            timeline.total_duration()
        ));

        state.assembly = Some(AssembleOutput { timeline });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let timeline = &state
            .assembly
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Timeline not recorded"))?
            .timeline;

        if timeline.len() != ctx.frames.frame_count() {
            return Err(StepError::invalid_output(format!(
                "Timeline has {} entries for {} frames",
                timeline.len(),
                ctx.frames.frame_count()
            )));
        }
        if !timeline.is_contiguous() {
            return Err(StepError::invalid_output("Timeline entries are not contiguous"));
        }
        Ok(())
    }
}
