//! Export step - hands the timeline and frame images to the compositor.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

pub struct ExportStep;

impl ExportStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExportStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExportStep {
    fn name(&self) -> &str {
        "Export"
    }

    fn description(&self) -> &str {
        "Write the timeline for the compositor"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let Some(compositor) = &ctx.compositor else {
            return Ok(StepOutcome::Skipped("No compositor configured".to_string()));
        };

        let timeline = &state
            .assembly
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Timeline has not been assembled"))?
            .timeline;

        ctx.logger
            .info(&format!("Exporting with '{}' compositor", compositor.name()));
        let output = compositor.compose(timeline, ctx.frames.as_ref())?;
        ctx.logger
            .info(&format!("Timeline written to {}", output.manifest_path.display()));

        state.export = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let output = state
            .export
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Export output not recorded"))?;

        if let Some(missing) = output.audio_files.iter().find(|p| !p.exists()) {
            return Err(StepError::invalid_output(format!(
                "Audio file missing: {}",
                missing.display()
            )));
        }
        if !output.manifest_path.exists() {
            return Err(StepError::invalid_output(format!(
                "Manifest missing: {}",
                output.manifest_path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ManifestCompositor;
    use crate::orchestrator::steps::{AssembleStep, SynthesizeStep};
    use crate::orchestrator::test_support::context;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn skips_without_compositor() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), &["a"], 1);
        let outcome = ExportStep::new()
            .execute(&ctx, &mut RunState::new("r"))
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
    }

    #[test]
    fn writes_bundle_through_compositor() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let ctx = context(dir.path(), &["a", "b"], 2)
            .with_compositor(Arc::new(ManifestCompositor::new(&out)));
        let mut state = RunState::new("r");

        SynthesizeStep::new().execute(&ctx, &mut state).unwrap();
        AssembleStep::new().execute(&ctx, &mut state).unwrap();
        let step = ExportStep::new();
        assert_eq!(step.execute(&ctx, &mut state).unwrap(), StepOutcome::Success);
        step.validate_output(&ctx, &state).unwrap();

        assert!(out.join("timeline.json").exists());
        assert_eq!(state.export.unwrap().audio_files.len(), 2);
    }
}
