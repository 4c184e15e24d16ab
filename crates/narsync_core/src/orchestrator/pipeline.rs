//! Pipeline runner that executes steps in sequence.

use std::time::Instant;

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, RunState, StepOutcome};

/// Ordered sequence of steps.
///
/// Steps run one after another with validation before and after each.
/// Cancellation (through `Context::cancel`) is checked at every step
/// boundary; a step failing while the run is cancelled is reported as
/// `PipelineError::Cancelled`.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run every step against `ctx`, recording outputs in `state`.
    pub fn run(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        let total_steps = self.steps.len();

        for (i, step) in self.steps.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step.name()));
                return Err(PipelineError::cancelled(&ctx.run_name));
            }

            let step_name = step.name();
            ctx.logger.phase(step_name);

            let percent = ((i as f64 / total_steps as f64) * 100.0) as u32;
            ctx.report_progress(step_name, percent, step.description());

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(&ctx.run_name, step_name, e));
            }

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            let started = Instant::now();
            let outcome = match step.execute(ctx, state) {
                Ok(outcome) => outcome,
                Err(_) if ctx.cancel.is_cancelled() => {
                    ctx.logger
                        .warn(&format!("Pipeline cancelled during step '{}'", step_name));
                    return Err(PipelineError::cancelled(&ctx.run_name));
                }
                Err(e) => {
                    ctx.logger.error(&format!("Execution failed: {}", e));
                    return Err(PipelineError::step_failed(&ctx.run_name, step_name, e));
                }
            };

            result
                .step_timings
                .push((step_name.to_string(), started.elapsed().as_secs_f64()));

            match outcome {
                StepOutcome::Success => {
                    ctx.logger
                        .debug(&format!("Validating output for '{}'", step_name));
                    if let Err(e) = step.validate_output(ctx, state) {
                        ctx.logger.error(&format!("Output validation failed: {}", e));
                        return Err(PipelineError::step_failed(&ctx.run_name, step_name, e));
                    }

                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }
        }

        ctx.report_progress("Complete", 100, "Pipeline finished");
        ctx.logger.success("Pipeline completed successfully");

        Ok(result)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
    /// Wall time of each executed step, in seconds.
    pub step_timings: Vec<(String, f64)>,
}

impl PipelineRunResult {
    /// True when no step was skipped.
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::errors::{StepError, StepResult};
    use crate::orchestrator::test_support::context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct CountingStep {
        name: &'static str,
        execute_count: Arc<AtomicUsize>,
        skip: bool,
    }

    impl CountingStep {
        fn new(name: &'static str, counter: &Arc<AtomicUsize>) -> Self {
            Self {
                name,
                execute_count: Arc::clone(counter),
                skip: false,
            }
        }
    }

    impl PipelineStep for CountingStep {
        fn name(&self) -> &str {
            self.name
        }

        fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut RunState) -> StepResult<StepOutcome> {
            self.execute_count.fetch_add(1, Ordering::SeqCst);
            if self.skip {
                Ok(StepOutcome::Skipped("not needed".to_string()))
            } else {
                Ok(StepOutcome::Success)
            }
        }

        fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }
    }

    struct FailingStep;

    impl PipelineStep for FailingStep {
        fn name(&self) -> &str {
            "Broken"
        }

        fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut RunState) -> StepResult<StepOutcome> {
            Err(StepError::other("boom"))
        }

        fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn pipeline_builds_correctly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", &counter))
            .with_step(CountingStep::new("Step2", &counter));

        assert_eq!(pipeline.step_count(), 2);
        assert_eq!(pipeline.step_names(), vec!["Step1", "Step2"]);
    }

    #[test]
    fn runs_steps_in_order_and_records_skips() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), &["a"], 1);
        let counter = Arc::new(AtomicUsize::new(0));
        let mut skipped = CountingStep::new("Second", &counter);
        skipped.skip = true;
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("First", &counter))
            .with_step(skipped);

        let result = pipeline.run(&ctx, &mut RunState::new("r")).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(result.steps_completed, vec!["First"]);
        assert_eq!(result.steps_skipped, vec!["Second"]);
        assert!(!result.all_completed());
        assert_eq!(result.total_steps(), 2);
        let timed: Vec<&str> = result.step_timings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(timed, vec!["First", "Second"]);
    }

    #[test]
    fn failure_names_run_and_step() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), &["a"], 1);
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(FailingStep)
            .with_step(CountingStep::new("After", &counter));

        let err = pipeline.run(&ctx, &mut RunState::new("r")).unwrap_err();

        assert!(matches!(
            &err,
            PipelineError::StepFailed { step_name, .. } if step_name == "Broken"
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancelled_run_stops_before_next_step() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), &["a"], 1);
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new().with_step(CountingStep::new("Only", &counter));

        ctx.cancel.cancel();
        let err = pipeline.run(&ctx, &mut RunState::new("r")).unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
