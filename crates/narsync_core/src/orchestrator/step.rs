//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome};

/// A stage of a narration run.
///
/// The pipeline calls, in order:
///
/// 1. `validate_input` - check preconditions before execution
/// 2. `execute` - do the work and record results in [`RunState`]
/// 3. `validate_output` - only when `execute` returned `Success`
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging and error context).
    fn name(&self) -> &str;

    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    /// Perform the step's work.
    ///
    /// Returns `StepOutcome::Skipped` when the step decided not to run;
    /// that is not an error.
    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Whether this step may be skipped. Default is `false`.
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
