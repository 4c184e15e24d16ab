//! Pipeline orchestrator for narration runs.
//!
//! A run is a sequence of steps that validate, execute and record their
//! results in a shared [`RunState`].
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Synthesize   segments -> ordered audio (cache, retries, gap policy)
//!     ├── Step: Assemble     audio + frame count -> timeline
//!     └── Step: Export       timeline + frame images -> compositor bundle
//! ```
//!
//! # Example
//!
//! ```ignore
//! let ctx = Context::new(store, settings, "lecture_01", work_dir, output_dir, logger, synth, frames)
//!     .with_compositor(Arc::new(ManifestCompositor::new(&output_dir)));
//! let mut state = RunState::new("lecture_01");
//!
//! let result = create_standard_pipeline().run(&ctx, &mut state)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use runner::{NarrationRunner, RunInputs, RunSummary};
pub use step::PipelineStep;
pub use steps::{AssembleStep, ExportStep, SynthesizeStep};
pub use types::{
    AssembleOutput, Context, ProgressCallback, RunState, StepOutcome, SynthesisOutput,
};

/// Create the standard pipeline: Synthesize → Assemble → Export.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(SynthesizeStep::new())
        .with_step(AssembleStep::new())
        .with_step(ExportStep::new())
}
