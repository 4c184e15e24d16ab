//! Standard pipeline steps.

mod assemble;
mod export;
mod synthesize;

pub use assemble::AssembleStep;
pub use export::ExportStep;
pub use synthesize::SynthesizeStep;
