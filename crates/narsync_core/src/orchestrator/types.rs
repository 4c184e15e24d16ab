//! Context and state types for pipeline execution.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::SynthesisCache;
use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::export::{Compositor, ExportOutput};
use crate::frames::FrameSource;
use crate::logging::RunLogger;
use crate::models::Timeline;
use crate::scheduler::{ResolvedNarration, SynthesisReport};
use crate::store::SegmentStore;
use crate::synth::Synthesizer;

/// Progress callback: (step name, percent 0-100, message).
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Holds the run's inputs and collaborators. Mutable state goes in
/// [`RunState`].
pub struct Context {
    /// Narration to synthesize.
    pub store: SegmentStore,
    pub settings: Settings,
    /// Run name (used in error messages and file names).
    pub run_name: String,
    /// Scratch directory for this run.
    pub work_dir: PathBuf,
    /// Where the compositor writes its bundle.
    pub output_dir: PathBuf,
    pub logger: Arc<RunLogger>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub frames: Arc<dyn FrameSource>,
    /// Shared across runs in the same process; `None` disables caching.
    pub cache: Option<Arc<SynthesisCache>>,
    /// `None` skips the export step.
    pub compositor: Option<Arc<dyn Compositor>>,
    pub cancel: CancelHandle,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SegmentStore,
        settings: Settings,
        run_name: impl Into<String>,
        work_dir: PathBuf,
        output_dir: PathBuf,
        logger: Arc<RunLogger>,
        synthesizer: Arc<dyn Synthesizer>,
        frames: Arc<dyn FrameSource>,
    ) -> Self {
        Self {
            store,
            settings,
            run_name: run_name.into(),
            work_dir,
            output_dir,
            logger,
            synthesizer,
            frames,
            cache: None,
            compositor: None,
            cancel: CancelHandle::new(),
            progress_callback: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<SynthesisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_compositor(mut self, compositor: Arc<dyn Compositor>) -> Self {
        self.compositor = Some(compositor);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }
}

/// Output of the synthesize step.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Per-segment outcomes in index order.
    pub report: SynthesisReport,
    /// Narration after the gap policy was applied.
    pub narration: ResolvedNarration,
}

/// Output of the assemble step.
#[derive(Debug, Clone)]
pub struct AssembleOutput {
    pub timeline: Timeline,
}

/// Mutable state accumulated as the pipeline runs.
///
/// Each step writes its own output exactly once.
#[derive(Debug, Default)]
pub struct RunState {
    pub run_id: String,
    /// When the run started (RFC 3339).
    pub started_at: Option<String>,
    pub synthesis: Option<SynthesisOutput>,
    pub assembly: Option<AssembleOutput>,
    pub export: Option<ExportOutput>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn has_synthesis(&self) -> bool {
        self.synthesis.is_some()
    }

    pub fn has_assembly(&self) -> bool {
        self.assembly.is_some()
    }

    pub fn has_export(&self) -> bool {
        self.export.is_some()
    }
}

/// Result of a step's `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Step chose not to run; the reason is logged.
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_starts_empty() {
        let state = RunState::new("run-1");
        assert_eq!(state.run_id, "run-1");
        assert!(state.started_at.is_some());
        assert!(!state.has_synthesis());
        assert!(!state.has_assembly());
        assert!(!state.has_export());
    }
}
