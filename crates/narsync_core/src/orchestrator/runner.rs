//! Runs a narration job end to end.
//!
//! [`NarrationRunner`] owns the settings and the process-scoped synthesis
//! cache, so consecutive runs reuse each other's audio.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheResult, SynthesisCache};
use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::export::ManifestCompositor;
use crate::frames::FrameSource;
use crate::logging::{LogCallback, LogConfig, RunLogger};
use crate::scheduler::GapError;
use crate::store::SegmentStore;
use crate::synth::Synthesizer;

use super::errors::{PipelineError, StepError};
use super::types::{Context, ProgressCallback, RunState};
use super::{create_standard_pipeline, PipelineRunResult};

/// What a run narrates, onto which frames, with which voice engine.
pub struct RunInputs {
    pub store: SegmentStore,
    pub frames: Arc<dyn FrameSource>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_name: String,
    pub success: bool,
    pub cancelled: bool,
    pub error: Option<String>,
    /// Compositor bundle directory (if exported).
    pub output_dir: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
    pub segments: usize,
    /// Segments produced by a synthesizer call.
    pub synthesized: usize,
    /// Segments reused from the cache or an identical sibling.
    pub cached: usize,
    /// Segments whose synthesis terminally failed.
    pub failed_segments: Vec<usize>,
    /// Failed segments dropped from the timeline.
    pub skipped_segments: Vec<usize>,
    /// Failed segments replaced by silence.
    pub silenced_segments: Vec<usize>,
    /// Frames shown without narration.
    pub padded_frames: Vec<usize>,
    /// Timeline length in seconds.
    pub total_duration: f64,
    /// Wall time per step, in seconds.
    pub step_timings: Vec<(String, f64)>,
}

impl RunSummary {
    fn failure(run_name: &str, error: impl Into<String>) -> Self {
        Self {
            run_name: run_name.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Fill counts from whatever the steps recorded.
    fn absorb(&mut self, state: &RunState) {
        if let Some(synthesis) = &state.synthesis {
            self.synthesized = synthesis.report.synthesized_count();
            self.cached = synthesis.report.cached_count();
            self.failed_segments = synthesis
                .report
                .failures()
                .iter()
                .map(|f| f.segment_index)
                .collect();
            self.skipped_segments = synthesis.narration.skipped.clone();
            self.silenced_segments = synthesis.narration.silenced.clone();
        }
        if let Some(assembly) = &state.assembly {
            self.padded_frames = assembly.timeline.padded_frames();
            self.total_duration = assembly.timeline.total_duration();
        }
        if let Some(export) = &state.export {
            self.output_dir = Some(export.output_dir.clone());
        }
    }

    fn absorb_steps(&mut self, run_result: PipelineRunResult) {
        self.steps_completed = run_result.steps_completed;
        self.steps_skipped = run_result.steps_skipped;
        self.step_timings = run_result.step_timings;
    }
}

/// Runs inputs through the standard pipeline.
pub struct NarrationRunner {
    settings: Settings,
    cache: Option<Arc<SynthesisCache>>,
}

impl NarrationRunner {
    /// Create a runner, opening the cache described by `settings`.
    pub fn new(settings: Settings) -> CacheResult<Self> {
        let cache = SynthesisCache::from_settings(&settings.cache, &settings.paths)?.map(Arc::new);
        Ok(Self::with_cache(settings, cache))
    }

    /// Create a runner sharing an existing cache (or none).
    pub fn with_cache(settings: Settings, cache: Option<Arc<SynthesisCache>>) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&Arc<SynthesisCache>> {
        self.cache.as_ref()
    }

    /// Scratch and output directories for `run_name`.
    pub fn run_dirs(&self, run_name: &str) -> (PathBuf, PathBuf) {
        let paths = &self.settings.paths;
        (
            PathBuf::from(&paths.work_folder).join(run_name),
            PathBuf::from(&paths.output_folder).join(run_name),
        )
    }

    /// Run one narration job.
    ///
    /// Never panics on pipeline failure; the error and whatever was
    /// produced before it are in the returned summary.
    pub fn run(
        &self,
        run_name: &str,
        inputs: RunInputs,
        cancel: &CancelHandle,
        log_callback: Option<LogCallback>,
        progress_callback: Option<ProgressCallback>,
    ) -> RunSummary {
        let problems = self.settings.validate();
        if !problems.is_empty() {
            let err = PipelineError::validation_failed(run_name, problems.join("; "));
            return RunSummary::failure(run_name, err.to_string());
        }

        let (work_dir, output_dir) = self.run_dirs(run_name);
        if let Err(e) = std::fs::create_dir_all(&work_dir) {
            let err = PipelineError::setup_failed(
                run_name,
                format!("Failed to create work directory: {}", e),
            );
            return RunSummary::failure(run_name, err.to_string());
        }

        let logger = match RunLogger::new(
            run_name,
            &self.settings.paths.logs_folder,
            LogConfig::from(&self.settings.logging),
            log_callback,
        ) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                let err =
                    PipelineError::setup_failed(run_name, format!("Failed to create logger: {}", e));
                return RunSummary::failure(run_name, err.to_string());
            }
        };

        let mut summary = RunSummary {
            run_name: run_name.to_string(),
            segments: inputs.store.len(),
            log_path: Some(logger.log_path().to_path_buf()),
            ..Default::default()
        };

        logger.info(&format!("Starting run: {}", run_name));
        logger.info(&format!(
            "{} segment(s), {} frame(s), synthesizer '{}'",
            inputs.store.len(),
            inputs.frames.frame_count(),
            inputs.synthesizer.name()
        ));

        let mut ctx = Context::new(
            inputs.store,
            self.settings.clone(),
            run_name,
            work_dir,
            output_dir.clone(),
            Arc::clone(&logger),
            inputs.synthesizer,
            inputs.frames,
        )
        .with_compositor(Arc::new(ManifestCompositor::new(output_dir)))
        .with_cancel(cancel.clone());
        if let Some(cache) = &self.cache {
            ctx = ctx.with_cache(Arc::clone(cache));
        }
        if let Some(callback) = progress_callback {
            ctx = ctx.with_progress_callback(callback);
        }

        let mut state = RunState::new(run_name);
        let pipeline = create_standard_pipeline();

        match pipeline.run(&ctx, &mut state) {
            Ok(run_result) => {
                summary.success = true;
                summary.absorb_steps(run_result);
                summary.absorb(&state);
                logger.success(&format!(
                    "Run completed: {:.2}s timeline, {} padded frame(s)",
                    summary.total_duration,
                    summary.padded_frames.len()
                ));
            }
            Err(e) => {
                summary.absorb(&state);
                summary.cancelled = e.is_cancelled();
                if let PipelineError::StepFailed {
                    source: StepError::Gap(GapError::SegmentsFailed { failures }),
                    ..
                } = &e
                {
                    summary.failed_segments = failures.iter().map(|f| f.segment_index).collect();
                }
                logger.error(&e.to_string());
                if !summary.cancelled {
                    logger.show_tail("run");
                }
                summary.error = Some(e.to_string());
            }
        }

        logger.close();
        summary
    }
}
