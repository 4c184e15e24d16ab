//! Error types for the run pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::export::ExportError;
use crate::scheduler::GapError;
use crate::timeline::AlignmentError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Inputs were rejected before any step ran.
    #[error("Run '{run_name}' failed validation: {message}")]
    ValidationFailed { run_name: String, message: String },

    /// The run was cancelled.
    #[error("Run '{run_name}' was cancelled")]
    Cancelled { run_name: String },

    /// Failed to set up the run (directories, logger, cache).
    #[error("Run '{run_name}' setup failed: {message}")]
    SetupFailed { run_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn validation_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(run_name: impl Into<String>) -> Self {
        Self::Cancelled {
            run_name: run_name.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// Synthesis left gaps the configured policy does not accept.
    #[error(transparent)]
    Gap(#[from] GapError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A previous step did not record its output.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::precondition_failed("no synthesis output");
        let pipeline_err = PipelineError::step_failed("lecture_01", "Assemble", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("lecture_01"));
        assert!(msg.contains("Assemble"));
        assert!(msg.contains("no synthesis output"));
    }

    #[test]
    fn alignment_errors_convert() {
        let err: StepError = AlignmentError::TargetOutOfRange {
            targets: vec![(2, 5)],
            frame_count: 3,
        }
        .into();
        assert!(matches!(err, StepError::Alignment(_)));
        assert!(err.to_string().contains("0..3"));
    }

    #[test]
    fn cancelled_is_recognised() {
        assert!(PipelineError::cancelled("x").is_cancelled());
        assert!(!PipelineError::setup_failed("x", "no dir").is_cancelled());
    }
}
