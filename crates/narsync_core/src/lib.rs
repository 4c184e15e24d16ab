//! Narration Sync Core - turns narration segments into a slide-synchronized timeline.
//!
//! This crate contains the synchronization engine with zero UI dependencies:
//! segment storage, a content-addressed synthesis cache, a bounded-concurrency
//! synthesis scheduler with in-order release, and the timeline assembler that
//! reconciles narration segments against slide frames.
//! It can be used by the CLI or embedded in another front end.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod export;
pub mod frames;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod scheduler;
pub mod script;
pub mod store;
pub mod synth;
pub mod timeline;
pub mod workspace;

pub use cancel::CancelHandle;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
