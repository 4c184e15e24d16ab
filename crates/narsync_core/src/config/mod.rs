//! Configuration management for Narration Sync.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation of the values the scheduler and assembler depend on
//!
//! Every knob the synchronization engine uses (worker count, retry ceiling,
//! backoff, per-attempt timeout, padding, gap policy) lives here with an
//! explicit default written to the file on first run.
//!
//! # Example
//!
//! ```no_run
//! use narsync_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/narsync.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Workers: {}", config.settings().synthesis.workers);
//!
//! config.settings_mut().synthesis.workers = 8;
//! config.update_section(ConfigSection::Synthesis).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CacheSettings, ConfigSection, LoggingSettings, PathSettings, ScriptSettings, Settings,
    SynthesisSettings, TimelineSettings,
};
