//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{FramePolicy, GapPolicy, VoiceConfig};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Working, output, cache and log directories.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Synthesis scheduling and retry.
    #[serde(default)]
    pub synthesis: SynthesisSettings,

    /// Synthesis cache.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Timeline reconciliation.
    #[serde(default)]
    pub timeline: TimelineSettings,

    /// Narration script parsing.
    #[serde(default)]
    pub script: ScriptSettings,
}

impl Settings {
    /// Check values that would make the engine misbehave.
    ///
    /// Returns a list of human-readable problems (empty when valid).
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let s = &self.synthesis;
        if s.workers == 0 {
            problems.push("synthesis.workers must be at least 1".to_string());
        }
        if s.max_attempts == 0 {
            problems.push("synthesis.max_attempts must be at least 1".to_string());
        }
        if !(s.backoff_multiplier >= 1.0) {
            problems.push("synthesis.backoff_multiplier must be >= 1.0".to_string());
        }
        if s.attempt_timeout_ms == 0 {
            problems.push("synthesis.attempt_timeout_ms must be positive".to_string());
        }
        if !(s.min_audio_secs >= 0.0) {
            problems.push("synthesis.min_audio_secs must be >= 0".to_string());
        }
        let t = &self.timeline;
        if !(t.min_frame_secs > 0.0) || !t.min_frame_secs.is_finite() {
            problems.push("timeline.min_frame_secs must be positive".to_string());
        }
        if t.gap_policy == GapPolicy::Silence && (!(t.silence_secs > 0.0) || !t.silence_secs.is_finite())
        {
            problems.push("timeline.silence_secs must be positive with gap_policy = silence".to_string());
        }
        problems
    }
}

/// Path configuration for work, output, cache and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for intermediate per-run files.
    #[serde(default = "default_work_folder")]
    pub work_folder: String,

    /// Folder receiving the timeline manifest and concat scripts.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Folder for the persistent synthesis cache.
    #[serde(default = "default_cache_folder")]
    pub cache_folder: String,
}

fn default_work_folder() -> String {
    ".work".to_string()
}

fn default_output_folder() -> String {
    "narsync_output".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_cache_folder() -> String {
    ".cache/tts".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_folder: default_work_folder(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
            cache_folder: default_cache_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to run logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (progress filtered, tail on error).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of recent lines kept for the error tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// Synthesis scheduling, retry and timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Size of the synthesis worker pool.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Attempt ceiling per segment (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Factor applied to the delay after each retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single backoff delay, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Timeout for a single synthesis attempt, in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Artifacts shorter than this are treated as failed synthesis.
    #[serde(default = "default_min_audio_secs")]
    pub min_audio_secs: f64,

    /// Voice key used for every segment of a parsed script.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// External TTS command. Placeholders: `{text_file}`, `{output}`, `{voice}`.
    #[serde(default)]
    pub command: Vec<String>,

    /// File extension the command writes.
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Exit codes that mark a permanent (non-retryable) failure.
    #[serde(default = "default_permanent_exit_codes")]
    pub permanent_exit_codes: Vec<i32>,
}

fn default_workers() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_attempt_timeout_ms() -> u64 {
    60_000
}

fn default_min_audio_secs() -> f64 {
    0.05
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_permanent_exit_codes() -> Vec<i32> {
    vec![2]
}

impl SynthesisSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_max_ms: default_backoff_max_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            min_audio_secs: default_min_audio_secs(),
            voice: VoiceConfig::default(),
            command: Vec::new(),
            audio_format: default_audio_format(),
            permanent_exit_codes: default_permanent_exit_codes(),
        }
    }
}

/// Synthesis cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Use the cache at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Persist artifacts under `paths.cache_folder` across runs.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// In-memory entry cap (least recently used evicted first, 0 = unbounded).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    512
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            max_entries: default_max_entries(),
        }
    }
}

/// Timeline reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Display time for frames without narration, in seconds.
    #[serde(default = "default_min_frame_secs")]
    pub min_frame_secs: f64,

    /// Handling of segments whose synthesis failed.
    #[serde(default)]
    pub gap_policy: GapPolicy,

    /// Silence substituted for a failed segment with `gap_policy = silence`.
    #[serde(default = "default_silence_secs")]
    pub silence_secs: f64,

    /// Handling of frame/segment count mismatches.
    #[serde(default)]
    pub frame_policy: FramePolicy,
}

fn default_min_frame_secs() -> f64 {
    1.0
}

fn default_silence_secs() -> f64 {
    1.0
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            min_frame_secs: default_min_frame_secs(),
            gap_policy: GapPolicy::default(),
            silence_secs: default_silence_secs(),
            frame_policy: FramePolicy::default(),
        }
    }
}

/// Narration script parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Drop the first slide image (title slide without narration).
    #[serde(default = "default_true")]
    pub skip_first_slide: bool,

    /// Frame chunks of this many characters or fewer are discarded.
    #[serde(default = "default_min_frame_chars")]
    pub min_frame_chars: usize,
}

fn default_min_frame_chars() -> usize {
    50
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            skip_first_slide: true,
            min_frame_chars: default_min_frame_chars(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Synthesis,
    Cache,
    Timeline,
    Script,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Synthesis,
        ConfigSection::Cache,
        ConfigSection::Timeline,
        ConfigSection::Script,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Synthesis => "synthesis",
            ConfigSection::Cache => "cache",
            ConfigSection::Timeline => "timeline",
            ConfigSection::Script => "script",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Working, output, log and cache directories",
            ConfigSection::Logging => "# Logging configuration",
            ConfigSection::Synthesis => "# Speech synthesis: worker pool, retries, timeouts",
            ConfigSection::Cache => "# Synthesis cache",
            ConfigSection::Timeline => "# Slide/narration reconciliation",
            ConfigSection::Script => "# Narration script parsing",
        }
    }
}
