//! Per-run logger with file and callback output.
//!
//! Each narration run gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Filters synthesis progress in compact mode
//! - Keeps a tail buffer for error diagnosis
//!
//! The logger is shared by the scheduler's worker threads, so every piece of
//! mutable state sits behind a mutex.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger with dual output (file + callback).
pub struct RunLogger {
    /// Run name for identification.
    run_name: String,
    /// Path to log file.
    log_path: PathBuf,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Callback for echoing messages.
    callback: Option<LogCallback>,
    /// Logging configuration.
    config: LogConfig,
    /// Recent lines (shown after a failure).
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress percentage logged (for compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl RunLogger {
    /// Create a new run logger writing `<log_dir>/<run_name>.log`.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_name,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        })
    }

    /// Get the run name.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.remember(message);
        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a phase marker (one per pipeline step).
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a line about a single segment.
    ///
    /// Per-segment lines are debug-level in compact mode so large scripts do
    /// not flood the log; they still land in the tail buffer.
    pub fn segment(&self, index: usize, message: &str) {
        let line = MessagePrefix::Segment(index).format(message);
        if self.config.compact {
            self.remember(&line);
            self.log_untracked(LogLevel::Debug, &line);
        } else {
            self.log(LogLevel::Info, &line);
        }
    }

    /// Log synthesis progress as `done / total`.
    ///
    /// In compact mode only step boundaries (and completion) are written.
    /// Returns true if the progress line was logged.
    pub fn progress(&self, done: usize, total: usize) -> bool {
        let percent = if total == 0 {
            100
        } else {
            ((done as f64 / total as f64) * 100.0) as u32
        };

        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            let current_step = percent / step;
            let last_step = last.map(|p| p / step);

            if Some(current_step) <= last_step && percent < 100 {
                return false;
            }
            if *last == Some(100) {
                return false;
            }
            *last = Some(percent);
        }

        self.info(&format!("Progress: {}/{} ({}%)", done, total, percent));
        true
    }

    /// Show the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let lines: Vec<String> = self.tail_buffer.lock().iter().cloned().collect();
        if lines.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in &lines {
            self.output(&self.format_message(line));
        }
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn log_untracked(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&self.format_message(message));
    }

    fn remember(&self, line: &str) {
        if self.config.error_tail == 0 {
            return;
        }
        let mut buffer = self.tail_buffer.lock();
        if buffer.len() >= self.config.error_tail {
            buffer.pop_front();
        }
        buffer.push_back(line.to_string());
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
