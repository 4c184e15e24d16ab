//! Synthesizer backed by an external TTS command.
//!
//! The command is given the narration in a text file and must write the
//! audio to the requested output path. Duration is measured afterwards with
//! ffprobe, never estimated from text length.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::{SynthesisError, SynthesisRequest, SynthesisResult, Synthesizer};
use crate::config::SynthesisSettings;
use crate::models::AudioArtifact;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs a configured command once per attempt.
///
/// Argument placeholders: `{text_file}`, `{output}`, `{voice}`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    command: Vec<String>,
    work_dir: PathBuf,
    audio_format: String,
    permanent_exit_codes: Vec<i32>,
    /// Probe command; the audio path is appended. Must print ffprobe-style
    /// JSON with `format.duration`.
    probe: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(command: Vec<String>, work_dir: impl Into<PathBuf>) -> SynthesisResult<Self> {
        if command.is_empty() {
            return Err(SynthesisError::permanent("no synthesis command configured"));
        }
        let work_dir = work_dir.into();
        fs::create_dir_all(&work_dir).map_err(|e| {
            SynthesisError::permanent(format!(
                "cannot create synthesis work dir {}: {}",
                work_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            command,
            work_dir,
            audio_format: "mp3".to_string(),
            permanent_exit_codes: vec![2],
            probe: default_probe(),
        })
    }

    pub fn from_settings(settings: &SynthesisSettings, work_dir: impl Into<PathBuf>) -> SynthesisResult<Self> {
        Ok(Self::new(settings.command.clone(), work_dir)?
            .with_audio_format(settings.audio_format.clone())
            .with_permanent_exit_codes(settings.permanent_exit_codes.clone()))
    }

    pub fn with_audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self
    }

    pub fn with_permanent_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.permanent_exit_codes = codes;
        self
    }

    pub fn with_probe(mut self, probe: Vec<String>) -> Self {
        self.probe = probe;
        self
    }

    fn expand_args(&self, text_file: &Path, output: &Path, voice: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{text_file}", &text_file.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{voice}", voice)
            })
            .collect()
    }

    fn run_command(&self, args: &[String], stderr_path: &Path, timeout: Duration) -> SynthesisResult<()> {
        let stderr_file = File::create(stderr_path)
            .map_err(|e| SynthesisError::transient(format!("cannot create stderr log: {}", e)))?;

        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| SynthesisError::permanent(format!("failed to run {}: {}", args[0], e)))?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SynthesisError::Timeout(timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(SynthesisError::transient(format!("wait failed: {}", e)));
                }
            }
        };

        if status.success() {
            return Ok(());
        }

        let stderr = fs::read_to_string(stderr_path).unwrap_or_default();
        let message = format!(
            "{} exited with {}: {}",
            args[0],
            status.code().map_or("signal".to_string(), |c| c.to_string()),
            stderr.trim()
        );
        match status.code() {
            Some(code) if self.permanent_exit_codes.contains(&code) => {
                Err(SynthesisError::Permanent(message))
            }
            _ => Err(SynthesisError::Transient(message)),
        }
    }

    fn probe_duration(&self, audio: &Path) -> SynthesisResult<f64> {
        let Some((program, probe_args)) = self.probe.split_first() else {
            return Err(SynthesisError::permanent("no duration probe configured"));
        };
        let output = Command::new(program)
            .args(probe_args)
            .arg(audio)
            .output()
            .map_err(|e| SynthesisError::transient(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(SynthesisError::transient(format!(
                "{} failed: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_duration(&output.stdout)
    }
}

impl Synthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.command[0]
    }

    fn cache_namespace(&self) -> String {
        format!("{}|{}", self.command.join(" "), self.audio_format)
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> SynthesisResult<AudioArtifact> {
        let stem = format!("segment_{:04}_a{}", request.segment_index, request.attempt);
        let text_file = self.work_dir.join(format!("{}.txt", stem));
        let output = self.work_dir.join(format!("{}.{}", stem, self.audio_format));
        let stderr_path = self.work_dir.join(format!("{}.stderr", stem));

        fs::write(&text_file, request.text)
            .map_err(|e| SynthesisError::transient(format!("cannot write text file: {}", e)))?;

        let args = self.expand_args(&text_file, &output, request.voice.as_str());
        tracing::debug!("Synthesis command: {}", args.join(" "));

        let result = self
            .run_command(&args, &stderr_path, request.timeout)
            .and_then(|_| {
                let payload = fs::read(&output).map_err(|e| {
                    SynthesisError::transient(format!("command produced no audio: {}", e))
                })?;
                let duration = self.probe_duration(&output)?;
                Ok(AudioArtifact::new(
                    request.segment_index,
                    duration,
                    self.audio_format.clone(),
                    payload,
                ))
            });

        for path in [&text_file, &output, &stderr_path] {
            let _ = fs::remove_file(path);
        }
        result
    }
}

fn default_probe() -> Vec<String> {
    ["ffprobe", "-v", "error", "-show_entries", "format=duration", "-of", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Read `format.duration` from ffprobe JSON (a string in ffprobe output).
fn parse_probe_duration(stdout: &[u8]) -> SynthesisResult<f64> {
    let json: Value = serde_json::from_slice(stdout)
        .map_err(|e| SynthesisError::transient(format!("unreadable probe output: {}", e)))?;

    let duration = json.get("format").and_then(|f| f.get("duration"));
    let seconds = match duration {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };

    seconds.ok_or_else(|| SynthesisError::transient("probe output has no format.duration"))
}
