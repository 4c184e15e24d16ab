//! End-to-end runs: script file + slide directory -> timeline bundle.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::tempdir;

use narsync_core::config::Settings;
use narsync_core::export::TimelineDocument;
use narsync_core::frames::{FrameSource, ImageDirFrameSource};
use narsync_core::models::{AudioArtifact, GapPolicy};
use narsync_core::orchestrator::{NarrationRunner, RunInputs};
use narsync_core::script::{ParsedScript, ScriptParser};
use narsync_core::synth::{SynthesisError, SynthesisRequest, SynthesisResult, Synthesizer};
use narsync_core::CancelHandle;

const SCRIPT: &str = "# Distributed Systems, Lecture 1\n\
## Section 1: Opening\n\
*(2 frames)*\n\
**[Frame 1]**\n\
Welcome to the course on distributed systems, where we look at how machines cooperate.\n\
**[Frame 2]**\n\
Today we start with clocks, ordering of events and why wall time cannot be trusted.\n\
## Section 2: Wrap up\n\
**[Frame 1]**\n\
That concludes the overview; next time we look at consensus protocols in practice.\n";

/// Answers out of order: earlier segments sleep longer.
#[derive(Default)]
struct SlowFirstSynth {
    calls: AtomicUsize,
    /// Texts (by prefix) that fail with a permanent error.
    reject_prefix: Option<&'static str>,
    seen: Mutex<HashMap<usize, usize>>,
}

impl Synthesizer for SlowFirstSynth {
    fn name(&self) -> &str {
        "slow-first"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> SynthesisResult<AudioArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().entry(request.segment_index).or_insert(0) += 1;
        thread::sleep(Duration::from_millis(30u64.saturating_sub(request.segment_index as u64 * 10)));

        if let Some(prefix) = self.reject_prefix {
            if request.text.starts_with(prefix) {
                return Err(SynthesisError::permanent("unsupported characters"));
            }
        }
        Ok(AudioArtifact::new(
            request.segment_index,
            2.0 + request.segment_index as f64,
            "mp3",
            format!("audio:{}", request.segment_index).into_bytes(),
        ))
    }
}

fn write_deck(dir: &Path, slides: usize) {
    fs::create_dir_all(dir).unwrap();
    // title slide is skipped
    for i in 0..=slides {
        fs::write(dir.join(format!("slide_{}.png", i)), b"png").unwrap();
    }
}

fn settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.work_folder = root.join("work").to_string_lossy().into_owned();
    settings.paths.output_folder = root.join("out").to_string_lossy().into_owned();
    settings.paths.logs_folder = root.join("logs").to_string_lossy().into_owned();
    settings.paths.cache_folder = root.join("cache").to_string_lossy().into_owned();
    settings.synthesis.workers = 3;
    settings.synthesis.backoff_base_ms = 1;
    settings
}

fn inputs(root: &Path, settings: &Settings, slides: usize, synth: Arc<SlowFirstSynth>) -> RunInputs {
    let script = root.join("lecture.md");
    fs::write(&script, SCRIPT).unwrap();
    let deck = root.join("deck");
    write_deck(&deck, slides);

    let parsed = ParsedScript::load(&script, &ScriptParser::from(&settings.script)).unwrap();
    let frames = ImageDirFrameSource::open(&deck, settings.script.skip_first_slide).unwrap();
    assert_eq!(frames.frame_count(), slides);

    RunInputs {
        store: parsed.into_store(&settings.synthesis.voice),
        frames: Arc::new(frames),
        synthesizer: synth,
    }
}

fn read_document(root: &Path, run: &str) -> TimelineDocument {
    let text = fs::read_to_string(root.join("out").join(run).join("timeline.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn script_and_deck_produce_ordered_timeline() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());
    let synth = Arc::new(SlowFirstSynth::default());
    let runner = NarrationRunner::new(settings.clone()).unwrap();

    let summary = runner.run(
        "lecture",
        inputs(dir.path(), &settings, 3, synth.clone()),
        &CancelHandle::new(),
        None,
        None,
    );

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.segments, 3);
    assert_eq!(summary.synthesized, 3);
    assert!(summary.padded_frames.is_empty());
    assert_eq!(summary.total_duration, 2.0 + 3.0 + 4.0);

    let doc = read_document(dir.path(), "lecture");
    assert_eq!(doc.frame_count, 3);
    let starts: Vec<f64> = doc.entries.iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![0.0, 2.0, 5.0]);
    let clip_segments: Vec<Option<usize>> = doc.clips.iter().map(|c| c.segment_index).collect();
    assert_eq!(clip_segments, vec![Some(0), Some(1), Some(2)]);

    let audio = fs::read(dir.path().join("out/lecture/audio/segment_0001.mp3")).unwrap();
    assert_eq!(audio, b"audio:1");
    let frames_script = fs::read_to_string(dir.path().join("out/lecture/frames.ffconcat")).unwrap();
    assert!(frames_script.contains("slide_1.png"));
    assert!(!frames_script.contains("slide_0.png"));
}

#[test]
fn extra_slides_are_padded() {
    let dir = tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.timeline.min_frame_secs = 1.5;
    let runner = NarrationRunner::new(settings.clone()).unwrap();

    let summary = runner.run(
        "padded",
        inputs(dir.path(), &settings, 5, Arc::new(SlowFirstSynth::default())),
        &CancelHandle::new(),
        None,
        None,
    );

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.padded_frames, vec![3, 4]);
    assert_eq!(summary.total_duration, 9.0 + 3.0);

    let doc = read_document(dir.path(), "padded");
    assert_eq!(doc.entries.len(), 5);
    assert!(dir.path().join("out/padded/audio/pad_frame_0004.wav").exists());
}

#[test]
fn persistent_cache_spans_runners() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());

    let first = Arc::new(SlowFirstSynth::default());
    NarrationRunner::new(settings.clone()).unwrap().run(
        "first",
        inputs(dir.path(), &settings, 3, first.clone()),
        &CancelHandle::new(),
        None,
        None,
    );
    assert_eq!(first.calls.load(Ordering::SeqCst), 3);

    let second = Arc::new(SlowFirstSynth::default());
    let summary = NarrationRunner::new(settings.clone()).unwrap().run(
        "second",
        inputs(dir.path(), &settings, 3, second.clone()),
        &CancelHandle::new(),
        None,
        None,
    );

    assert!(summary.success);
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.cached, 3);
}

#[test]
fn silence_policy_keeps_frames_aligned() {
    let dir = tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.cache.enabled = false;
    settings.timeline.gap_policy = GapPolicy::Silence;
    settings.timeline.silence_secs = 0.5;
    let synth = Arc::new(SlowFirstSynth {
        reject_prefix: Some("Today"),
        ..Default::default()
    });
    let runner = NarrationRunner::new(settings.clone()).unwrap();

    let summary = runner.run(
        "gappy",
        inputs(dir.path(), &settings, 3, synth.clone()),
        &CancelHandle::new(),
        None,
        None,
    );

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.failed_segments, vec![1]);
    assert_eq!(summary.silenced_segments, vec![1]);
    assert_eq!(summary.total_duration, 2.0 + 0.5 + 4.0);
    // permanent failures are not retried
    assert_eq!(synth.seen.lock().get(&1), Some(&1));

    let doc = read_document(dir.path(), "gappy");
    assert!(doc.clips[1].silence);
    assert!(doc.clips[1].file.ends_with(".wav"));
}
