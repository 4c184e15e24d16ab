//! Narration Sync command line entry point.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;

use narsync_core::config::{ConfigManager, PathSettings};
use narsync_core::frames::ImageDirFrameSource;
use narsync_core::logging::{init_tracing_with_file, LogCallback, LogLevel};
use narsync_core::orchestrator::{NarrationRunner, RunInputs, RunSummary};
use narsync_core::script::{ParsedScript, ScriptParser};
use narsync_core::synth::CommandSynthesizer;
use narsync_core::workspace::{clean_work_folders, cleanup_targets};
use narsync_core::CancelHandle;

use cli::{Cli, Command, ConfigCommand, ParseArgs, RunArgs, INTERRUPTED_EXIT_CODE};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let command = match cli.command {
        Command::Config { command } => return config_command(&cli.config, command),
        other => other,
    };

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.settings().logging.level
    };
    let _log_guard = init_tracing_with_file(level, Path::new(&config.settings().paths.logs_folder))
        .context("initializing logging")?;
    tracing::debug!("Core version: {}", narsync_core::version());

    match command {
        Command::Run(args) => run_narration(config, &args),
        Command::Parse(args) => parse_script(&config, &args),
        Command::Config { command } => config_command(&cli.config, command),
        Command::Clean { all, logs } => Ok(clean(&config.settings().paths, all, logs)),
    }
}

fn clean(paths: &PathSettings, all: bool, logs: bool) -> ExitCode {
    let report = clean_work_folders(&cleanup_targets(paths, all, logs));
    for path in &report.removed {
        println!("removed {}", path.display());
    }
    for path in &report.skipped {
        println!("skipped {} (not found)", path.display());
    }
    for (path, error) in &report.failed {
        eprintln!("failed {}: {}", path.display(), error);
    }
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn config_command(path: &Path, command: ConfigCommand) -> Result<ExitCode> {
    match command {
        ConfigCommand::Init { force } => config_init(path, force),
        ConfigCommand::Show => {
            let mut config = ConfigManager::new(path);
            config
                .load_or_create()
                .with_context(|| format!("loading {}", path.display()))?;
            let content = std::fs::read_to_string(config.path())
                .with_context(|| format!("reading {}", config.path().display()))?;
            print!("{}", content);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Writes defaults without reading the existing file when `force` is set,
/// so a broken settings file can be replaced.
fn config_init(path: &Path, force: bool) -> Result<ExitCode> {
    let mut config = ConfigManager::new(path);
    if force || !path.exists() {
        config.save().with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote default settings to {}", path.display());
    } else {
        config
            .load_or_create()
            .with_context(|| format!("loading {}", path.display()))?;
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    config.ensure_dirs_exist().context("creating configured folders")?;
    Ok(ExitCode::SUCCESS)
}

fn parse_script(config: &ConfigManager, args: &ParseArgs) -> Result<ExitCode> {
    let parser = ScriptParser::from(&config.settings().script);
    let parsed = ParsedScript::load(&args.script, &parser)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(ExitCode::SUCCESS);
    }

    for (i, text) in parsed.frames().enumerate() {
        let preview: String = text.chars().take(72).collect();
        let ellipsis = if text.chars().count() > 72 { "..." } else { "" };
        println!("{:>4}  {}{}", i, preview.replace('\n', " "), ellipsis);
    }
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }
    println!(
        "{} frame(s) in {} section(s)",
        parsed.frame_count(),
        parsed.sections.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_narration(mut config: ConfigManager, args: &RunArgs) -> Result<ExitCode> {
    args.apply(config.settings_mut());
    let settings = config.into_settings();
    let run_name = args.run_name();

    let parser = ScriptParser::from(&settings.script);
    let parsed = ParsedScript::load(&args.script, &parser)?;
    for warning in &parsed.warnings {
        tracing::warn!("{}", warning);
    }
    let store = parsed.into_store(&settings.synthesis.voice);

    let frames = ImageDirFrameSource::open(&args.slides, settings.script.skip_first_slide)?;

    let runner = NarrationRunner::new(settings).context("opening synthesis cache")?;
    let (work_dir, _) = runner.run_dirs(&run_name);
    let synthesizer =
        CommandSynthesizer::from_settings(&runner.settings().synthesis, work_dir.join("synth"))
            .context("configuring synthesizer")?;

    let cancel = CancelHandle::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, cancelling run");
        handler_cancel.cancel();
    })
    .context("installing Ctrl+C handler")?;

    let inputs = RunInputs {
        store,
        frames: Arc::new(frames),
        synthesizer: Arc::new(synthesizer),
    };
    let log_callback: Option<LogCallback> = if args.json {
        None
    } else {
        Some(Box::new(|line: &str| println!("{}", line)))
    };
    let summary = runner.run(&run_name, inputs, &cancel, log_callback, None);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(if summary.cancelled {
        ExitCode::from(INTERRUPTED_EXIT_CODE)
    } else if summary.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.success {
        println!("Run '{}' completed", summary.run_name);
    } else if summary.cancelled {
        println!("Run '{}' cancelled", summary.run_name);
    } else {
        println!("Run '{}' failed", summary.run_name);
    }
    println!(
        "  segments: {} ({} synthesized, {} cached)",
        summary.segments, summary.synthesized, summary.cached
    );
    if !summary.failed_segments.is_empty() {
        println!("  failed segments: {:?}", summary.failed_segments);
    }
    if !summary.skipped_segments.is_empty() {
        println!("  skipped segments: {:?}", summary.skipped_segments);
    }
    if !summary.silenced_segments.is_empty() {
        println!("  silenced segments: {:?}", summary.silenced_segments);
    }
    if !summary.padded_frames.is_empty() {
        println!("  padded frames: {:?}", summary.padded_frames);
    }
    if summary.success {
        println!("  duration: {:.2}s", summary.total_duration);
    }
    if let Some(dir) = &summary.output_dir {
        println!("  output: {}", dir.display());
    }
    if let Some(log) = &summary.log_path {
        println!("  log: {}", log.display());
    }
    for (step, secs) in &summary.step_timings {
        println!("  {}: {:.2}s", step, secs);
    }
    if let Some(error) = &summary.error {
        println!("  error: {}", error);
    }
}
