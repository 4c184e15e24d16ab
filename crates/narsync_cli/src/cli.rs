//! Command line definition.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use narsync_core::config::Settings;
use narsync_core::models::{FramePolicy, GapPolicy};

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG: &str = ".config/narsync.toml";

/// Exit code after Ctrl+C (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "narsync")]
#[command(about = "Synthesize a narration script and align it with slide frames")]
#[command(version)]
pub struct Cli {
    /// Settings file (created with defaults if missing).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synthesize a script and write the timeline bundle.
    Run(RunArgs),
    /// Parse a script and print its frames.
    Parse(ParseArgs),
    /// Manage the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Remove intermediate work folders.
    Clean {
        /// Also remove the output folder.
        #[arg(long)]
        all: bool,

        /// Also remove run logs.
        #[arg(long)]
        logs: bool,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Markdown narration script.
    #[arg(long)]
    pub script: PathBuf,

    /// Directory of rendered slide images.
    #[arg(long)]
    pub slides: PathBuf,

    /// Run name (defaults to the script file stem).
    #[arg(long)]
    pub name: Option<String>,

    /// Override `synthesis.workers`.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override `timeline.gap_policy`.
    #[arg(long, value_enum)]
    pub gap_policy: Option<GapPolicyArg>,

    /// Override `timeline.frame_policy`.
    #[arg(long, value_enum)]
    pub frame_policy: Option<FramePolicyArg>,

    /// Keep the first slide image (title slides are skipped by default).
    #[arg(long)]
    pub keep_first_slide: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| file_stem(&self.script).unwrap_or_else(|| "narration".to_string()))
    }

    /// Apply command line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(workers) = self.workers {
            settings.synthesis.workers = workers;
        }
        if let Some(policy) = self.gap_policy {
            settings.timeline.gap_policy = policy.into();
        }
        if let Some(policy) = self.frame_policy {
            settings.timeline.frame_policy = policy.into();
        }
        if self.keep_first_slide {
            settings.script.skip_first_slide = false;
        }
    }
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[arg(long)]
    pub script: PathBuf,

    /// Print sections, frames and warnings as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write the settings file with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the settings file.
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GapPolicyArg {
    Skip,
    Silence,
    Abort,
}

impl From<GapPolicyArg> for GapPolicy {
    fn from(arg: GapPolicyArg) -> Self {
        match arg {
            GapPolicyArg::Skip => GapPolicy::Skip,
            GapPolicyArg::Silence => GapPolicy::Silence,
            GapPolicyArg::Abort => GapPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FramePolicyArg {
    Reconcile,
    Strict,
}

impl From<FramePolicyArg> for FramePolicy {
    fn from(arg: FramePolicyArg) -> Self {
        match arg {
            FramePolicyArg::Reconcile => FramePolicy::Reconcile,
            FramePolicyArg::Strict => FramePolicy::Strict,
        }
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "narsync",
            "run",
            "--script",
            "scripts/lecture_03.md",
            "--slides",
            "slides/",
            "--gap-policy",
            "silence",
            "--workers",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.run_name(), "lecture_03");

        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.synthesis.workers, 8);
        assert_eq!(settings.timeline.gap_policy, GapPolicy::Silence);
        assert_eq!(settings.timeline.frame_policy, FramePolicy::Reconcile);
        assert!(settings.script.skip_first_slide);
    }

    #[test]
    fn explicit_name_wins() {
        let cli = Cli::try_parse_from([
            "narsync", "run", "--script", "a.md", "--slides", "s", "--name", "intro",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.run_name(), "intro");
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["narsync", "clean", "--all", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Command::Clean { all: true, logs: false }));
    }

    #[test]
    fn run_requires_script_and_slides() {
        assert!(Cli::try_parse_from(["narsync", "run", "--script", "a.md"]).is_err());
    }

    #[test]
    fn rejects_unknown_gap_policy() {
        assert!(Cli::try_parse_from([
            "narsync", "run", "--script", "a.md", "--slides", "s", "--gap-policy", "ignore",
        ])
        .is_err());
    }
}
