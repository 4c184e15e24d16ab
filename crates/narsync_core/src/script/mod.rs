//! Narration script loading.
//!
//! Turns a Markdown speaking script into per-frame narration text and from
//! there into a [`SegmentStore`].

mod clean;
mod parser;

pub use clean::clean_text;
pub use parser::{ScriptParser, EMPTY_FRAME};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::VoiceConfig;
use crate::store::SegmentStore;

/// Errors raised while loading a script.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Script {0} contains no narration frames")]
    Empty(PathBuf),
}

/// Result type for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// One `## Section` block of a script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSection {
    /// Header line, `None` for scripts without sections.
    pub header: Option<String>,
    /// Count announced with `*(N frames)*`.
    pub declared_frames: Option<usize>,
    /// Cleaned narration per frame.
    pub frames: Vec<String>,
}

/// Declared and extracted frame counts disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub section: Option<String>,
    pub declared: usize,
    pub extracted: usize,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Section '{}' declares {} frames but extracted {}",
            self.section.as_deref().unwrap_or("(untitled)"),
            self.declared,
            self.extracted
        )
    }
}

/// Parsed script.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedScript {
    pub sections: Vec<ScriptSection>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedScript {
    /// Read and parse a script file.
    pub fn load(path: &Path, parser: &ScriptParser) -> ScriptResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = parser.parse(&text);
        if parsed.frame_count() == 0 {
            return Err(ScriptError::Empty(path.to_path_buf()));
        }
        tracing::info!(
            "Parsed {}: {} section(s), {} frame(s), {} warning(s)",
            path.display(),
            parsed.sections.len(),
            parsed.frame_count(),
            parsed.warnings.len()
        );
        Ok(parsed)
    }

    /// Total frames across sections.
    pub fn frame_count(&self) -> usize {
        self.sections.iter().map(|s| s.frames.len()).sum()
    }

    /// Frames flattened across sections, in script order.
    pub fn frames(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.frames.iter().map(String::as_str))
    }

    /// Segment `i` narrates frame `i` of the flattened frame list.
    pub fn into_store(self, voice: &VoiceConfig) -> SegmentStore {
        let texts: Vec<String> = self.sections.into_iter().flat_map(|s| s.frames).collect();
        SegmentStore::from_texts(texts, voice)
    }
}
