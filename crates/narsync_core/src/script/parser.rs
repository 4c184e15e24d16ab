//! Markdown narration script parser.
//!
//! Scripts are split into `## Section N` blocks. Inside a section, frames
//! are delimited by strong markers such as `**[Frame 3]**`. When a section
//! declares its frame count (`*(4 frames)*`) the extracted frames are split
//! or merged to match it; sections without markers fall back to horizontal
//! rules or paragraph grouping.

use once_cell::sync::Lazy;
use regex::Regex;

use super::clean::clean_text;
use super::{ParseWarning, ParsedScript, ScriptSection};
use crate::config::ScriptSettings;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static script pattern")
}

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| re(r"(?mi)^\s*##\s+Section\s+\d+[:\s].*$"));
static DECLARED_FRAMES: Lazy<Regex> = Lazy::new(|| re(r"(?i)\*\s*\((\d+)\s+frames\)\s*\*"));
static CONTINUED_MARKER: Lazy<Regex> =
    Lazy::new(|| re(r"(?mi)^\s*\*\*\s*\[Frame\s*\d+\s+Continued\]\s*\*\*\s*$"));
static FRAME_MARKER: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^\*\*\s*\[(?:click to |advance to )?frame\s*\d+\]\s*\*\*$"));
static RULE_SPLIT: Lazy<Regex> = Lazy::new(|| re(r"\n\s*-{3,}\s*\n"));
static PARAGRAPH_SPLIT: Lazy<Regex> = Lazy::new(|| re(r"\n\n+"));

/// Lead-in text before the first marker and fallback paragraphs must be
/// longer than this to count as a frame.
const SUBSTANTIAL_CHARS: usize = 100;

/// Placeholder for frames whose text cleaned down to nothing.
pub const EMPTY_FRAME: &str = "_";

/// Parses narration scripts into per-frame text.
#[derive(Debug, Clone)]
pub struct ScriptParser {
    min_frame_chars: usize,
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::from(&ScriptSettings::default())
    }
}

impl From<&ScriptSettings> for ScriptParser {
    fn from(settings: &ScriptSettings) -> Self {
        Self {
            min_frame_chars: settings.min_frame_chars,
        }
    }
}

impl ScriptParser {
    pub fn new(min_frame_chars: usize) -> Self {
        Self { min_frame_chars }
    }

    pub fn parse(&self, text: &str) -> ParsedScript {
        let text = text.replace("\r\n", "\n");
        let mut sections = Vec::new();
        let mut warnings = Vec::new();

        for (header, body) in split_sections(&text) {
            let declared = declared_frames(body);
            let frames: Vec<String> = self
                .extract_frames(body, declared)
                .into_iter()
                .map(|f| {
                    if f.trim().is_empty() {
                        EMPTY_FRAME.to_string()
                    } else {
                        f
                    }
                })
                .collect();

            if let Some(declared) = declared {
                if frames.len() != declared {
                    let warning = ParseWarning {
                        section: header.clone(),
                        declared,
                        extracted: frames.len(),
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }

            tracing::debug!(
                "Section {:?}: {} frame(s) (declared {:?})",
                header,
                frames.len(),
                declared
            );
            sections.push(ScriptSection {
                header,
                declared_frames: declared,
                frames,
            });
        }

        ParsedScript { sections, warnings }
    }

    fn extract_frames(&self, body: &str, declared: Option<usize>) -> Vec<String> {
        let body = CONTINUED_MARKER.replace_all(body, "");
        let lines: Vec<&str> = body.split('\n').collect();
        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| FRAME_MARKER.is_match(line.trim()))
            .map(|(i, _)| i)
            .collect();

        let Some(&first_marker) = markers.first() else {
            return fallback_split(&body, declared);
        };

        let mut chunks = Vec::new();
        let lead_in = lines[..first_marker].join("\n");
        if lead_in.trim().chars().count() > SUBSTANTIAL_CHARS {
            chunks.push(lead_in.trim().to_string());
        }
        for (n, &marker) in markers.iter().enumerate() {
            let end = markers.get(n + 1).copied().unwrap_or(lines.len());
            let chunk = lines[marker + 1..end].join("\n");
            if !chunk.trim().is_empty() {
                chunks.push(chunk.trim().to_string());
            }
        }

        let frames: Vec<String> = chunks
            .iter()
            .filter(|c| c.trim().chars().count() > self.min_frame_chars)
            .map(|c| clean_text(c))
            .collect();

        match declared {
            Some(target) if frames.len() < target => split_to_count(frames, target),
            Some(target) if frames.len() > target => merge_to_count(frames, target),
            _ => frames,
        }
    }
}

/// `(header, body)` pairs; the whole text is one headerless section when no
/// section headers exist.
fn split_sections(text: &str) -> Vec<(Option<String>, &str)> {
    let headers: Vec<_> = SECTION_HEADER.find_iter(text).collect();
    if headers.is_empty() {
        return vec![(None, text)];
    }

    headers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = headers.get(i + 1).map_or(text.len(), |next| next.start());
            (Some(m.as_str().trim().to_string()), text[m.end()..end].trim())
        })
        .collect()
}

fn declared_frames(body: &str) -> Option<usize> {
    DECLARED_FRAMES
        .captures(body)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Split the longest frame at its middle paragraph break until `target`
/// frames exist or nothing can be split further.
fn split_to_count(mut frames: Vec<String>, target: usize) -> Vec<String> {
    while frames.len() < target {
        let Some(longest) = longest_index(&frames) else {
            break;
        };
        let parts: Vec<&str> = frames[longest]
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() <= 1 {
            break;
        }

        let mid = parts.len() / 2;
        let first = parts[..mid].join("\n\n");
        let second = parts[mid..].join("\n\n");
        frames[longest] = first;
        frames.insert(longest + 1, second);
    }
    frames.truncate(target);
    frames
}

/// Merge the shortest frame into its successor (or predecessor when last)
/// until only `target` frames remain.
fn merge_to_count(mut frames: Vec<String>, target: usize) -> Vec<String> {
    while frames.len() > target.max(1) {
        let Some(shortest) = shortest_index(&frames) else {
            break;
        };
        if shortest + 1 < frames.len() {
            let next = frames.remove(shortest + 1);
            frames[shortest] = format!("{}\n\n{}", frames[shortest], next);
        } else {
            let last = frames.remove(shortest);
            let prev = shortest - 1;
            frames[prev] = format!("{}\n\n{}", frames[prev], last);
        }
    }
    frames
}

/// First index of the longest frame (ties resolve to the earliest).
fn longest_index(frames: &[String]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, f) in frames.iter().enumerate() {
        let len = f.chars().count();
        if best.map_or(true, |(_, b)| len > b) {
            best = Some((i, len));
        }
    }
    best.map(|(i, _)| i)
}

/// First index of the shortest frame (ties resolve to the earliest).
fn shortest_index(frames: &[String]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, f) in frames.iter().enumerate() {
        let len = f.chars().count();
        if best.map_or(true, |(_, b)| len < b) {
            best = Some((i, len));
        }
    }
    best.map(|(i, _)| i)
}

/// Marker-less sections: horizontal rules when they match the declared
/// count, otherwise substantial paragraphs grouped to the declared count.
fn fallback_split(body: &str, declared: Option<usize>) -> Vec<String> {
    let ruled: Vec<&str> = RULE_SPLIT
        .split(body)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if declared == Some(ruled.len()) {
        return ruled.into_iter().map(clean_text).collect();
    }

    let paragraphs: Vec<&str> = PARAGRAPH_SPLIT
        .split(body)
        .map(str::trim)
        .filter(|p| p.chars().count() > SUBSTANTIAL_CHARS)
        .collect();

    match declared {
        Some(target) if paragraphs.len() > target => group_evenly(&paragraphs, target),
        _ => paragraphs.into_iter().map(clean_text).collect(),
    }
}

/// Distribute paragraphs over `target` frames, earlier frames taking the
/// remainder.
fn group_evenly(paragraphs: &[&str], target: usize) -> Vec<String> {
    let per_frame = paragraphs.len() / target;
    let remainder = paragraphs.len() % target;

    let mut frames = Vec::with_capacity(target);
    let mut start = 0;
    for i in 0..target {
        let count = per_frame + usize::from(i < remainder);
        frames.push(clean_text(&paragraphs[start..start + count].join("\n\n")));
        start += count;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(word: &str) -> String {
        format!("{} {}", word, "narration text that is comfortably long enough. ".repeat(3))
    }

    #[test]
    fn strong_markers_delimit_frames() {
        let script = format!(
            "**[Frame 1]**\n{}\n\n**[Click to Frame 2]**\n{}\n\n**[Advance to Frame 3]**\n{}\n",
            long("Alpha"),
            long("Beta"),
            long("Gamma")
        );
        let parsed = ScriptParser::default().parse(&script);

        assert_eq!(parsed.sections.len(), 1);
        let frames = &parsed.sections[0].frames;
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("Alpha"));
        assert!(frames[2].starts_with("Gamma"));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn continued_markers_do_not_split() {
        let script = format!(
            "**[Frame 1]**\n{}\n**[Frame 1 Continued]**\n{}\n",
            long("First"),
            long("Still first")
        );
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("Still first"));
    }

    #[test]
    fn short_chunks_are_dropped() {
        let script = format!("**[Frame 1]**\nToo short.\n**[Frame 2]**\n{}\n", long("Kept"));
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("Kept"));
    }

    #[test]
    fn chunk_must_exceed_minimum_length() {
        let exact = "a".repeat(50);
        let over = "b".repeat(51);
        let script = format!("**[Frame 1]**\n{}\n**[Frame 2]**\n{}\n", exact, over);

        let frames = ScriptParser::new(50).parse(&script).sections[0].frames.clone();

        assert_eq!(frames, vec![over]);
    }

    #[test]
    fn sections_are_split_and_counts_checked() {
        let script = format!(
            "## Section 1: Intro\n*(1 frames)*\n**[Frame 1]**\n{}\n\n## Section 2: Body\n*(2 frames)*\n**[Frame 1]**\n{}\n",
            long("Intro"),
            long("Body")
        );
        let parsed = ScriptParser::default().parse(&script);

        assert_eq!(parsed.sections.len(), 2);
        assert_eq!(parsed.sections[0].header.as_deref(), Some("## Section 1: Intro"));
        assert_eq!(parsed.sections[1].declared_frames, Some(2));
        // One paragraph cannot be split into two frames
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].extracted, 1);
        assert_eq!(parsed.frame_count(), 2);
    }

    #[test]
    fn declared_count_splits_longest_frame() {
        let body = format!("{}\n\n{}", long("Part one"), long("Part two"));
        let script = format!("*(2 frames)*\n**[Frame 1]**\n{}\n", body);
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();

        assert_eq!(frames.len(), 2);
        assert!(frames[0].starts_with("Part one"));
        assert!(frames[1].starts_with("Part two"));
    }

    #[test]
    fn declared_count_merges_shortest_frame() {
        let frames = vec!["aaaa".to_string(), "b".to_string(), "cccc".to_string()];
        let merged = merge_to_count(frames, 2);
        assert_eq!(merged, vec!["aaaa".to_string(), "b\n\ncccc".to_string()]);

        let frames = vec!["aaaa".to_string(), "cccc".to_string(), "b".to_string()];
        let merged = merge_to_count(frames, 2);
        assert_eq!(merged, vec!["aaaa".to_string(), "cccc\n\nb".to_string()]);
    }

    #[test]
    fn fallback_uses_rules_when_count_matches() {
        let script = format!("*(2 frames)*\n{}\n---\n{}\n", long("Left"), long("Right"));
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].starts_with("Right"));
    }

    #[test]
    fn fallback_groups_paragraphs_evenly() {
        let paragraphs: Vec<String> = (0..5).map(|i| long(&format!("P{}", i))).collect();
        let script = format!("*(2 frames)*\n\n{}", paragraphs.join("\n\n"));
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();

        assert_eq!(frames.len(), 2);
        // 5 paragraphs over 2 frames: 3 + 2
        assert!(frames[0].contains("P2"));
        assert!(frames[1].starts_with("P3"));
    }

    #[test]
    fn frames_that_clean_to_nothing_become_placeholders() {
        let direction = "**(The instructor walks to the whiteboard and waits for the room to settle.)**";
        let script = format!("**[Frame 1]**\n{}\n**[Frame 2]**\n{}\n", direction, long("Spoken"));
        let frames = ScriptParser::default().parse(&script).sections[0].frames.clone();
        assert_eq!(frames[0], EMPTY_FRAME);
        assert_eq!(frames.len(), 2);
    }
}
