//! Strip stage directions and markup from narration text.

use once_cell::sync::Lazy;
use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static narration pattern")
}

static HEADING: Lazy<Regex> = Lazy::new(|| re(r"(?m)^\s{0,3}#+\s.*$"));
static DASH_RULE: Lazy<Regex> = Lazy::new(|| re(r"(?m)^\s*-{3,}\s*$"));
static STAR_RULE: Lazy<Regex> = Lazy::new(|| re(r"(?m)^\s*\*{3,}\s*$"));
static BOLD_PAREN: Lazy<Regex> = Lazy::new(|| re(r"\*\*\s*\(.*?\)\s*\*\*"));
static BOLD_BRACKET: Lazy<Regex> = Lazy::new(|| re(r"\*\*\s*\[.*?\]\s*\*\*"));
static PAREN: Lazy<Regex> = Lazy::new(|| re(r"\([^)]{0,120}?\)"));
static BRACKET: Lazy<Regex> = Lazy::new(|| re(r"\[[^\]]{0,120}?\]"));
static META_PHRASE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(transitioning from previous slide|wait for questions|instructor notes?:?|slide transition|pause here)\b.*")
});
static PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?mi)^\s*(certainly!|here's a comprehensive speaking script|this comprehensive script should facilitate).*$")
});
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| re(r"\n{2,}"));

/// Longest single-asterisk span treated as an italic direction.
const MAX_ITALIC_CHARS: usize = 200;

/// Turn a raw script chunk into speakable text.
///
/// Removes headings, horizontal rules, bold or bracketed stage directions,
/// single-asterisk italics, instructor meta phrases and boilerplate
/// preambles. Bold emphasis is kept as plain text.
pub fn clean_text(raw: &str) -> String {
    let mut s = raw.replace("\r\n", "\n").trim().to_string();

    for pattern in [&*HEADING, &*DASH_RULE, &*STAR_RULE, &*BOLD_PAREN, &*BOLD_BRACKET] {
        s = pattern.replace_all(&s, "").into_owned();
    }

    s = strip_italic_spans(&s);

    for pattern in [&*PAREN, &*BRACKET, &*META_PHRASE, &*PREAMBLE] {
        s = pattern.replace_all(&s, "").into_owned();
    }

    s = BLANK_RUNS.replace_all(&s, "\n\n").trim().to_string();
    s.replace('*', "")
}

/// Remove `*italic*` spans delimited by lone asterisks (not part of `**`).
fn strip_italic_spans(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let is_lone = |i: usize| {
        chars[i] == '*'
            && (i == 0 || chars[i - 1] != '*')
            && chars.get(i + 1).map_or(true, |c| *c != '*')
    };

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if is_lone(i) {
            let close = chars[i + 1..].iter().position(|c| *c == '*').map(|p| i + 1 + p);
            if let Some(close) = close {
                if close - i - 1 <= MAX_ITALIC_CHARS && is_lone(close) {
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
