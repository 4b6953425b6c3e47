//! Input normalisation run before dwells are inserted.
//!
//! The header and footer of an earlier run are dropped so an edited program
//! can be processed again. Rapid moves and dwells left over from a previous
//! run are dropped so a program never collects two pauses per move, and feed
//! words are stripped because the material preset supplies the feed rate.
//! Every kept line remembers where it came from in the source text.

use serde::Serialize;

use crate::motion::{leading_command, words, MoveRecord};

/// Marks written by the annotator; both are required to treat a program as
/// already processed.
pub(crate) const HEADER_MARKERS: [&str; 2] = ["=== begin cut ===", "=== inicio do corte ==="];
pub(crate) const FOOTER_MARKERS: [&str; 2] = ["=== statistics ===", "=== estatisticas ==="];

/// Comment prefixes that open an annotation header.
const HEADER_FIELDS: [&str; 7] = [
    "; project:",
    "; date:",
    "; material:",
    "; feed rate:",
    "; projeto:",
    "; data:",
    "; tipo de eps:",
];
/// Comments trailing the setup commands of an annotation header.
const HEADER_SETUP: [&str; 5] = [
    "absolute mode",
    "set origin",
    "modo absoluto",
    "zera a origem",
    "velocidade base",
];
/// Lines that open an annotation footer.
const FOOTER_OPENERS: [&str; 4] = [
    "=== end cut ===",
    "=== fim do corte ===",
    "=== finalizacao ===",
    "=== creditos ===",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RemovedCommands {
    pub rapid: u32,
    pub dwell: u32,
    /// Header and footer lines of an earlier run.
    pub annotation: u32,
}

impl RemovedCommands {
    pub fn total(&self) -> u32 {
        self.rapid + self.dwell + self.annotation
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cleaned {
    pub lines: Vec<String>,
    /// 1-based source line of each entry in `lines`.
    pub origin: Vec<usize>,
    pub removed: RemovedCommands,
}

impl Cleaned {
    /// Takes the program as-is, numbering lines from 1.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned = Cleaned::default();
        for (idx, line) in lines.into_iter().enumerate() {
            cleaned.push(idx + 1, line.as_ref().to_string());
        }
        cleaned
    }

    fn push(&mut self, origin: usize, line: String) {
        self.origin.push(origin);
        self.lines.push(line);
    }

    /// Maps a 1-based line of `lines` back to the source text.
    pub fn source_line(&self, line: usize) -> usize {
        line.checked_sub(1)
            .and_then(|i| self.origin.get(i))
            .copied()
            .unwrap_or(line)
    }

    /// Drops the header up to the first cutting move and the comment-only
    /// footer of an earlier run, and collapses runs of blank lines.
    pub fn without_annotation(self) -> Self {
        let mut out = Cleaned { removed: self.removed, ..Default::default() };
        let mut in_header = false;
        let mut header_done = false;
        let mut in_footer = false;

        for (origin, line) in self.origin.into_iter().zip(self.lines) {
            let trimmed = line.trim();
            let lower = trimmed.to_ascii_lowercase();
            let blank_or_comment = trimmed.is_empty() || trimmed.starts_with(';');

            if !header_done
                && (HEADER_FIELDS.iter().any(|f| lower.starts_with(f))
                    || HEADER_MARKERS.iter().any(|m| lower.contains(m))
                    || HEADER_SETUP.iter().any(|m| lower.contains(m)))
            {
                in_header = true;
                out.removed.annotation += 1;
                continue;
            }

            if in_header {
                if blank_or_comment || is_header_setup(trimmed) {
                    out.removed.annotation += 1;
                    continue;
                }
                in_header = false;
                header_done = true;
            }

            if FOOTER_OPENERS.iter().chain(FOOTER_MARKERS.iter()).any(|m| lower.contains(m)) {
                in_footer = true;
                out.removed.annotation += 1;
                continue;
            }
            if in_footer {
                if blank_or_comment {
                    out.removed.annotation += 1;
                    continue;
                }
                in_footer = false;
            }

            if trimmed.is_empty() && out.lines.last().is_some_and(|l| l.trim().is_empty()) {
                continue;
            }
            out.push(origin, line);
        }

        while out.lines.last().is_some_and(|l| l.trim().is_empty()) {
            out.lines.pop();
            out.origin.pop();
        }
        out
    }

    /// Drops rapids, old dwells, sequence numbers, feed words and lines left
    /// empty by that.
    pub fn clean(self) -> Self {
        let mut out = Cleaned { removed: self.removed, ..Default::default() };
        for (origin, line) in self.origin.into_iter().zip(self.lines) {
            match leading_kind(&line) {
                Leading::Rapid => {
                    out.removed.rapid += 1;
                    continue;
                }
                Leading::Dwell => {
                    out.removed.dwell += 1;
                    continue;
                }
                Leading::Linear | Leading::Other => {}
            }

            let stripped = strip_feed_words(strip_sequence_number(&line));
            if stripped.is_empty() || is_bare_sequence_number(&stripped) {
                continue;
            }
            out.push(origin, stripped);
        }
        console_log!(
            "cleanup: kept {} lines, removed {} rapid and {} dwell",
            out.lines.len(),
            out.removed.rapid,
            out.removed.dwell
        );
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leading {
    Rapid,
    Dwell,
    Linear,
    Other,
}

fn leading_kind(line: &str) -> Leading {
    let ws = words(line);
    match leading_command(&ws) {
        Some(w) if w.letter == b'G' => match w.value {
            Some(v) if v == 0.0 => Leading::Rapid,
            Some(v) if v == 4.0 => Leading::Dwell,
            Some(v) if v == 1.0 => Leading::Linear,
            _ => Leading::Other,
        },
        _ => Leading::Other,
    }
}

/// Setup blocks that sit between the header comments and the first cut:
/// `G90`, `G92 ...`, a bare feed, sequence numbers, M codes and non-cutting
/// G codes.
fn is_header_setup(line: &str) -> bool {
    if MoveRecord::parse(line).is_some() {
        return false;
    }
    let ws = words(line);
    match ws.first() {
        Some(w) if matches!(w.letter, b'F' | b'N' | b'M') => true,
        Some(w) if w.letter == b'G' => w.value != Some(1.0),
        _ => false,
    }
}

/// `N10 G01 X1` -> `G01 X1`.
fn strip_sequence_number(line: &str) -> &str {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix(['N', 'n']) else {
        return line;
    };
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let after = &rest[digits..];
    if digits > 0 && after.starts_with([' ', '\t']) {
        after.trim_start()
    } else {
        line
    }
}

/// Removes every `F<number>` word outside comments.
fn strip_feed_words(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for w in words(line) {
        if w.letter == b'F' && w.value.is_some() {
            out.push_str(&line[last..w.start]);
            out.push(' ');
            last = w.span.end;
        }
    }
    out.push_str(&line[last..]);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_bare_sequence_number(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(chars.next(), Some('N' | 'n'))
        && line.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Header and footer of an earlier run removed, line origins kept.
pub fn strip_annotation<I, S>(lines: I) -> Cleaned
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Cleaned::from_lines(lines).without_annotation()
}

/// Full normalisation: annotation of an earlier run, rapids, old dwells,
/// sequence numbers and feed words.
pub fn clean_program<I, S>(lines: I) -> Cleaned
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    strip_annotation(lines).clean()
}

/// A program that already carries the annotation header and footer and has
/// roughly one dwell per linear move.
pub fn is_already_processed<I, S>(lines: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut has_header = false;
    let mut has_footer = false;
    let mut linear = 0i64;
    let mut dwell = 0i64;

    for line in lines {
        let line = line.as_ref();
        let lower = line.trim().to_ascii_lowercase();
        if HEADER_MARKERS.iter().any(|m| lower.contains(m)) {
            has_header = true;
        }
        if FOOTER_MARKERS.iter().any(|m| lower.contains(m)) {
            has_footer = true;
        }
        match leading_kind(line) {
            Leading::Linear => linear += 1,
            Leading::Dwell => dwell += 1,
            Leading::Rapid | Leading::Other => {}
        }
    }

    has_header && has_footer && dwell > 0 && (linear - dwell).abs() <= 1
}
