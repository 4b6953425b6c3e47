use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("X"),
            Axis::Y => f.write_str("Y"),
        }
    }
}

/// Work-plane position in program units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One address word of a block, e.g. `X-12.5`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Word {
    /// Uppercased address letter.
    pub letter: u8,
    /// Byte offset of the letter.
    pub start: usize,
    /// `None` when the letter is not followed by a readable number.
    pub value: Option<f64>,
    /// Byte range of the number text in the source line (may be empty).
    pub span: Range<usize>,
}

/// Splits a block into address words, skipping `;` and `( ... )` comments.
pub(crate) fn words(line: &str) -> Vec<Word> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b';' {
            break;
        }
        if b == b'(' {
            while i < bytes.len() && bytes[i] != b')' {
                i += 1;
            }
            if i < bytes.len() {
                i += 1;
            }
            continue;
        }
        if !b.is_ascii_alphabetic() {
            i += 1;
            continue;
        }

        let letter = b.to_ascii_uppercase();
        let start = i;
        i += 1;
        let (value, span) = read_number(bytes, i);
        i = span.end.max(i);
        out.push(Word { letter, start, value, span });
    }

    out
}

/// Reads `[+-]digits[.digits]` starting at `start`, allowing leading spaces
/// ("X 10"). The returned span covers every sign/digit/dot byte consumed even
/// when no digit was found, so callers can report the bad token.
fn read_number(bytes: &[u8], start: usize) -> (Option<f64>, Range<usize>) {
    let mut i = start;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    let begin = i;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let mut has_digit = false;
    let mut has_dot = false;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() {
            has_digit = true;
            i += 1;
            continue;
        }
        if b == b'.' && !has_dot {
            has_dot = true;
            i += 1;
            continue;
        }
        break;
    }

    if !has_digit {
        return (None, begin..i);
    }

    let parsed = std::str::from_utf8(&bytes[begin..i])
        .ok()
        .and_then(|s| s.parse::<f64>().ok());
    (parsed, begin..i)
}

/// First word that is not an `N` sequence number.
pub(crate) fn leading_command(words: &[Word]) -> Option<&Word> {
    words.iter().find(|w| w.letter != b'N')
}

/// True for a `G1`/`G01` block, whatever else it carries.
pub(crate) fn is_linear(words: &[Word]) -> bool {
    words.iter().any(|w| w.letter == b'G' && w.value == Some(1.0))
}

/// A linear move block with at least one X/Y word.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveRecord {
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Axis words whose number could not be read; those axes hold position.
    pub malformed: Vec<(Axis, String)>,
}

impl MoveRecord {
    /// Returns `None` for anything that is not a move: other commands,
    /// comments, blank lines, or a `G1` with neither X nor Y.
    pub fn parse(line: &str) -> Option<Self> {
        let words = words(line);
        if !is_linear(&words) {
            return None;
        }

        let mut rec = MoveRecord::default();
        let mut seen_x = false;
        let mut seen_y = false;
        for w in &words {
            let (axis, seen, slot) = match w.letter {
                b'X' => (Axis::X, &mut seen_x, &mut rec.x),
                b'Y' => (Axis::Y, &mut seen_y, &mut rec.y),
                _ => continue,
            };
            // first word per axis wins
            if *seen {
                continue;
            }
            *seen = true;
            match w.value {
                Some(v) => *slot = Some(v),
                None => rec.malformed.push((axis, line[w.span.clone()].to_string())),
            }
        }

        if seen_x || seen_y { Some(rec) } else { None }
    }

    /// Absolute target, holding any omitted (or unreadable) axis at the cursor.
    pub fn resolve(&self, cursor: Point) -> Point {
        Point {
            x: self.x.unwrap_or(cursor.x),
            y: self.y.unwrap_or(cursor.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_axes() {
        let rec = MoveRecord::parse("G01 X10.5 Y-3").expect("move");
        assert_eq!(rec.x, Some(10.5));
        assert_eq!(rec.y, Some(-3.0));
        assert!(rec.malformed.is_empty());
    }

    #[test]
    fn g1_short_form_and_lowercase_are_moves() {
        assert!(MoveRecord::parse("g1 x1").is_some());
        assert!(MoveRecord::parse("N10 G1 Y+.5").is_some());
        assert_eq!(MoveRecord::parse("G1Y.5").and_then(|r| r.y), Some(0.5));
    }

    #[test]
    fn omitted_axis_holds_cursor() {
        let cursor = Point::new(4.0, 7.0);
        let rec = MoveRecord::parse("G01 Y20").expect("move");
        assert_eq!(rec.resolve(cursor), Point::new(4.0, 20.0));

        let rec = MoveRecord::parse("G01 X-1").expect("move");
        assert_eq!(rec.resolve(cursor), Point::new(-1.0, 7.0));
    }

    #[test]
    fn record_without_axis_words_is_not_a_move() {
        assert!(MoveRecord::parse("G01").is_none());
        assert!(MoveRecord::parse("G01 Z5 F600").is_none());
        assert!(MoveRecord::parse("G01 ; X10 Y10").is_none());
        assert!(MoveRecord::parse("G01 (X10) Z1").is_none());
    }

    #[test]
    fn other_commands_pass_through() {
        assert!(MoveRecord::parse("G00 X10 Y10").is_none());
        assert!(MoveRecord::parse("G10 X1").is_none());
        assert!(MoveRecord::parse("G04 P0.5").is_none());
        assert!(MoveRecord::parse("; G01 X1").is_none());
        assert!(MoveRecord::parse("").is_none());
    }

    #[test]
    fn malformed_token_is_held_and_reported() {
        let rec = MoveRecord::parse("G01 X- Y12").expect("still a move");
        assert_eq!(rec.x, None);
        assert_eq!(rec.y, Some(12.0));
        assert_eq!(rec.malformed, vec![(Axis::X, "-".to_string())]);
        assert_eq!(rec.resolve(Point::new(3.0, 0.0)), Point::new(3.0, 12.0));
    }

    #[test]
    fn first_word_per_axis_wins() {
        let rec = MoveRecord::parse("G01 X1 X2").expect("move");
        assert_eq!(rec.x, Some(1.0));
    }

    #[test]
    fn word_spans_point_at_numbers() {
        let line = "G01 X 12.25 Y-3";
        let ws = words(line);
        let x = ws.iter().find(|w| w.letter == b'X').expect("x word");
        assert_eq!(&line[x.span.clone()], "12.25");
        let y = ws.iter().find(|w| w.letter == b'Y').expect("y word");
        assert_eq!(&line[y.span.clone()], "-3");
    }
}
