use serde::{Deserialize, Serialize};

use crate::error::{Result, TapError};
use crate::motion::{is_linear, words, Point};

/// Resize a drawing from its measured length to the wanted one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub current_length: f64,
    pub desired_length: f64,
}

impl ScaleRequest {
    pub fn factor(&self) -> Result<f64> {
        let f = self.desired_length / self.current_length;
        check_factor(f)?;
        Ok(f)
    }
}

fn check_factor(factor: f64) -> Result<()> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TapError::InvalidScale(factor));
    }
    Ok(())
}

/// Stretches every linear move's travel by `factor`. Each delta is measured
/// from the previous programmed position and laid down from the previous
/// scaled position.
pub fn scale_program<I, S>(lines: I, factor: f64) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    check_factor(factor)?;

    let mut programmed = Point::default();
    let mut scaled = Point::default();
    let mut out = Vec::new();

    for line in lines {
        let line = line.as_ref();
        let ws = words(line);
        if !is_linear(&ws) {
            out.push(line.to_string());
            continue;
        }

        let mut next_programmed = programmed;
        let mut next_scaled = scaled;
        // (span, replacement) in line order
        let mut edits = Vec::new();
        let mut seen_x = false;
        let mut seen_y = false;

        for w in &ws {
            let seen = match w.letter {
                b'X' => &mut seen_x,
                b'Y' => &mut seen_y,
                _ => continue,
            };
            // only the first word per axis counts, readable or not
            if std::mem::replace(seen, true) {
                continue;
            }
            let Some(v) = w.value else { continue };
            if w.letter == b'X' {
                next_programmed.x = v;
                next_scaled.x = scaled.x + (v - programmed.x) * factor;
                edits.push((w.span.clone(), format!("{:.4}", next_scaled.x)));
            } else {
                next_programmed.y = v;
                next_scaled.y = scaled.y + (v - programmed.y) * factor;
                edits.push((w.span.clone(), format!("{:.4}", next_scaled.y)));
            }
        }

        let mut rewritten = String::with_capacity(line.len() + 8);
        let mut last = 0;
        for (span, text) in edits {
            rewritten.push_str(&line[last..span.start]);
            rewritten.push_str(&text);
            last = span.end;
        }
        rewritten.push_str(&line[last..]);

        programmed = next_programmed;
        scaled = next_scaled;
        out.push(rewritten);
    }

    console_log!("scale: factor {:.6} applied to {} lines", factor, out.len());
    Ok(out)
}
