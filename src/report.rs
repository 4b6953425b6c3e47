use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TapError};
use crate::policy::{format_seconds, Material};
use crate::rewriter::Rewrite;
use crate::scale::ScaleRequest;

/// Header and footer text with `{PLACEHOLDER}` slots, filled per run.
///
/// Header slots: `{FILENAME}` `{DATE}` `{MATERIAL}` `{FEED_RATE}`.
/// The footer also takes `{TOTAL_COMMANDS}` `{TOTAL_DISTANCE}`
/// `{ESTIMATED_TIME}` (cutting time) `{PAUSE_SECONDS}` `{TOTAL_PAUSES}`
/// `{SHORT_PAUSES}` `{MEDIUM_PAUSES}` `{LONG_PAUSES}` `{SHORT_TAG}`
/// `{MEDIUM_TAG}` `{LONG_TAG}` `{TOTAL_TIME}` (whole minutes) and `{SCALE}`.
/// A line holding only `{SCALE}` is dropped when the run was not scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Template {
    pub header: String,
    pub footer: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            header: "; Project: {FILENAME}\n\
                     ; Date: {DATE}\n\
                     ; Material: {MATERIAL}\n\
                     ; Feed rate: {FEED_RATE} mm/min\n\
                     \n\
                     ; === BEGIN CUT ===\n\
                     G90 ; absolute mode\n\
                     G92 X0 Y0 ; set origin\n\
                     F{FEED_RATE}\n"
                .to_string(),
            footer: "\n\
                     ; === END CUT ===\n\
                     \n\
                     ; === STATISTICS ===\n\
                     ; Linear moves: {TOTAL_COMMANDS}\n\
                     ; Total distance: {TOTAL_DISTANCE} mm\n\
                     ; Cutting time: {ESTIMATED_TIME}\n\
                     ; Pause time: {PAUSE_SECONDS} s\n\
                     ; Pauses: {TOTAL_PAUSES} total ({SHORT_PAUSES} x P{SHORT_TAG}, \
                     {MEDIUM_PAUSES} x P{MEDIUM_TAG}, {LONG_PAUSES} x P{LONG_TAG})\n\
                     {SCALE}\n\
                     ; Total estimated time: {TOTAL_TIME} min"
                .to_string(),
        }
    }
}

/// Values for the header and footer blocks that do not come from the run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    /// Project name, usually the input file stem.
    pub project: String,
    /// Pre-formatted processing date.
    pub date: String,
    pub scale: Option<ScaleRequest>,
    /// `None` renders [`Template::default`].
    pub template: Option<Template>,
}

fn format_feed(feed: f64) -> String {
    if feed.fract() == 0.0 {
        format!("{feed:.0}")
    } else {
        format!("{feed}")
    }
}

fn render(template: &str, slots: &[(&str, String)], out: &mut Vec<String>) {
    for line in template.split('\n') {
        let mut text = line.to_string();
        for (key, value) in slots {
            if text.contains(key) {
                text = text.replace(key, value);
            }
        }
        if line.trim() == "{SCALE}" && text.trim().is_empty() {
            continue;
        }
        out.push(text);
    }
}

/// Wraps the rewritten program in a header that resets the machine origin
/// and feed, and a footer of run statistics.
pub fn annotate(rewrite: &Rewrite, material: &Material, info: &Annotation) -> Vec<String> {
    let stats = &rewrite.stats;
    let pauses = &material.pauses;

    let cut_minutes = stats.cutting_minutes(material.feed_rate);
    let whole = cut_minutes.floor();
    let cut_seconds = ((cut_minutes - whole) * 60.0).round();
    let total_seconds = cut_minutes * 60.0 + stats.pause_seconds();
    let total_minutes = (total_seconds / 60.0).ceil();

    let scale = info
        .scale
        .and_then(|s| s.factor().ok().map(|f| (s, f)))
        .map(|(s, factor)| {
            format!("; Scale: {}mm -> {}mm ({factor:.6}x)", s.current_length, s.desired_length)
        })
        .unwrap_or_default();

    let slots = [
        ("{FILENAME}", info.project.clone()),
        ("{DATE}", info.date.clone()),
        ("{MATERIAL}", material.name.clone()),
        ("{FEED_RATE}", format_feed(material.feed_rate)),
        ("{TOTAL_COMMANDS}", stats.moves.to_string()),
        ("{TOTAL_DISTANCE}", format!("{:.2}", stats.total_distance)),
        ("{ESTIMATED_TIME}", format!("{whole:.0} min {cut_seconds:.0} s")),
        ("{PAUSE_SECONDS}", format!("{:.1}", stats.pause_seconds())),
        ("{TOTAL_PAUSES}", stats.counts.total().to_string()),
        ("{SHORT_PAUSES}", stats.counts.short.to_string()),
        ("{MEDIUM_PAUSES}", stats.counts.medium.to_string()),
        ("{LONG_PAUSES}", stats.counts.long.to_string()),
        ("{SHORT_TAG}", format_seconds(pauses.short_dwell_seconds)),
        ("{MEDIUM_TAG}", format_seconds(pauses.medium_dwell_seconds)),
        ("{LONG_TAG}", format_seconds(pauses.long_dwell_seconds)),
        ("{TOTAL_TIME}", format!("{total_minutes:.0}")),
        ("{SCALE}", scale),
    ];

    let default_template;
    let template = match &info.template {
        Some(t) => t,
        None => {
            default_template = Template::default();
            &default_template
        }
    };

    let mut out = Vec::with_capacity(rewrite.lines.len() + 24);
    render(&template.header, &slots, &mut out);
    out.extend(rewrite.lines.iter().cloned());
    render(&template.footer, &slots, &mut out);
    out
}

fn fold_accent(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        _ => return None,
    };
    Some(folded)
}

/// `"Peça (final) v2.nc"` on 2026-10-18 -> `"Peca_final_v2_18_10_26.tap"`.
pub fn output_filename(original: &str, date: NaiveDate) -> String {
    let base = match original.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains(['/', '\\']) => stem,
        _ => original,
    };

    let mut name = String::with_capacity(base.len());
    for word in base.split_whitespace() {
        if !name.is_empty() {
            name.push('_');
        }
        for c in word.chars() {
            let c = fold_accent(c).unwrap_or(c);
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
            }
        }
    }
    if name.trim_matches('_').is_empty() {
        name = "program".to_string();
    }

    format!("{name}_{}.tap", date.format("%d_%m_%y"))
}

/// [`output_filename`] from separate date parts, as the browser sends them.
pub fn dated_filename(original: &str, year: i32, month: u32, day: u32) -> Result<String> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| TapError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))?;
    Ok(output_filename(original, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TierCounts;
    use crate::rewriter::RunStatistics;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
    }

    #[test]
    fn filename_is_sanitised_and_dated() {
        assert_eq!(output_filename("Peça (final) v2.nc", date()), "Peca_final_v2_18_10_26.tap");
        assert_eq!(output_filename("letters.tap", date()), "letters_18_10_26.tap");
        assert_eq!(output_filename("  a   b  ", date()), "a_b_18_10_26.tap");
        assert_eq!(output_filename("(#).tap", date()), "program_18_10_26.tap");
    }

    #[test]
    fn annotation_wraps_program() {
        let rewrite = Rewrite {
            lines: vec!["G01 X3".into(), "G04 P0.0".into()],
            stats: RunStatistics {
                total_distance: 600.0,
                counts: TierCounts { short: 1, medium: 2, long: 0 },
                estimated_time: 0.6,
                moves: 3,
            },
            diagnostics: Vec::new(),
        };
        let info = Annotation {
            project: "letters".into(),
            date: "18/10/2026".into(),
            scale: Some(ScaleRequest { current_length: 100.0, desired_length: 200.0 }),
            template: None,
        };
        let out = annotate(&rewrite, &Material::default(), &info);

        assert_eq!(out[0], "; Project: letters");
        assert!(out.contains(&"F600".to_string()));
        assert!(out.contains(&"; === BEGIN CUT ===".to_string()));
        let body = out.iter().position(|l| l == "G01 X3").expect("body present");
        assert_eq!(out[body + 1], "G04 P0.0");
        assert!(out.contains(&"; Total distance: 600.00 mm".to_string()));
        assert!(out.contains(&"; Cutting time: 2 min 0 s".to_string()));
        assert!(out.contains(&"; Pause time: 0.6 s".to_string()));
        assert!(out.contains(&"; Pauses: 3 total (1 x P0.0, 2 x P0.3, 0 x P0.5)".to_string()));
        assert!(out.contains(&"; Scale: 100mm -> 200mm (2.000000x)".to_string()));
        assert_eq!(out.last().map(String::as_str), Some("; Total estimated time: 3 min"));
    }

    fn small_run() -> Rewrite {
        Rewrite {
            lines: vec!["G01 X3".into(), "G04 P0.0".into()],
            stats: RunStatistics {
                total_distance: 3.0,
                counts: TierCounts { short: 1, medium: 0, long: 0 },
                estimated_time: 0.0,
                moves: 1,
            },
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn default_layout_without_scale() {
        let info = Annotation { project: "p".into(), date: "d".into(), ..Annotation::default() };
        let out = annotate(&small_run(), &Material::default(), &info);
        assert_eq!(
            out,
            vec![
                "; Project: p",
                "; Date: d",
                "; Material: EPS T1",
                "; Feed rate: 600 mm/min",
                "",
                "; === BEGIN CUT ===",
                "G90 ; absolute mode",
                "G92 X0 Y0 ; set origin",
                "F600",
                "",
                "G01 X3",
                "G04 P0.0",
                "",
                "; === END CUT ===",
                "",
                "; === STATISTICS ===",
                "; Linear moves: 1",
                "; Total distance: 3.00 mm",
                "; Cutting time: 0 min 1 s",
                "; Pause time: 0.0 s",
                "; Pauses: 1 total (1 x P0.0, 0 x P0.3, 0 x P0.5)",
                "; Total estimated time: 1 min",
            ]
        );
    }

    #[test]
    fn custom_template_fills_slots() {
        let info = Annotation {
            project: "sign".into(),
            date: "today".into(),
            scale: None,
            template: Some(Template {
                header: "(job {FILENAME} on {DATE})\nF{FEED_RATE}".into(),
                footer: "; {TOTAL_PAUSES} pauses, {PAUSE_SECONDS} s, {TOTAL_DISTANCE} mm\n{SCALE}\nM30".into(),
            }),
        };
        let out = annotate(&small_run(), &Material::default(), &info);
        assert_eq!(
            out,
            vec!["(job sign on today)", "F600", "G01 X3", "G04 P0.0", "; 1 pauses, 0.0 s, 3.00 mm", "M30"]
        );
    }

    #[cfg(feature = "cli")]
    #[test]
    fn template_reads_from_toml() {
        let t: Template = toml::from_str("footer = \"M30\"").expect("template");
        assert_eq!(t.footer, "M30");
        assert_eq!(t.header, Template::default().header);
    }
}
