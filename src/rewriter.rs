use serde::Serialize;

use crate::engine::{RunState, TierCounts};
use crate::error::{Result, TapError};
use crate::motion::{Axis, MoveRecord};
use crate::policy::PausePolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Fail on the first unreadable X/Y number instead of holding the axis.
    pub strict: bool,
}

/// An unreadable coordinate that was treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based line of the rewriter's input; `process` maps it back to the
    /// source text.
    pub line: usize,
    pub axis: Axis,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RunStatistics {
    pub total_distance: f64,
    pub counts: TierCounts,
    /// Seconds spent dwelling, from each tier's configured duration.
    pub estimated_time: f64,
    pub moves: u32,
}

impl RunStatistics {
    fn from_state(state: &RunState, policy: &PausePolicy) -> Self {
        let c = state.counts;
        let estimated_time = f64::from(c.short) * policy.short_dwell_seconds
            + f64::from(c.medium) * policy.medium_dwell_seconds
            + f64::from(c.long) * policy.long_dwell_seconds;
        Self {
            total_distance: state.total_distance,
            counts: c,
            estimated_time,
            moves: c.total(),
        }
    }

    pub fn pause_seconds(&self) -> f64 {
        self.estimated_time
    }

    /// Cutting time in minutes, assuming the machine averages half the
    /// programmed feed once acceleration is accounted for.
    pub fn cutting_minutes(&self, feed_rate: f64) -> f64 {
        if feed_rate <= 0.0 {
            return 0.0;
        }
        self.total_distance / (feed_rate * 0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rewrite {
    pub lines: Vec<String>,
    pub stats: RunStatistics,
    pub diagnostics: Vec<Diagnostic>,
}

/// Copies the program, following every move with the dwell its travel
/// distance calls for. Non-move lines pass through untouched and do not move
/// the cursor.
pub fn rewrite<I, S>(lines: I, policy: &PausePolicy, opts: &RewriteOptions) -> Result<Rewrite>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut state = RunState::new();
    let mut out = Vec::new();
    let mut diagnostics = Vec::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        let Some(rec) = MoveRecord::parse(line) else {
            out.push(line.to_string());
            continue;
        };

        for (axis, token) in &rec.malformed {
            if opts.strict {
                return Err(TapError::MalformedCoordinate {
                    line: idx + 1,
                    axis: *axis,
                    token: token.clone(),
                });
            }
            console_log!("line {}: unreadable {} value {:?}, holding axis", idx + 1, axis, token);
            diagnostics.push(Diagnostic { line: idx + 1, axis: *axis, token: token.clone() });
        }

        let target = rec.resolve(state.cursor);
        let (next, outcome) = state.step(target, policy);
        log::trace!(
            "line {}: D={:.4} {:?} acc={:.4}",
            idx + 1,
            outcome.distance,
            outcome.tier,
            outcome.accumulator
        );
        out.push(line.to_string());
        out.push(outcome.dwell);
        state = next;
    }

    let stats = RunStatistics::from_state(&state, policy);
    console_log!(
        "rewrite: {} moves, {:.2} total distance, {} diagnostics",
        stats.moves,
        stats.total_distance,
        diagnostics.len()
    );
    Ok(Rewrite { lines: out, stats, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::approx_eq;

    #[test]
    fn short_medium_long_run() {
        let input = ["G01 X3", "G01 Y40", "G01 Y100"];
        let r = rewrite(input, &PausePolicy::default(), &RewriteOptions::default()).expect("rewrite");
        assert_eq!(
            r.lines,
            vec!["G01 X3", "G04 P0.0", "G01 Y40", "G04 P0.3", "G01 Y100", "G04 P0.5"]
        );
        assert_eq!(r.stats.counts, TierCounts { short: 1, medium: 1, long: 1 });
        approx_eq(r.stats.total_distance, 103.0);
        approx_eq(r.stats.estimated_time, 0.8);
        assert_eq!(r.stats.moves, 3);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn non_moves_keep_their_place() {
        let input = ["G01 X10 Y0", "M3 ; spindle", "G01 X10 Y2"];
        let r = rewrite(input, &PausePolicy::default(), &RewriteOptions::default()).expect("rewrite");
        assert_eq!(
            r.lines,
            vec!["G01 X10 Y0", "G04 P0.3", "M3 ; spindle", "G01 X10 Y2", "G04 P0.0"]
        );
        assert_eq!(r.lines.iter().filter(|l| l.as_str() == "M3 ; spindle").count(), 1);
    }

    #[test]
    fn axisless_g01_is_not_a_zero_move() {
        let input = ["G01 F600", "G01 X0 Y0"];
        let r = rewrite(input, &PausePolicy::default(), &RewriteOptions::default()).expect("rewrite");
        assert_eq!(r.lines, vec!["G01 F600", "G01 X0 Y0", "G04 P0.0"]);
        assert_eq!(r.stats.moves, 1);
        approx_eq(r.stats.total_distance, 0.0);
    }

    #[test]
    fn malformed_token_is_reported_in_lenient_mode() {
        let input = ["G01 X20", "G01 X- Y2"];
        let r = rewrite(input, &PausePolicy::default(), &RewriteOptions::default()).expect("rewrite");
        assert_eq!(r.lines[3], "G04 P0.0");
        assert_eq!(
            r.diagnostics,
            vec![Diagnostic { line: 2, axis: Axis::X, token: "-".to_string() }]
        );
        approx_eq(r.stats.total_distance, 22.0);
    }

    #[test]
    fn malformed_token_fails_in_strict_mode() {
        let input = ["G01 X20", "G01 Y+"];
        let err = rewrite(input, &PausePolicy::default(), &RewriteOptions { strict: true })
            .expect_err("strict must fail");
        assert_eq!(
            err,
            TapError::MalformedCoordinate { line: 2, axis: Axis::Y, token: "+".to_string() }
        );
    }

    #[test]
    fn custom_policy_drives_tags_and_time() {
        let policy = PausePolicy {
            short_threshold: 1.0,
            medium_threshold: 2.0,
            short_dwell_seconds: 0.1,
            medium_dwell_seconds: 1.0,
            long_dwell_seconds: 2.5,
        };
        let r = rewrite(["G1 X1", "G1 X3", "G1 X10"], &policy, &RewriteOptions::default()).expect("rewrite");
        assert_eq!(r.lines[1], "G04 P0.1");
        assert_eq!(r.lines[3], "G04 P1.0");
        assert_eq!(r.lines[5], "G04 P2.5");
        approx_eq(r.stats.estimated_time, 3.6);
    }

    #[test]
    fn cutting_time_uses_half_feed() {
        let stats = RunStatistics { total_distance: 600.0, ..Default::default() };
        approx_eq(stats.cutting_minutes(600.0), 2.0);
        approx_eq(stats.cutting_minutes(0.0), 0.0);
    }
}
