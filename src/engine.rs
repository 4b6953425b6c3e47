use serde::Serialize;

use crate::motion::Point;
use crate::policy::{PausePolicy, PauseTier};

/// Max of the per-axis deltas (L-infinity), not Euclidean.
pub fn chebyshev(a: Point, b: Point) -> f64 {
    (b.x - a.x).abs().max((b.y - a.y).abs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TierCounts {
    pub short: u32,
    pub medium: u32,
    pub long: u32,
}

impl TierCounts {
    pub fn total(&self) -> u32 {
        self.short + self.medium + self.long
    }

    fn bump(&mut self, tier: PauseTier) {
        match tier {
            PauseTier::Short => self.short += 1,
            PauseTier::Medium => self.medium += 1,
            PauseTier::Long => self.long += 1,
        }
    }
}

/// What one move produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub distance: f64,
    pub tier: PauseTier,
    pub dwell: String,
    /// Accumulator after this move.
    pub accumulator: f64,
}

/// Everything carried from one move to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunState {
    pub cursor: Point,
    /// Running distance over consecutive short moves. Reported only, never
    /// consulted for classification.
    pub accumulator: f64,
    pub total_distance: f64,
    pub counts: TierCounts,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the state across one move to `target`.
    pub fn step(self, target: Point, policy: &PausePolicy) -> (RunState, MoveOutcome) {
        let distance = chebyshev(self.cursor, target);
        let tier = policy.classify(distance);

        let mut accumulator = self.accumulator + distance;
        if tier.resets_accumulator() {
            accumulator = 0.0;
        }
        let mut counts = self.counts;
        counts.bump(tier);

        let next = RunState {
            cursor: target,
            accumulator,
            total_distance: self.total_distance + distance,
            counts,
        };
        let outcome = MoveOutcome {
            distance,
            tier,
            dwell: policy.dwell_command(tier),
            accumulator,
        };
        (next, outcome)
    }
}
