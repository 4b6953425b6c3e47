use serde::{Deserialize, Serialize};

use crate::error::{Result, TapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseTier {
    Short,
    Medium,
    Long,
}

impl PauseTier {
    /// Only short moves keep the distance accumulator running.
    pub fn resets_accumulator(self) -> bool {
        !matches!(self, PauseTier::Short)
    }
}

/// Distance thresholds and dwell durations. The dwell tag written into the
/// program is rendered from the same seconds value used for time estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PausePolicy {
    pub short_threshold: f64,
    pub medium_threshold: f64,
    pub short_dwell_seconds: f64,
    pub medium_dwell_seconds: f64,
    pub long_dwell_seconds: f64,
}

impl Default for PausePolicy {
    fn default() -> Self {
        Self {
            short_threshold: 5.0,
            medium_threshold: 50.0,
            short_dwell_seconds: 0.0,
            medium_dwell_seconds: 0.3,
            long_dwell_seconds: 0.5,
        }
    }
}

impl PausePolicy {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("short_threshold", self.short_threshold),
            ("medium_threshold", self.medium_threshold),
            ("short_dwell_seconds", self.short_dwell_seconds),
            ("medium_dwell_seconds", self.medium_dwell_seconds),
            ("long_dwell_seconds", self.long_dwell_seconds),
        ];
        for (name, v) in fields {
            if !v.is_finite() || v < 0.0 {
                return Err(TapError::InvalidPolicy(format!(
                    "{name} must be a finite non-negative number, got {v}"
                )));
            }
        }
        if self.short_threshold > self.medium_threshold {
            return Err(TapError::InvalidPolicy(format!(
                "short_threshold ({}) exceeds medium_threshold ({})",
                self.short_threshold, self.medium_threshold
            )));
        }
        Ok(())
    }

    /// Boundary values belong to the lower tier.
    pub fn classify(&self, distance: f64) -> PauseTier {
        if distance <= self.short_threshold {
            PauseTier::Short
        } else if distance <= self.medium_threshold {
            PauseTier::Medium
        } else {
            PauseTier::Long
        }
    }

    pub fn dwell_seconds(&self, tier: PauseTier) -> f64 {
        match tier {
            PauseTier::Short => self.short_dwell_seconds,
            PauseTier::Medium => self.medium_dwell_seconds,
            PauseTier::Long => self.long_dwell_seconds,
        }
    }

    pub fn dwell_command(&self, tier: PauseTier) -> String {
        format!("G04 P{}", format_seconds(self.dwell_seconds(tier)))
    }
}

/// `0` -> `0.0`, `0.3` -> `0.3`, `0.25` -> `0.25`.
pub(crate) fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.1}")
    } else {
        format!("{seconds}")
    }
}

/// Stock material preset: cutting feed plus its pause policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// mm/min
    pub feed_rate: f64,
    #[serde(default)]
    pub pauses: PausePolicy,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            id: "T1".to_string(),
            name: "EPS T1".to_string(),
            description: "Standard low density EPS".to_string(),
            feed_rate: 600.0,
            pauses: PausePolicy::default(),
        }
    }
}

impl Material {
    pub fn presets() -> Vec<Material> {
        vec![
            Material::default(),
            Material {
                id: "T2".to_string(),
                name: "EPS T2".to_string(),
                description: "Medium density EPS".to_string(),
                feed_rate: 500.0,
                pauses: PausePolicy {
                    short_threshold: 8.0,
                    medium_threshold: 40.0,
                    short_dwell_seconds: 0.1,
                    medium_dwell_seconds: 0.4,
                    long_dwell_seconds: 0.7,
                },
            },
        ]
    }

    /// Case-insensitive lookup among the built-in presets.
    pub fn preset(id: &str) -> Result<Material> {
        Self::presets()
            .into_iter()
            .find(|m| m.id.eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| TapError::UnknownMaterial(id.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.feed_rate.is_finite() || self.feed_rate <= 0.0 {
            return Err(TapError::InvalidPolicy(format!(
                "feed_rate must be positive, got {}",
                self.feed_rate
            )));
        }
        self.pauses.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_fall_into_lower_tier() {
        let p = PausePolicy::default();
        assert_eq!(p.classify(0.0), PauseTier::Short);
        assert_eq!(p.classify(5.0), PauseTier::Short);
        assert_eq!(p.classify(5.0001), PauseTier::Medium);
        assert_eq!(p.classify(50.0), PauseTier::Medium);
        assert_eq!(p.classify(50.0001), PauseTier::Long);
    }

    #[test]
    fn default_dwell_commands() {
        let p = PausePolicy::default();
        assert_eq!(p.dwell_command(PauseTier::Short), "G04 P0.0");
        assert_eq!(p.dwell_command(PauseTier::Medium), "G04 P0.3");
        assert_eq!(p.dwell_command(PauseTier::Long), "G04 P0.5");
    }

    #[test]
    fn dwell_tag_tracks_seconds() {
        let p = PausePolicy { medium_dwell_seconds: 0.25, long_dwell_seconds: 2.0, ..Default::default() };
        assert_eq!(p.dwell_command(PauseTier::Medium), "G04 P0.25");
        assert_eq!(p.dwell_command(PauseTier::Long), "G04 P2.0");
    }

    #[test]
    fn only_short_tier_keeps_accumulator() {
        assert!(!PauseTier::Short.resets_accumulator());
        assert!(PauseTier::Medium.resets_accumulator());
        assert!(PauseTier::Long.resets_accumulator());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(PausePolicy::default().validate().is_ok());
        let inverted = PausePolicy { short_threshold: 60.0, ..Default::default() };
        assert!(matches!(inverted.validate(), Err(TapError::InvalidPolicy(_))));
        let negative = PausePolicy { long_dwell_seconds: -1.0, ..Default::default() };
        assert!(negative.validate().is_err());
        let nan = PausePolicy { medium_threshold: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn presets_lookup() {
        let t2 = Material::preset("t2").expect("T2 preset");
        assert_eq!(t2.feed_rate, 500.0);
        assert_eq!(t2.pauses.classify(8.0), PauseTier::Short);
        assert_eq!(t2.pauses.classify(41.0), PauseTier::Long);
        assert!(matches!(Material::preset("T9"), Err(TapError::UnknownMaterial(_))));
        for m in Material::presets() {
            assert!(m.validate().is_ok(), "{} should validate", m.id);
        }
    }
}
