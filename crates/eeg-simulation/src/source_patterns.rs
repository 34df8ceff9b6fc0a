//! Waveforms of simulated cortical and artifact sources

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Time course of one simulated source (microvolts)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SourcePattern {
    /// Sinusoidal rhythm (alpha, theta, ...)
    Rhythm { frequency: f64, amplitude: f64 },
    /// White Gaussian background activity
    Noise { std_dev: f64 },
    /// Slow periodic Gaussian bumps, as produced by eye blinks
    Blinks {
        interval_secs: f64,
        amplitude: f64,
        width_secs: f64,
    },
    /// Abrupt steps with exponential recovery, as produced by a loose electrode
    ElectrodePops {
        interval_secs: f64,
        amplitude: f64,
        decay_secs: f64,
    },
    /// Very slow baseline drift
    Drift { frequency: f64, amplitude: f64 },
}

impl SourcePattern {
    /// Source value at `time` seconds
    pub fn value_at<R: Rng + ?Sized>(&self, time: f64, rng: &mut R) -> f64 {
        match *self {
            SourcePattern::Rhythm { frequency, amplitude }
            | SourcePattern::Drift { frequency, amplitude } => {
                amplitude * (2.0 * PI * frequency * time).sin()
            }

            SourcePattern::Noise { std_dev } => {
                let z: f64 = StandardNormal.sample(rng);
                std_dev * z
            }

            SourcePattern::Blinks { interval_secs, amplitude, width_secs } => {
                let phase = time.rem_euclid(interval_secs) - interval_secs / 2.0;
                amplitude * (-0.5 * (phase / width_secs).powi(2)).exp()
            }

            SourcePattern::ElectrodePops { interval_secs, amplitude, decay_secs } => {
                let phase = time.rem_euclid(interval_secs);
                amplitude * (-phase / decay_secs).exp()
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SourcePattern::Rhythm { .. } => "Cortical rhythm",
            SourcePattern::Noise { .. } => "Background activity",
            SourcePattern::Blinks { .. } => "Eye blinks",
            SourcePattern::ElectrodePops { .. } => "Electrode pops",
            SourcePattern::Drift { .. } => "Baseline drift",
        }
    }

    /// Whether the pattern describes an artifact rather than brain activity
    pub fn is_artifact(&self) -> bool {
        matches!(
            self,
            SourcePattern::Blinks { .. } | SourcePattern::ElectrodePops { .. } | SourcePattern::Drift { .. }
        )
    }

    /// Check that all durations and scales are positive and finite
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            SourcePattern::Rhythm { frequency, amplitude }
            | SourcePattern::Drift { frequency, amplitude } => positive(frequency) && amplitude.is_finite(),
            SourcePattern::Noise { std_dev } => std_dev.is_finite() && std_dev >= 0.0,
            SourcePattern::Blinks { interval_secs, amplitude, width_secs } => {
                positive(interval_secs) && positive(width_secs) && amplitude.is_finite()
            }
            SourcePattern::ElectrodePops { interval_secs, amplitude, decay_secs } => {
                positive(interval_secs) && positive(decay_secs) && amplitude.is_finite()
            }
        }
    }

    /// Common source presets
    pub fn presets() -> Vec<(&'static str, SourcePattern)> {
        vec![
            ("Alpha", SourcePattern::Rhythm { frequency: 10.0, amplitude: 20.0 }),
            ("Theta", SourcePattern::Rhythm { frequency: 6.0, amplitude: 15.0 }),
            ("Beta", SourcePattern::Rhythm { frequency: 20.0, amplitude: 5.0 }),
            ("Background", SourcePattern::Noise { std_dev: 10.0 }),
            ("Blinks", SourcePattern::Blinks {
                interval_secs: 3.0, amplitude: 150.0, width_secs: 0.1
            }),
            ("Electrode Pops", SourcePattern::ElectrodePops {
                interval_secs: 2.5, amplitude: 200.0, decay_secs: 0.2
            }),
            ("Sweat Drift", SourcePattern::Drift { frequency: 0.1, amplitude: 40.0 }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rhythm_values() {
        let mut rng = StdRng::seed_from_u64(0);
        let alpha = SourcePattern::Rhythm { frequency: 10.0, amplitude: 20.0 };
        assert!(alpha.value_at(0.0, &mut rng).abs() < 1e-12);
        assert!((alpha.value_at(0.025, &mut rng) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_blink_peaks_mid_interval() {
        let mut rng = StdRng::seed_from_u64(0);
        let blinks = SourcePattern::Blinks { interval_secs: 2.0, amplitude: 100.0, width_secs: 0.1 };
        assert!((blinks.value_at(1.0, &mut rng) - 100.0).abs() < 1e-9);
        assert!((blinks.value_at(3.0, &mut rng) - 100.0).abs() < 1e-9);
        assert!(blinks.value_at(0.0, &mut rng) < 1e-6);
    }

    #[test]
    fn test_pops_decay() {
        let mut rng = StdRng::seed_from_u64(0);
        let pops = SourcePattern::ElectrodePops { interval_secs: 1.0, amplitude: 50.0, decay_secs: 0.1 };
        assert_eq!(pops.value_at(0.0, &mut rng), 50.0);
        assert!(pops.value_at(0.5, &mut rng) < 1.0);
    }

    #[test]
    fn test_presets_are_valid() {
        for (name, pattern) in SourcePattern::presets() {
            assert!(pattern.is_valid(), "{}", name);
            assert!(!pattern.description().is_empty());
        }
        assert!(!SourcePattern::Blinks { interval_secs: 0.0, amplitude: 1.0, width_secs: 0.1 }.is_valid());
        assert!(SourcePattern::Blinks { interval_secs: 1.0, amplitude: 1.0, width_secs: 0.1 }.is_artifact());
        assert!(!SourcePattern::Noise { std_dev: 1.0 }.is_artifact());
    }
}
