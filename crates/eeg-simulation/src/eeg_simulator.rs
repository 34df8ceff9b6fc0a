//! Multi-electrode EEG simulator built from linearly mixed sources

use crate::source_patterns::SourcePattern;
use eeg_core::{EegResult, Lead, Record};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// One source and its projection onto the electrodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSource {
    pub name: String,
    pub pattern: SourcePattern,
    /// Weight of the source on each electrode, in electrode order
    pub weights: Vec<f64>,
}

impl SimulatedSource {
    pub fn new(name: impl Into<String>, pattern: SourcePattern, weights: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            pattern,
            weights,
        }
    }
}

/// Configuration for EEG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Name of the generated record
    pub name: String,
    /// Sampling rate in Hz
    pub sample_rate: f64,
    /// Electrode names (10-20 labels determine the electrode region)
    pub electrodes: Vec<String>,
    pub sources: Vec<SimulatedSource>,
    /// Independent Gaussian noise added to every electrode
    pub sensor_noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    /// Six electrodes with alpha, theta, background activity and blinks
    fn default() -> Self {
        let electrodes = ["Fp1", "Fp2", "C3", "C4", "O1", "O2"];
        Self {
            name: "simulated".to_string(),
            sample_rate: 250.0,
            electrodes: electrodes.iter().map(|e| e.to_string()).collect(),
            sources: vec![
                SimulatedSource::new(
                    "alpha",
                    SourcePattern::Rhythm { frequency: 10.0, amplitude: 20.0 },
                    vec![0.1, 0.1, 0.4, 0.4, 1.0, 0.9],
                ),
                SimulatedSource::new(
                    "theta",
                    SourcePattern::Rhythm { frequency: 6.0, amplitude: 15.0 },
                    vec![0.3, 0.3, 1.0, 0.8, 0.2, 0.2],
                ),
                SimulatedSource::new(
                    "background",
                    SourcePattern::Noise { std_dev: 10.0 },
                    vec![0.5, 0.6, 0.7, 0.6, 0.5, 0.4],
                ),
                SimulatedSource::new(
                    "blinks",
                    SourcePattern::Blinks { interval_secs: 3.0, amplitude: 150.0, width_secs: 0.1 },
                    vec![1.0, 0.95, 0.2, 0.2, 0.02, 0.02],
                ),
            ],
            sensor_noise_std: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Same montage as the default, plus a popping O2 electrode
    pub fn with_electrode_pops() -> Self {
        let mut config = Self::default();
        config.name = "simulated with pops".to_string();
        config.sources.push(SimulatedSource::new(
            "pops",
            SourcePattern::ElectrodePops { interval_secs: 2.5, amplitude: 200.0, decay_secs: 0.2 },
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ));
        config
    }

    pub fn validate(&self) -> EegResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(eeg_core::config_error!("sample rate must be positive, got {}", self.sample_rate));
        }
        if self.electrodes.is_empty() {
            return Err(eeg_core::config_error!("at least one electrode is required"));
        }
        if !(self.sensor_noise_std.is_finite() && self.sensor_noise_std >= 0.0) {
            return Err(eeg_core::config_error!(
                "sensor noise must not be negative, got {}",
                self.sensor_noise_std
            ));
        }
        for source in &self.sources {
            if source.weights.len() != self.electrodes.len() {
                return Err(eeg_core::config_error!(
                    "source '{}' has {} weights for {} electrodes",
                    source.name,
                    source.weights.len(),
                    self.electrodes.len()
                ));
            }
            if !source.pattern.is_valid() {
                return Err(eeg_core::config_error!("source '{}' has an invalid pattern", source.name));
            }
        }
        Ok(())
    }

    /// Electrodes × sources mixing matrix
    pub fn mixing_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.electrodes.len(), self.sources.len()), |(e, s)| {
            self.sources[s].weights[e]
        })
    }
}

/// A generated record together with the ground truth behind it
#[derive(Debug, Clone)]
pub struct Simulation {
    pub record: Record,
    /// Sources × samples
    pub sources: Array2<f64>,
    /// Electrodes × sources
    pub mixing: Array2<f64>,
}

/// EEG simulator
pub struct EEGSimulator {
    config: SimulationConfig,
    rng: StdRng,
    sensor_noise: Normal<f64>,
    time_offset: f64,
}

impl EEGSimulator {
    pub fn new(config: SimulationConfig) -> EegResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        let sensor_noise = Normal::new(0.0, config.sensor_noise_std)
            .map_err(|e| eeg_core::config_error!("Failed to create noise distribution: {}", e))?;

        Ok(EEGSimulator {
            config,
            rng: StdRng::seed_from_u64(seed),
            sensor_noise,
            time_offset: 0.0,
        })
    }

    /// Generate `duration` seconds; consecutive calls continue in time
    pub fn generate(&mut self, duration: f64) -> EegResult<Simulation> {
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(eeg_core::invalid_input!("duration must not be negative, got {}", duration));
        }

        let samples = (duration * self.config.sample_rate).round() as usize;
        let dt = 1.0 / self.config.sample_rate;

        let mut sources = Array2::zeros((self.config.sources.len(), samples));
        for i in 0..samples {
            let time = self.time_offset + i as f64 * dt;
            for (s, source) in self.config.sources.iter().enumerate() {
                sources[[s, i]] = source.pattern.value_at(time, &mut self.rng);
            }
        }

        let mixing = self.config.mixing_matrix();
        let mut signals = mixing.dot(&sources);
        signals.mapv_inplace(|v| v + self.sensor_noise.sample(&mut self.rng));

        let leads = self.config
            .electrodes
            .iter()
            .zip(signals.rows())
            .map(|(name, row)| Lead::electrode(name.clone(), row.to_vec()))
            .collect();

        self.time_offset += samples as f64 * dt;

        Ok(Simulation {
            record: Record::new(self.config.name.clone(), self.config.sample_rate, leads)?,
            sources,
            mixing,
        })
    }

    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::LeadType;

    fn seeded(config: SimulationConfig) -> EEGSimulator {
        EEGSimulator::new(SimulationConfig { seed: Some(42), ..config }).unwrap()
    }

    #[test]
    fn test_default_simulation() {
        let simulation = seeded(SimulationConfig::default()).generate(2.0).unwrap();

        assert_eq!(simulation.record.lead_count(), 6);
        assert_eq!(simulation.record.sample_count(), 500);
        assert_eq!(simulation.record.sample_rate, 250.0);
        assert_eq!(simulation.sources.dim(), (4, 500));
        assert_eq!(simulation.mixing.dim(), (6, 4));
        assert_eq!(simulation.record.leads()[0].lead_type(), LeadType::Frontal);

        for stats in simulation.record.lead_stats() {
            assert!(stats.std_dev > 0.0);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = seeded(SimulationConfig::default()).generate(1.0).unwrap();
        let b = seeded(SimulationConfig::default()).generate(1.0).unwrap();
        assert_eq!(a.record.lead_matrix(), b.record.lead_matrix());
    }

    #[test]
    fn test_noiseless_record_is_mixing_times_sources() {
        let config = SimulationConfig {
            sensor_noise_std: 0.0,
            ..SimulationConfig::with_electrode_pops()
        };
        let simulation = seeded(config).generate(1.0).unwrap();

        let expected = simulation.mixing.dot(&simulation.sources);
        let actual = simulation.record.lead_matrix();
        for (e, a) in expected.iter().zip(actual.iter()) {
            assert!((e - a).abs() < 1e-9);
        }
    }

    #[test]
    fn test_generation_continues_in_time() {
        let config = SimulationConfig {
            sources: vec![SimulatedSource::new(
                "alpha",
                SourcePattern::Rhythm { frequency: 10.0, amplitude: 1.0 },
                vec![1.0],
            )],
            electrodes: vec!["O1".to_string()],
            sensor_noise_std: 0.0,
            ..SimulationConfig::default()
        };
        let mut simulator = seeded(config);

        let whole = seeded(simulator.config().clone()).generate(2.0).unwrap();
        let first = simulator.generate(1.0).unwrap();
        let second = simulator.generate(1.0).unwrap();

        assert_eq!(first.record.leads()[0].samples[..], whole.record.leads()[0].samples[..250]);
        for (a, b) in second.record.leads()[0].samples.iter().zip(&whole.record.leads()[0].samples[250..]) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SimulationConfig::default();
        config.sources[0].weights.pop();
        assert!(EEGSimulator::new(config).is_err());

        let config = SimulationConfig { sample_rate: 0.0, ..SimulationConfig::default() };
        assert!(EEGSimulator::new(config).is_err());

        let config = SimulationConfig { electrodes: Vec::new(), ..SimulationConfig::default() };
        assert!(EEGSimulator::new(config).is_err());
    }
}
