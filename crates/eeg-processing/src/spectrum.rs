//! One-sided power spectra of component waveforms

use eeg_core::{EegError, EegResult};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

/// One-sided power spectrum of a mean-removed signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Frequency of every bin (Hz)
    pub frequencies: Vec<f64>,
    /// Squared magnitude of every bin
    pub power: Vec<f64>,
    /// Bin spacing (Hz)
    pub resolution: f64,
}

impl PowerSpectrum {
    /// Compute the spectrum of `samples` at `sample_rate`.
    ///
    /// The mean is removed first, so bin 0 carries no power.
    pub fn compute(samples: &[f64], sample_rate: f64) -> EegResult<Self> {
        let n = samples.len();
        if n < 2 {
            return Err(eeg_core::invalid_input!(
                "spectrum needs at least 2 samples, got {}",
                n
            ));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(eeg_core::invalid_input!("sample rate must be positive, got {}", sample_rate));
        }

        let mean = samples.iter().sum::<f64>() / n as f64;

        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(n);

        let mut input = r2c.make_input_vec();
        for (dst, &src) in input.iter_mut().zip(samples) {
            *dst = src - mean;
        }
        let mut output = r2c.make_output_vec();

        r2c.process(&mut input, &mut output)
            .map_err(|e| EegError::ProcessingError {
                message: format!("FFT failed: {}", e),
            })?;

        let resolution = sample_rate / n as f64;
        let frequencies = (0..output.len()).map(|k| k as f64 * resolution).collect();
        let power = output.iter().map(|c| c.norm_sqr()).collect();

        Ok(Self {
            frequencies,
            power,
            resolution,
        })
    }

    /// Power in all bins except DC
    pub fn total_power(&self) -> f64 {
        self.power.iter().skip(1).sum()
    }

    /// Power in bins with `low_hz <= f <= high_hz`, DC excluded
    pub fn band_power(&self, low_hz: f64, high_hz: f64) -> f64 {
        self.frequencies
            .iter()
            .zip(&self.power)
            .skip(1)
            .filter(|&(&f, _)| f >= low_hz && f <= high_hz)
            .map(|(_, &p)| p)
            .sum()
    }

    /// Fraction of the total power inside `[low_hz, high_hz]`; 0 for a flat signal
    pub fn band_power_ratio(&self, low_hz: f64, high_hz: f64) -> f64 {
        let total = self.total_power();
        if total <= 0.0 {
            return 0.0;
        }
        self.band_power(low_hz, high_hz) / total
    }

    /// Power of the bin nearest to `freq_hz`
    pub fn power_at(&self, freq_hz: f64) -> f64 {
        let bin = (freq_hz / self.resolution).round() as usize;
        self.power.get(bin).copied().unwrap_or(0.0)
    }

    /// Frequency of the strongest non-DC bin
    pub fn peak_frequency(&self) -> f64 {
        self.power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| self.frequencies[i])
            .unwrap_or(0.0)
    }
}

/// Fraction of signal power at or below `max_hz`
pub fn low_frequency_ratio(samples: &[f64], sample_rate: f64, max_hz: f64) -> EegResult<f64> {
    Ok(PowerSpectrum::compute(samples, sample_rate)?.band_power_ratio(0.0, max_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn mixture(fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                10.0 + 3.0 * (2.0 * PI * 2.0 * t).sin() + (2.0 * PI * 20.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_peak_and_band_power() {
        let fs = 200.0;
        let spectrum = PowerSpectrum::compute(&mixture(fs, 2000), fs).unwrap();

        assert_relative_eq!(spectrum.resolution, 0.1, epsilon = 1e-12);
        assert_relative_eq!(spectrum.peak_frequency(), 2.0, epsilon = 1e-9);
        // DC removed
        assert!(spectrum.power[0] < 1e-9);

        // 3² : 1² power split between the two tones
        let low = spectrum.band_power_ratio(0.0, 4.0);
        assert_relative_eq!(low, 0.9, epsilon = 1e-6);
        assert!(spectrum.power_at(20.0) > 0.0);
        assert_relative_eq!(spectrum.power_at(2.0) / spectrum.power_at(20.0), 9.0, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_signal_has_zero_ratio() {
        let ratio = low_frequency_ratio(&[5.0; 64], 100.0, 4.0).unwrap();
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_too_short_signal() {
        assert!(PowerSpectrum::compute(&[1.0], 100.0).is_err());
        assert!(PowerSpectrum::compute(&[1.0, 2.0], 0.0).is_err());
    }
}
