//! Butterworth filters built from cascaded biquad sections

use eeg_core::{EegResult, Lead, Record};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Filter types supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    /// Butterworth lowpass filter
    ButterworthLowpass,
    /// Butterworth highpass filter
    ButterworthHighpass,
}

/// Filter configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Filter order (even, one biquad per two poles)
    pub order: usize,
    /// Cutoff frequency (Hz)
    pub cutoff_hz: f64,
}

impl FilterConfig {
    /// Create lowpass filter configuration
    pub fn lowpass(cutoff_hz: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthLowpass,
            order,
            cutoff_hz,
        }
    }

    /// Create highpass filter configuration
    pub fn highpass(cutoff_hz: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthHighpass,
            order,
            cutoff_hz,
        }
    }

    pub fn validate(&self, sample_rate: f64) -> EegResult<()> {
        if self.order == 0 || self.order % 2 != 0 || self.order > MAX_ORDER {
            return Err(eeg_core::config_error!(
                "filter order must be even and in 2..={}, got {}",
                MAX_ORDER,
                self.order
            ));
        }

        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(eeg_core::config_error!("sample rate must be positive, got {}", sample_rate));
        }

        if !(self.cutoff_hz > 0.0 && self.cutoff_hz < sample_rate / 2.0) {
            return Err(eeg_core::config_error!(
                "cutoff {} Hz must lie in (0, {}) Hz",
                self.cutoff_hz,
                sample_rate / 2.0
            ));
        }

        Ok(())
    }
}

const MAX_ORDER: usize = 12;

/// Single biquad section (2nd order)
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadSection {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f64, b1: f64, b2: f64,
    a1: f64, a2: f64,
}

impl BiquadSection {
    /// Bilinear-transform section with prewarped `k = tan(ωc/2)` and quality `q`
    fn design(filter_type: FilterType, k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);

        let (b0, b1, b2) = match filter_type {
            FilterType::ButterworthLowpass => {
                let b0 = k2 * norm;
                (b0, 2.0 * b0, b0)
            }
            FilterType::ButterworthHighpass => (norm, -2.0 * norm, norm),
        };

        Self {
            b0, b1, b2,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
        }
    }

    /// Gain for a constant input
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Run the section over `data` in place.
    ///
    /// State starts at the steady state for a constant input equal to the
    /// first sample, which keeps offsets from producing a start-up transient.
    fn process_in_place(&self, data: &mut [f64]) {
        let Some(&first) = data.first() else { return };

        let steady = first * self.dc_gain();
        let (mut x1, mut x2) = (first, first);
        let (mut y1, mut y2) = (steady, steady);

        for sample in data.iter_mut() {
            let input = *sample;
            let output = self.b0 * input + self.b1 * x1 + self.b2 * x2
                - self.a1 * y1 - self.a2 * y2;

            x2 = x1;
            x1 = input;
            y2 = y1;
            y1 = output;

            *sample = output;
        }
    }
}

/// Butterworth filter of arbitrary even order
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    config: FilterConfig,
    sample_rate: f64,
    biquads: Vec<BiquadSection>,
}

impl ButterworthFilter {
    /// Design the filter for the given sampling rate
    pub fn new(config: FilterConfig, sample_rate: f64) -> EegResult<Self> {
        config.validate(sample_rate)?;

        let k = (PI * config.cutoff_hz / sample_rate).tan();
        let order = config.order;

        // Butterworth pole pairs: Q_i = 1 / (2 cos(π(2i+1)/(2N)))
        let biquads = (0..order / 2)
            .map(|i| {
                let theta = PI * (2 * i + 1) as f64 / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.cos());
                BiquadSection::design(config.filter_type, k, q)
            })
            .collect();

        Ok(Self {
            config,
            sample_rate,
            biquads,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Causal filtering
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let mut output = input.to_vec();
        self.run_cascade(&mut output);
        output
    }

    /// Forward-backward filtering: no phase shift, squared magnitude response
    pub fn apply_zero_phase(&self, input: &[f64]) -> Vec<f64> {
        let mut output = input.to_vec();
        self.run_cascade(&mut output);
        output.reverse();
        self.run_cascade(&mut output);
        output.reverse();
        output
    }

    fn run_cascade(&self, data: &mut [f64]) {
        for biquad in &self.biquads {
            biquad.process_in_place(data);
        }
    }
}

/// Zero-phase filter every lead of a record, keeping descriptors and ranges
pub fn filter_record(record: &Record, config: &FilterConfig) -> EegResult<Record> {
    let filter = ButterworthFilter::new(config.clone(), record.sample_rate)?;

    let leads = record
        .leads()
        .iter()
        .map(|lead| Lead {
            name: lead.name.clone(),
            samples: filter.apply_zero_phase(&lead.samples),
            electrode: lead.electrode,
        })
        .collect();

    Record::new(record.name.clone(), record.sample_rate, leads)?
        .with_ranges(record.ranges().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::{EegError, TimeRange};

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_highpass_attenuates_low_frequency() {
        let fs = 250.0;
        let filter = ButterworthFilter::new(FilterConfig::highpass(10.0, 4), fs).unwrap();

        let slow = tone(1.0, fs, 2500);
        let fast = tone(40.0, fs, 2500);

        let slow_out = filter.apply_zero_phase(&slow);
        let fast_out = filter.apply_zero_phase(&fast);

        assert_eq!(slow_out.len(), slow.len());
        assert!(rms(&slow_out) < 0.05 * rms(&slow));
        assert!((rms(&fast_out) / rms(&fast) - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let fs = 1000.0;
        let filter = ButterworthFilter::new(FilterConfig::lowpass(20.0, 2), fs).unwrap();

        let out = filter.apply(&tone(200.0, fs, 2000));
        assert!(rms(&out[500..]) < 0.02);

        // Constant input passes through unchanged
        let dc = filter.apply(&[3.0; 100]);
        assert!(dc.iter().all(|x| (x - 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_highpass_removes_offset_without_transient() {
        let filter = ButterworthFilter::new(FilterConfig::highpass(5.0, 2), 200.0).unwrap();
        let out = filter.apply_zero_phase(&[50.0; 400]);
        assert!(out.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn test_zero_phase_has_no_delay() {
        let fs = 500.0;
        let filter = ButterworthFilter::new(FilterConfig::lowpass(50.0, 4), fs).unwrap();
        let input = tone(5.0, fs, 1000);
        let out = filter.apply_zero_phase(&input);

        // Mid-signal samples match the input closely: no lag, unit passband gain
        for i in 300..700 {
            assert!((out[i] - input[i]).abs() < 0.01);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        let above_nyquist = ButterworthFilter::new(FilterConfig::highpass(150.0, 4), 250.0);
        assert!(matches!(above_nyquist, Err(EegError::ConfigurationError { .. })));

        let odd_order = ButterworthFilter::new(FilterConfig::highpass(10.0, 3), 250.0);
        assert!(odd_order.is_err());

        let zero_cutoff = ButterworthFilter::new(FilterConfig::lowpass(0.0, 2), 250.0);
        assert!(zero_cutoff.is_err());
    }

    #[test]
    fn test_filter_record_keeps_layout() {
        let fs = 250.0;
        let record = Record::new(
            "raw",
            fs,
            vec![
                Lead::electrode("Fp1", tone(1.0, fs, 500)),
                Lead::new("EOG", tone(30.0, fs, 500)),
            ],
        )
        .unwrap()
        .with_range(TimeRange::new(10, 20, "blink"))
        .unwrap();

        let filtered = filter_record(&record, &FilterConfig::highpass(10.0, 4)).unwrap();

        assert_eq!(filtered.descriptors(), record.descriptors());
        assert_eq!(filtered.ranges(), record.ranges());
        assert!(rms(&filtered.leads()[0].samples) < 0.05);
        assert!(rms(&filtered.leads()[1].samples) > 0.6);
    }
}
