//! FastICA decomposition of a multi-lead recording
//!
//! The training segment is centered and whitened through the eigen-
//! decomposition of its covariance, then components are extracted one at a
//! time with the fixed-point update
//!
//! ```text
//! w⁺ = E{z·g(wᵀz)} − E{g'(wᵀz)}·w
//! ```
//!
//! followed by Gram-Schmidt against the already extracted directions.

use crate::linalg::{
    center_rows, covariance, normalize, orthogonalize, pseudo_inverse, row_means, symmetric_eigen,
};
use eeg_core::{
    ComponentLead, ComponentRecord, Convergence, EegResult, Record, SourceHandle, TimeRange,
};
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Smallest allowed eigenvalue of the training covariance relative to the
/// largest one
const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Relative spread below which a lead counts as constant
const ZERO_VARIANCE_THRESHOLD: f64 = 1e-10;

/// Contrast function used by the fixed-point update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Nonlinearity {
    /// g(u) = tanh(u); robust general purpose choice
    #[default]
    LogCosh,
    /// g(u) = u·exp(−u²/2); suited to super-Gaussian sources
    Exp,
    /// g(u) = u³; kurtosis based
    Cube,
}

impl Nonlinearity {
    /// Returns `(g(u), g'(u))`
    pub fn evaluate(self, u: f64) -> (f64, f64) {
        match self {
            Nonlinearity::LogCosh => {
                let t = u.tanh();
                (t, 1.0 - t * t)
            }
            Nonlinearity::Exp => {
                let e = (-0.5 * u * u).exp();
                (u * e, (1.0 - u * u) * e)
            }
            Nonlinearity::Cube => (u * u * u, 3.0 * u * u),
        }
    }
}

/// Decomposition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposerConfig {
    pub nonlinearity: Nonlinearity,
    /// Iteration cap per component
    pub max_iterations: usize,
    /// Convergence tolerance on `| |wᵀw_prev| − 1 |`
    pub tolerance: f64,
    /// When true components have unit variance; otherwise (the default) each
    /// component is rescaled so that its mixing column has unit norm and the
    /// component keeps power proportional to the signal
    pub normalize_power: bool,
    /// Seed of the initial unmixing directions
    pub seed: u64,
    /// Cutoff of the high-pass alternative waveform stored on the result
    pub high_pass_cutoff_hz: f64,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            nonlinearity: Nonlinearity::LogCosh,
            max_iterations: 10_000,
            tolerance: 1e-6,
            normalize_power: false,
            seed: 0,
            high_pass_cutoff_hz: 10.0,
        }
    }
}

impl DecomposerConfig {
    pub fn validate(&self) -> EegResult<()> {
        if self.max_iterations == 0 {
            return Err(eeg_core::config_error!("max_iterations must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(eeg_core::config_error!("tolerance must be positive, got {}", self.tolerance));
        }
        if !(self.high_pass_cutoff_hz.is_finite() && self.high_pass_cutoff_hz > 0.0) {
            return Err(eeg_core::config_error!(
                "high_pass_cutoff_hz must be positive, got {}",
                self.high_pass_cutoff_hz
            ));
        }
        Ok(())
    }
}

/// Splits a recording into statistically independent components
#[derive(Debug, Clone)]
pub struct IcaDecomposer {
    config: DecomposerConfig,
}

impl IcaDecomposer {
    pub fn new(config: DecomposerConfig) -> EegResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Decompose `mixture`, estimating the model on `training_range` (the
    /// whole recording when `None`) and projecting the whole recording.
    pub fn decompose(
        &self,
        mixture: &Record,
        training_range: Option<&TimeRange>,
    ) -> EegResult<ComponentRecord> {
        validate_mixture(mixture)?;

        let lead_count = mixture.lead_count();
        let x = mixture.lead_matrix();

        let training = match training_range {
            Some(range) => {
                mixture.check_range(range)?;
                if range.length <= lead_count {
                    return Err(eeg_core::invalid_input!(
                        "training range of {} samples is too short for {} leads",
                        range.length,
                        lead_count
                    ));
                }
                x.slice(s![.., range.start..range.end()])
            }
            None => x.view(),
        };

        check_variance(mixture, &training)?;

        let means = row_means(&training);
        let centered_training = center_rows(&training, &means);

        // Whitening K = D^(-1/2)·Eᵀ
        let eigen = symmetric_eigen(&covariance(&centered_training));
        let largest = eigen.values[0];
        let smallest = eigen.values[lead_count - 1];
        if !(smallest > largest * SINGULARITY_THRESHOLD) {
            return Err(eeg_core::invalid_input!(
                "lead covariance is singular (eigenvalues {:.3e}..{:.3e}); leads are linearly dependent",
                smallest,
                largest
            ));
        }

        let mut whitening = eigen.vectors.t().to_owned();
        for (mut row, &value) in whitening.axis_iter_mut(Axis(0)).zip(eigen.values.iter()) {
            let scale = value.sqrt();
            row.mapv_inplace(|v| v / scale);
        }
        let whitened = whitening.dot(&centered_training);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut basis: Vec<Array1<f64>> = Vec::with_capacity(lead_count);
        let mut convergence = Vec::with_capacity(lead_count);

        for index in 0..lead_count {
            let (w, status) = self.extract_component(&whitened, &basis, &mut rng);

            if status.converged {
                debug!(component = index + 1, iterations = status.iterations, "component converged");
            } else {
                warn!(
                    component = index + 1,
                    iterations = status.iterations,
                    "component did not converge"
                );
            }

            basis.push(w);
            convergence.push(status);
        }

        let mut rotation: Array2<f64> = Array2::zeros((lead_count, lead_count));
        for (mut row, w) in rotation.axis_iter_mut(Axis(0)).zip(&basis) {
            row.assign(w);
        }

        let mut demixing = rotation.dot(&whitening);
        let mut mixing = pseudo_inverse(&demixing)?;

        if !self.config.normalize_power {
            for index in 0..lead_count {
                let norm = mixing.column(index).dot(&mixing.column(index)).sqrt();
                if norm > 0.0 {
                    mixing.column_mut(index).mapv_inplace(|v| v / norm);
                    demixing.row_mut(index).mapv_inplace(|v| v * norm);
                }
            }
        }

        let sources = demixing.dot(&center_rows(&x.view(), &means));

        let components = sources
            .axis_iter(Axis(0))
            .zip(convergence)
            .enumerate()
            .map(|(index, (row, status))| {
                ComponentLead::new(format!("IC{}", index + 1), row.to_vec(), status)
            })
            .collect();

        debug!(
            record = %mixture.name,
            leads = lead_count,
            samples = mixture.sample_count(),
            "decomposition finished"
        );

        ComponentRecord::new(
            format!("{} (components)", mixture.name),
            mixture.sample_rate,
            components,
            mixing,
            demixing,
            means.to_vec(),
            self.config.high_pass_cutoff_hz,
            SourceHandle::of(mixture),
        )
    }

    /// One deflation step: returns the unit direction and its convergence state
    fn extract_component(
        &self,
        whitened: &Array2<f64>,
        basis: &[Array1<f64>],
        rng: &mut StdRng,
    ) -> (Array1<f64>, Convergence) {
        let dim = whitened.nrows();
        let n = whitened.ncols() as f64;
        let nonlinearity = self.config.nonlinearity;

        let mut w: Array1<f64> = Array1::from_shape_fn(dim, |_| rng.sample(StandardNormal));
        orthogonalize(&mut w, basis);
        if normalize(&mut w) <= f64::EPSILON {
            w = fallback_direction(dim, basis);
        }

        for iteration in 1..=self.config.max_iterations {
            let projections = w.dot(whitened);

            let mut derivative_sum = 0.0;
            let g = projections.mapv(|u| {
                let (value, derivative) = nonlinearity.evaluate(u);
                derivative_sum += derivative;
                value
            });

            let mut next = whitened.dot(&g) / n - &w * (derivative_sum / n);
            orthogonalize(&mut next, basis);

            if normalize(&mut next) <= f64::EPSILON {
                // Update collapsed; keep the last usable direction
                return (w, Convergence { converged: false, iterations: iteration });
            }

            let change = (next.dot(&w).abs() - 1.0).abs();
            w = next;

            if change < self.config.tolerance {
                return (w, Convergence { converged: true, iterations: iteration });
            }
        }

        (w, Convergence { converged: false, iterations: self.config.max_iterations })
    }
}

/// Decompose with the given configuration; see [`IcaDecomposer::decompose`]
pub fn decompose(
    mixture: &Record,
    training_range: Option<&TimeRange>,
    config: &DecomposerConfig,
) -> EegResult<ComponentRecord> {
    IcaDecomposer::new(config.clone())?.decompose(mixture, training_range)
}

fn validate_mixture(mixture: &Record) -> EegResult<()> {
    if mixture.lead_count() < 2 {
        return Err(eeg_core::invalid_input!(
            "decomposition needs at least 2 leads, got {}",
            mixture.lead_count()
        ));
    }

    let samples = mixture.sample_count();
    if samples == 0 {
        return Err(eeg_core::invalid_input!("recording '{}' is empty", mixture.name));
    }

    for lead in mixture.leads() {
        if lead.len() != samples {
            return Err(eeg_core::invalid_input!(
                "lead '{}' has {} samples, expected {}",
                lead.name,
                lead.len(),
                samples
            ));
        }
        if lead.samples.iter().any(|v| !v.is_finite()) {
            return Err(eeg_core::invalid_input!("lead '{}' contains non-finite samples", lead.name));
        }
    }

    if samples <= mixture.lead_count() {
        return Err(eeg_core::invalid_input!(
            "{} samples are too few for {} leads",
            samples,
            mixture.lead_count()
        ));
    }

    Ok(())
}

fn check_variance(mixture: &Record, training: &ndarray::ArrayView2<f64>) -> EegResult<()> {
    for (lead, row) in mixture.leads().iter().zip(training.axis_iter(Axis(0))) {
        let stats = eeg_core::LeadStats::calculate(&row.to_vec());
        if stats.std_dev <= ZERO_VARIANCE_THRESHOLD * stats.max_abs().max(f64::MIN_POSITIVE) {
            return Err(eeg_core::invalid_input!("lead '{}' has zero variance", lead.name));
        }
    }
    Ok(())
}

/// Unit vector orthogonal to `basis`, from the standard basis vector with the
/// largest residual
fn fallback_direction(dim: usize, basis: &[Array1<f64>]) -> Array1<f64> {
    let mut best = Array1::zeros(dim);
    let mut best_norm = 0.0;

    for axis in 0..dim {
        let mut candidate = Array1::zeros(dim);
        candidate[axis] = 1.0;
        orthogonalize(&mut candidate, basis);
        let norm = candidate.dot(&candidate).sqrt();
        if norm > best_norm {
            best_norm = norm;
            best = candidate;
        }
    }

    normalize(&mut best);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::max_abs_diff;
    use eeg_core::{EegError, Lead};
    use rand_distr::{Distribution, Normal};

    fn sources(n: usize, fs: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let square: Vec<f64> = (0..n)
            .map(|i| if (i as f64 / fs * 3.0).fract() < 0.5 { 1.0 } else { -1.0 })
            .collect();
        let gaussian: Vec<f64> = (0..n).map(|_| noise.sample(&mut rng)).collect();
        (square, gaussian)
    }

    fn mixed_record(n: usize) -> Record {
        let fs = 250.0;
        let (a, b) = sources(n, fs, 7);
        let x1: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 0.8 * a + 0.2 * b + 5.0).collect();
        let x2: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 0.3 * a + 0.7 * b - 2.0).collect();
        Record::new(
            "mixture",
            fs,
            vec![Lead::electrode("Fp1", x1), Lead::electrode("Cz", x2)],
        )
        .unwrap()
    }

    #[test]
    fn test_nonlinearities() {
        let (g, dg) = Nonlinearity::LogCosh.evaluate(0.0);
        assert_eq!((g, dg), (0.0, 1.0));

        let (g, dg) = Nonlinearity::Cube.evaluate(2.0);
        assert_eq!((g, dg), (8.0, 12.0));

        let (g, dg) = Nonlinearity::Exp.evaluate(1.0);
        assert!((g - (-0.5f64).exp()).abs() < 1e-12);
        assert!(dg.abs() < 1e-12);
    }

    #[test]
    fn test_reconstruction_identity() {
        let record = mixed_record(2000);
        let components = decompose(&record, None, &DecomposerConfig::default()).unwrap();

        assert_eq!(components.component_count(), 2);
        assert_eq!(components.sample_count(), 2000);
        assert_eq!(components.components[0].name(), "IC1");
        assert!(components.source.refers_to(&record));

        let product = components.mixing.dot(&components.demixing);
        assert!(max_abs_diff(&product, &Array2::eye(2)) < 1e-9);

        let mut rebuilt = components.mixing.dot(&components.component_matrix());
        for (mut row, offset) in rebuilt.axis_iter_mut(Axis(0)).zip(&components.offsets) {
            row += *offset;
        }
        assert!(max_abs_diff(&rebuilt, &record.lead_matrix()) < 1e-9);
    }

    #[test]
    fn test_components_unit_variance() {
        let record = mixed_record(2000);
        let config = DecomposerConfig {
            normalize_power: true,
            ..DecomposerConfig::default()
        };
        let components = decompose(&record, None, &config).unwrap();

        for component in &components.components {
            let stats = component.lead.stats();
            assert!(stats.mean.abs() < 1e-9);
            assert!((stats.variance() - 1.0).abs() < 1e-9);
            assert!(component.convergence.converged);
        }
    }

    #[test]
    fn test_unnormalized_power_has_unit_mixing_columns() {
        let record = mixed_record(2000);
        let config = DecomposerConfig::default();
        assert!(!config.normalize_power);
        let components = decompose(&record, None, &config).unwrap();

        for index in 0..2 {
            let column = components.mixing_vector(index);
            assert!((column.dot(&column) - 1.0).abs() < 1e-9);
        }
        let product = components.mixing.dot(&components.demixing);
        assert!(max_abs_diff(&product, &Array2::eye(2)) < 1e-9);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let record = mixed_record(2000);
        let config = DecomposerConfig { max_iterations: 1, ..DecomposerConfig::default() };
        let components = decompose(&record, None, &config).unwrap();

        assert!(components.components.iter().any(|c| !c.convergence.converged));
        for component in &components.components {
            assert_eq!(component.convergence.iterations, 1);
        }

        // Best-effort estimate is still a valid model
        let product = components.mixing.dot(&components.demixing);
        assert!(max_abs_diff(&product, &Array2::eye(2)) < 1e-9);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let record = mixed_record(1500);
        let config = DecomposerConfig { seed: 42, ..DecomposerConfig::default() };

        let first = decompose(&record, None, &config).unwrap();
        let second = decompose(&record, None, &config).unwrap();

        assert_eq!(first.mixing, second.mixing);
        assert_eq!(first.component_matrix(), second.component_matrix());
    }

    #[test]
    fn test_training_range() {
        let record = mixed_record(2000);
        let range = TimeRange::new(0, 1000, "training");
        let components = decompose(&record, Some(&range), &DecomposerConfig::default()).unwrap();

        // Whole recording is projected even though only part of it trained the model
        assert_eq!(components.sample_count(), 2000);

        let too_short = TimeRange::new(0, 2, "short");
        let result = decompose(&record, Some(&too_short), &DecomposerConfig::default());
        assert!(matches!(result, Err(EegError::InvalidInput { .. })));

        let outside = TimeRange::new(1500, 1000, "outside");
        assert!(decompose(&record, Some(&outside), &DecomposerConfig::default()).is_err());

        let overflowing = TimeRange::new(usize::MAX - 2, 10, "huge");
        let result = decompose(&record, Some(&overflowing), &DecomposerConfig::default());
        assert!(matches!(result, Err(EegError::InvalidInput { .. })));
    }

    #[test]
    fn test_invalid_inputs() {
        let config = DecomposerConfig::default();

        let single = Record::new("one", 250.0, vec![Lead::electrode("Fp1", vec![1.0, 2.0, 3.0])]).unwrap();
        assert!(matches!(decompose(&single, None, &config), Err(EegError::InvalidInput { .. })));

        let flat = Record::new(
            "flat",
            250.0,
            vec![
                Lead::electrode("Fp1", vec![1.0, -1.0, 2.0, 0.5]),
                Lead::electrode("Fp2", vec![3.0; 4]),
            ],
        )
        .unwrap();
        assert!(matches!(decompose(&flat, None, &config), Err(EegError::InvalidInput { .. })));

        let base = vec![1.0, -1.0, 2.0, 0.5, -3.0];
        let dependent = Record::new(
            "dependent",
            250.0,
            vec![
                Lead::electrode("Fp1", base.clone()),
                Lead::electrode("Fp2", base.iter().map(|v| 2.0 * v).collect()),
            ],
        )
        .unwrap();
        assert!(matches!(decompose(&dependent, None, &config), Err(EegError::InvalidInput { .. })));

        let with_nan = Record::new(
            "nan",
            250.0,
            vec![
                Lead::electrode("Fp1", vec![1.0, f64::NAN, 2.0]),
                Lead::electrode("Fp2", vec![1.0, 0.0, 2.0]),
            ],
        )
        .unwrap();
        assert!(matches!(decompose(&with_nan, None, &config), Err(EegError::InvalidInput { .. })));
    }

    #[test]
    fn test_invalid_config() {
        let config = DecomposerConfig { tolerance: 0.0, ..DecomposerConfig::default() };
        assert!(matches!(IcaDecomposer::new(config), Err(EegError::ConfigurationError { .. })));
    }

    #[test]
    fn test_square_wave_is_recovered() {
        let n = 2000;
        let record = mixed_record(n);
        let (square, _) = sources(n, 250.0, 7);
        let components = decompose(&record, None, &DecomposerConfig::default()).unwrap();

        let best = components
            .components
            .iter()
            .map(|c| crate::stats::correlation(c.samples(), &square).abs())
            .fold(0.0, f64::max);
        assert!(best > 0.99, "best correlation {}", best);
    }
}
