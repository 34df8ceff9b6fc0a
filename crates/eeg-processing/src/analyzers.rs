//! Heuristic artifact classification of independent components
//!
//! Analyzers only set [`ArtifactFlags`](eeg_core::ArtifactFlags) on the
//! components they inspect; [`assign_suppression`] turns flags into
//! suppression modes afterwards.

use crate::spectrum::{low_frequency_ratio, PowerSpectrum};
use eeg_core::{ComponentRecord, LeadType, SuppressionMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of one analyzer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub succeeded: bool,
    /// Why the analysis failed, or a note about a degraded run
    pub diagnostic: Option<String>,
    /// Number of components flagged by this run
    pub flagged: usize,
}

impl AnalysisResult {
    pub fn success(flagged: usize) -> Self {
        Self {
            succeeded: true,
            diagnostic: None,
            flagged,
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            diagnostic: Some(diagnostic.into()),
            flagged: 0,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

/// Component classifier
pub trait Analyzer: Send + Sync {
    /// Analyzer name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Inspect `components` and set this analyzer's flags.
    ///
    /// Flags owned by the analyzer are cleared first, so running it twice
    /// gives the same result as running it once.
    fn analyze(&self, components: &mut ComponentRecord) -> AnalysisResult;

    /// Check whether the record can be analyzed at all
    fn can_analyze(&self, components: &ComponentRecord) -> Result<(), String> {
        if components.component_count() == 0 || components.sample_count() == 0 {
            return Err(format!("{}: component record '{}' is empty", self.name(), components.name));
        }
        components.check_dimensions().map_err(|e| format!("{}: {}", self.name(), e))
    }
}

/// Thresholds of the single-electrode detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrodeArtifactConfig {
    /// Largest |weight| over the RMS of the remaining weights needed to flag
    pub dominance_ratio: f64,
    /// Below this electrode count no component is flagged
    pub min_electrodes: usize,
    /// Name of the reference electrode, if it is part of the recording
    pub reference_lead: Option<String>,
}

impl Default for ElectrodeArtifactConfig {
    fn default() -> Self {
        Self {
            dominance_ratio: 4.0,
            min_electrodes: 3,
            reference_lead: None,
        }
    }
}

/// Flags components whose spatial weights concentrate on one electrode
#[derive(Debug, Clone, Default)]
pub struct ElectrodeArtifactAnalyzer {
    config: ElectrodeArtifactConfig,
}

impl ElectrodeArtifactAnalyzer {
    pub fn new(config: ElectrodeArtifactConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ElectrodeArtifactConfig {
        &self.config
    }

    /// Index of the dominant electrode and its dominance ratio
    fn dominance(weights: &[f64]) -> (usize, f64) {
        let (peak_index, peak) = weights
            .iter()
            .enumerate()
            .map(|(i, w)| (i, w.abs()))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        let rest = weights.len().saturating_sub(1);
        if rest == 0 {
            return (peak_index, 0.0);
        }

        let rest_energy: f64 = weights
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != peak_index)
            .map(|(_, w)| w * w)
            .sum();
        let rest_rms = (rest_energy / rest as f64).sqrt();

        let ratio = if rest_rms > 0.0 {
            peak / rest_rms
        } else if peak > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        (peak_index, ratio)
    }
}

impl Analyzer for ElectrodeArtifactAnalyzer {
    fn name(&self) -> &str {
        "electrode artifact detector"
    }

    fn analyze(&self, components: &mut ComponentRecord) -> AnalysisResult {
        if let Err(diagnostic) = self.can_analyze(components) {
            return AnalysisResult::failure(diagnostic);
        }

        for component in &mut components.components {
            component.flags.single_electrode = false;
            component.flags.reference_electrode = false;
        }

        let electrodes = components.electrode_count();
        if electrodes < self.config.min_electrodes {
            return AnalysisResult::success(0).with_diagnostic(format!(
                "{} electrodes are too few for single-electrode detection (minimum {})",
                electrodes, self.config.min_electrodes
            ));
        }

        let reference = self.config
            .reference_lead
            .as_deref()
            .and_then(|name| components.source.lead_index(name));

        let mut flagged = 0;
        for index in 0..components.component_count() {
            let weights = components.mixing_vector(index).to_vec();
            let (peak_index, ratio) = Self::dominance(&weights);

            if ratio < self.config.dominance_ratio {
                continue;
            }

            let flags = &mut components.components[index].flags;
            if Some(peak_index) == reference {
                flags.reference_electrode = true;
            } else {
                flags.single_electrode = true;
            }
            flagged += 1;

            debug!(
                component = index + 1,
                electrode = %components.source.leads[peak_index].name,
                ratio,
                "electrode artifact"
            );
        }

        let result = AnalysisResult::success(flagged);
        match (&self.config.reference_lead, reference) {
            (Some(name), None) => result.with_diagnostic(format!(
                "reference electrode '{}' is not part of the recording",
                name
            )),
            _ => result,
        }
    }
}

/// Thresholds of the eye artifact detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeArtifactConfig {
    /// Minimum share of the squared mixing weights on frontal electrodes
    pub frontal_weight_ratio: f64,
    /// Upper edge of the blink frequency band (Hz)
    pub low_frequency_max_hz: f64,
    /// Minimum share of component power inside the blink band
    pub low_frequency_power_ratio: f64,
    /// Minimum peak contribution to a frontal electrode, relative to that
    /// electrode's peak absolute amplitude
    pub min_amplitude_ratio: f64,
}

impl Default for EyeArtifactConfig {
    fn default() -> Self {
        Self {
            frontal_weight_ratio: 0.6,
            low_frequency_max_hz: 4.0,
            low_frequency_power_ratio: 0.5,
            min_amplitude_ratio: 0.3,
        }
    }
}

/// Per-component measurements behind an eye artifact decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeEvidence {
    pub frontal_weight_ratio: f64,
    pub low_frequency_power_ratio: f64,
    pub amplitude_ratio: f64,
}

/// Flags blink and eye movement components: frontal, slow and large
#[derive(Debug, Clone, Default)]
pub struct EyeArtifactAnalyzer {
    config: EyeArtifactConfig,
}

impl EyeArtifactAnalyzer {
    pub fn new(config: EyeArtifactConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EyeArtifactConfig {
        &self.config
    }

    /// Measure one component; `frontal_peaks[k]` is the peak absolute
    /// centered amplitude of frontal electrode `frontal[k]`
    pub fn evidence(
        &self,
        components: &ComponentRecord,
        index: usize,
        frontal: &[usize],
        frontal_peaks: &[f64],
    ) -> Result<EyeEvidence, String> {
        let component = &components.components[index];
        let weights = components.mixing.column(index);

        let total: f64 = weights.iter().map(|w| w * w).sum();
        let on_frontal: f64 = frontal.iter().map(|&i| weights[i] * weights[i]).sum();
        let frontal_weight_ratio = if total > 0.0 { on_frontal / total } else { 0.0 };

        let low_frequency_power_ratio = low_frequency_ratio(
            component.samples(),
            components.sample_rate,
            self.config.low_frequency_max_hz,
        )
        .map_err(|e| format!("{}: {}", component.name(), e))?;

        let component_peak = component.lead.stats().max_abs();
        let amplitude_ratio = frontal
            .iter()
            .zip(frontal_peaks)
            .filter(|&(_, &peak)| peak > 0.0)
            .map(|(&i, &peak)| weights[i].abs() * component_peak / peak)
            .fold(0.0, f64::max);

        Ok(EyeEvidence {
            frontal_weight_ratio,
            low_frequency_power_ratio,
            amplitude_ratio,
        })
    }

    fn is_eye_artifact(&self, evidence: &EyeEvidence) -> bool {
        evidence.frontal_weight_ratio >= self.config.frontal_weight_ratio
            && evidence.low_frequency_power_ratio >= self.config.low_frequency_power_ratio
            && evidence.amplitude_ratio >= self.config.min_amplitude_ratio
    }
}

impl Analyzer for EyeArtifactAnalyzer {
    fn name(&self) -> &str {
        "eye artifact detector"
    }

    fn analyze(&self, components: &mut ComponentRecord) -> AnalysisResult {
        if let Err(diagnostic) = self.can_analyze(components) {
            return AnalysisResult::failure(diagnostic);
        }

        let frontal: Vec<usize> = components
            .source
            .leads
            .iter()
            .enumerate()
            .filter(|(_, lead)| lead.electrode == Some(LeadType::Frontal))
            .map(|(i, _)| i)
            .collect();

        if frontal.is_empty() {
            for component in &mut components.components {
                component.flags.eye = false;
            }
            return AnalysisResult::success(0)
                .with_diagnostic("no frontal electrodes, eye artifacts cannot be located");
        }

        // Peak centered amplitude of each frontal electrode, rebuilt from A·S
        let sources = components.component_matrix();
        let frontal_peaks: Vec<f64> = frontal
            .iter()
            .map(|&i| {
                components
                    .mixing
                    .row(i)
                    .dot(&sources)
                    .fold(0.0, |acc: f64, v| acc.max(v.abs()))
            })
            .collect();

        // Flags are only touched once every component has been measured
        let mut decisions = Vec::with_capacity(components.component_count());
        for index in 0..components.component_count() {
            match self.evidence(components, index, &frontal, &frontal_peaks) {
                Ok(evidence) => decisions.push((index, evidence)),
                Err(diagnostic) => return AnalysisResult::failure(diagnostic),
            }
        }

        for component in &mut components.components {
            component.flags.eye = false;
        }

        let sample_rate = components.sample_rate;
        let mut flagged = 0;
        for (index, evidence) in decisions {
            if self.is_eye_artifact(&evidence) {
                let component = &mut components.components[index];
                component.flags.eye = true;
                flagged += 1;
                let peak_hz = PowerSpectrum::compute(component.samples(), sample_rate)
                    .map(|spectrum| spectrum.peak_frequency())
                    .unwrap_or_default();
                debug!(
                    component = index + 1,
                    peak_hz,
                    frontal = evidence.frontal_weight_ratio,
                    low_frequency = evidence.low_frequency_power_ratio,
                    amplitude = evidence.amplitude_ratio,
                    "eye artifact"
                );
            }
        }

        AnalysisResult::success(flagged)
    }
}

/// Map artifact flags to suppression modes: electrode artifacts are zeroed,
/// eye artifacts are high-pass filtered, everything else is kept.
///
/// Returns the number of suppressed components.
pub fn assign_suppression(components: &mut ComponentRecord) -> usize {
    let mut suppressed = 0;
    for component in &mut components.components {
        component.suppression = if component.flags.is_electrode_artifact() {
            SuppressionMode::ZeroOut
        } else if component.flags.eye {
            SuppressionMode::HighPassFiltered
        } else {
            SuppressionMode::None
        };

        if component.suppression != SuppressionMode::None {
            suppressed += 1;
        }
    }
    suppressed
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::{ComponentLead, Convergence, Lead, Record, SourceHandle};
    use ndarray::{array, Array2};
    use std::f64::consts::PI;

    const FS: f64 = 250.0;
    const N: usize = 1000;

    fn sine(freq: f64) -> Vec<f64> {
        (0..N).map(|i| (2.0 * PI * freq * i as f64 / FS).sin()).collect()
    }

    fn source(names: &[&str]) -> SourceHandle {
        let leads = names.iter().map(|n| Lead::electrode(*n, vec![0.0])).collect();
        SourceHandle::of(&Record::new("raw", FS, leads).unwrap())
    }

    fn component_record(names: &[&str], waveforms: Vec<Vec<f64>>, mixing: Array2<f64>) -> ComponentRecord {
        let demixing = crate::linalg::pseudo_inverse(&mixing).unwrap();
        let components = waveforms
            .into_iter()
            .enumerate()
            .map(|(i, w)| ComponentLead::new(format!("IC{}", i + 1), w, Convergence::default()))
            .collect();
        ComponentRecord::new(
            "components",
            FS,
            components,
            mixing,
            demixing,
            vec![0.0; names.len()],
            10.0,
            source(names),
        )
        .unwrap()
    }

    #[test]
    fn test_electrode_dominance_flags_component() {
        let mut record = component_record(
            &["Fp1", "C3", "O1", "P4"],
            vec![sine(10.0), sine(11.0), sine(12.0), sine(13.0)],
            array![
                [5.0, 1.0, 0.2, 0.8],
                [0.1, 1.0, 0.3, 0.7],
                [0.1, 0.9, 1.0, 0.6],
                [0.1, 0.8, 0.6, 0.9]
            ],
        );

        let analyzer = ElectrodeArtifactAnalyzer::default();
        let result = analyzer.analyze(&mut record);

        assert!(result.succeeded);
        assert_eq!(result.flagged, 1);
        assert!(record.components[0].flags.single_electrode);
        assert!(!record.components[1].flags.single_electrode);

        // Idempotent
        let again = analyzer.analyze(&mut record);
        assert_eq!(again, result);
        assert_eq!(record.artifact_count(), 1);
    }

    #[test]
    fn test_reference_electrode() {
        let mut record = component_record(
            &["Fp1", "C3", "O1"],
            vec![sine(10.0), sine(11.0), sine(12.0)],
            array![[1.0, 0.9, 0.8], [0.2, 1.0, 0.7], [6.0, 0.8, 1.0]],
        );

        let analyzer = ElectrodeArtifactAnalyzer::new(ElectrodeArtifactConfig {
            reference_lead: Some("O1".to_string()),
            ..ElectrodeArtifactConfig::default()
        });
        let result = analyzer.analyze(&mut record);

        assert!(result.succeeded);
        assert!(record.components[0].flags.reference_electrode);
        assert!(!record.components[0].flags.single_electrode);
    }

    #[test]
    fn test_too_few_electrodes_flags_nothing() {
        let mut record = component_record(
            &["Fp1", "Fp2"],
            vec![sine(10.0), sine(11.0)],
            array![[10.0, 0.0], [0.0, 1.0]],
        );

        let result = ElectrodeArtifactAnalyzer::default().analyze(&mut record);
        assert!(result.succeeded);
        assert_eq!(result.flagged, 0);
        assert!(result.diagnostic.is_some());
        assert_eq!(record.artifact_count(), 0);
    }

    #[test]
    fn test_eye_artifact_detection() {
        let mut record = component_record(
            &["Fp1", "Fp2", "O1"],
            vec![sine(1.5), sine(10.0), sine(2.0)],
            array![[3.0, 0.5, 0.1], [2.5, 0.5, 0.1], [0.2, 1.0, 3.0]],
        );

        let result = EyeArtifactAnalyzer::default().analyze(&mut record);
        assert!(result.succeeded);
        assert_eq!(result.flagged, 1);
        // Slow and frontal
        assert!(record.components[0].flags.eye);
        // Frontal but fast
        assert!(!record.components[1].flags.eye);
        // Slow but occipital
        assert!(!record.components[2].flags.eye);

        // Idempotent
        let flags: Vec<_> = record.components.iter().map(|c| c.flags).collect();
        let again = EyeArtifactAnalyzer::default().analyze(&mut record);
        assert_eq!(again, result);
        assert_eq!(record.components.iter().map(|c| c.flags).collect::<Vec<_>>(), flags);
    }

    #[test]
    fn test_failed_eye_analysis_keeps_flags() {
        // One sample per component: no spectrum can be computed
        let mut record = component_record(&["Fp1", "Fp2"], vec![vec![1.0], vec![2.0]], Array2::eye(2));
        record.components[0].flags.eye = true;

        let result = EyeArtifactAnalyzer::default().analyze(&mut record);
        assert!(!result.succeeded);
        assert!(result.diagnostic.is_some());
        assert!(record.components[0].flags.eye);
        assert!(!record.components[1].flags.eye);
    }

    #[test]
    fn test_eye_detector_without_frontal_leads() {
        let mut record = component_record(
            &["O1", "O2"],
            vec![sine(1.0), sine(2.0)],
            array![[1.0, 0.0], [0.0, 1.0]],
        );
        let result = EyeArtifactAnalyzer::default().analyze(&mut record);
        assert!(result.succeeded);
        assert_eq!(result.flagged, 0);
        assert!(result.diagnostic.is_some());
    }

    #[test]
    fn test_empty_record_fails() {
        let mut record = component_record(&["Fp1", "Fp2"], vec![vec![], vec![]], Array2::eye(2));
        let result = EyeArtifactAnalyzer::default().analyze(&mut record);
        assert!(!result.succeeded);
        assert!(result.diagnostic.is_some());

        let result = ElectrodeArtifactAnalyzer::default().analyze(&mut record);
        assert!(!result.succeeded);
    }

    #[test]
    fn test_assign_suppression() {
        let mut record = component_record(
            &["Fp1", "Fp2", "O1"],
            vec![sine(1.0), sine(2.0), sine(3.0)],
            Array2::eye(3),
        );
        record.components[0].flags.eye = true;
        record.components[1].flags.eye = true;
        record.components[1].flags.single_electrode = true;

        let suppressed = assign_suppression(&mut record);
        assert_eq!(suppressed, 2);
        assert_eq!(
            record.suppression_modes(),
            vec![
                SuppressionMode::HighPassFiltered,
                SuppressionMode::ZeroOut,
                SuppressionMode::None
            ]
        );
    }
}
