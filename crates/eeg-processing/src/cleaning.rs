//! Automatic cleaning: decompose, classify, suppress, recompose

use crate::analyzers::{
    assign_suppression, AnalysisResult, Analyzer, ElectrodeArtifactAnalyzer, EyeArtifactAnalyzer,
};
use crate::config::{CleaningConfig, ErrorHandling};
use crate::ica::{IcaComposer, IcaDecomposer};
use crate::metrics::{total_time_us, StageMetrics};
use crate::ranges::{ArtifactRangeDetector, RangeAnalysis};
use eeg_core::{ComponentRecord, EegResult, Record, SuppressionMode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of one analyzer inside a cleaning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerReport {
    pub analyzer: String,
    pub result: AnalysisResult,
}

/// Outcome of [`AutoCleaner::clean`]
#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub succeeded: bool,
    /// Cleaned recording; `Some` only on success
    pub output: Option<Record>,
    /// Decomposition with final flags and suppression modes; `Some` only on success
    pub components: Option<ComponentRecord>,
    /// Suppression mode of every component, in component order
    pub assignments: Vec<SuppressionMode>,
    pub analyses: Vec<AnalyzerReport>,
    /// Reason of the failure
    pub diagnostic: Option<String>,
    /// Bypassed analyzer failures and analyzer notes
    pub warnings: Vec<String>,
    pub stages: Vec<StageMetrics>,
    pub total_time_us: u64,
}

impl CleaningResult {
    fn failed(diagnostic: String, analyses: Vec<AnalyzerReport>, stages: Vec<StageMetrics>) -> Self {
        warn!(%diagnostic, "cleaning failed");
        Self {
            succeeded: false,
            output: None,
            components: None,
            assignments: Vec::new(),
            analyses,
            diagnostic: Some(diagnostic),
            warnings: Vec::new(),
            total_time_us: total_time_us(&stages),
            stages,
        }
    }

    /// Number of components whose suppression mode is not `None`
    pub fn suppressed_count(&self) -> usize {
        self.assignments.iter().filter(|m| **m != SuppressionMode::None).count()
    }
}

/// Runs the whole cleaning pipeline on a record
pub struct AutoCleaner {
    config: CleaningConfig,
    decomposer: IcaDecomposer,
    composer: IcaComposer,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AutoCleaner {
    /// Create a cleaner with the electrode and eye analyzers, in that order
    pub fn new(config: CleaningConfig) -> EegResult<Self> {
        config.validate()?;

        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(ElectrodeArtifactAnalyzer::new(config.electrode.clone())),
            Box::new(EyeArtifactAnalyzer::new(config.eye.clone())),
        ];

        Ok(Self {
            decomposer: IcaDecomposer::new(config.decomposer.clone())?,
            composer: IcaComposer::new(config.composer.clone())?,
            analyzers,
            config,
        })
    }

    /// Append an analyzer; it runs after the existing ones
    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn analyzer_names(&self) -> Vec<String> {
        self.analyzers.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Decompose the whole record, classify and suppress artifact
    /// components and reconstruct the record.
    ///
    /// Decomposition and composition errors, and analyzer failures in strict
    /// mode, produce an unsuccessful result without output.
    pub fn clean(&self, record: &Record) -> CleaningResult {
        info!(
            record = %record.name,
            leads = record.lead_count(),
            samples = record.sample_count(),
            profile = ?self.config.profile,
            "cleaning started"
        );

        let mut stages = Vec::new();
        let mut analyses = Vec::new();
        let mut warnings = Vec::new();

        let timer = StageMetrics::start("decompose");
        let mut components = match self.decomposer.decompose(record, None) {
            Ok(components) => {
                stages.push(timer.finish());
                components
            }
            Err(e) => {
                let message = format!("decomposition failed: {}", e);
                stages.push(timer.finish_with_error(&message));
                return CleaningResult::failed(message, analyses, stages);
            }
        };

        let unconverged = components
            .components
            .iter()
            .filter(|c| !c.convergence.converged)
            .count();
        if unconverged > 0 {
            warnings.push(format!("{} component(s) did not converge", unconverged));
        }

        for analyzer in &self.analyzers {
            let timer = StageMetrics::start(analyzer.name());
            let result = analyzer.analyze(&mut components);

            if result.succeeded {
                stages.push(timer.finish());
                if let Some(note) = &result.diagnostic {
                    warnings.push(format!("{}: {}", analyzer.name(), note));
                }
                info!(analyzer = analyzer.name(), flagged = result.flagged, "analysis finished");
            } else {
                let message = result
                    .diagnostic
                    .clone()
                    .unwrap_or_else(|| format!("{} failed", analyzer.name()));
                stages.push(timer.finish_with_error(&message));

                match self.config.error_handling {
                    ErrorHandling::StrictMode => {
                        analyses.push(AnalyzerReport { analyzer: analyzer.name().to_string(), result });
                        return CleaningResult::failed(
                            format!("analysis failed: {}", message),
                            analyses,
                            stages,
                        );
                    }
                    ErrorHandling::BypassMode => {
                        warn!(analyzer = analyzer.name(), %message, "analyzer failed, bypassing");
                        warnings.push(format!("{} failed: {}, bypassing", analyzer.name(), message));
                    }
                }
            }

            analyses.push(AnalyzerReport { analyzer: analyzer.name().to_string(), result });
        }

        let suppressed = assign_suppression(&mut components);

        let timer = StageMetrics::start("compose");
        let output = match self.composer.compose(&components) {
            Ok(output) => {
                stages.push(timer.finish());
                output
            }
            Err(e) => {
                let message = format!("composition failed: {}", e);
                stages.push(timer.finish_with_error(&message));
                return CleaningResult::failed(message, analyses, stages);
            }
        };

        let total = total_time_us(&stages);
        info!(
            record = %record.name,
            components = components.component_count(),
            suppressed,
            elapsed_us = total,
            "cleaning finished"
        );

        CleaningResult {
            succeeded: true,
            output: Some(output),
            assignments: components.suppression_modes(),
            components: Some(components),
            analyses,
            diagnostic: None,
            warnings,
            stages,
            total_time_us: total,
        }
    }

    /// Detect artifact ranges with the configured thresholds
    pub fn detect_ranges(&self, record: &Record) -> RangeAnalysis {
        ArtifactRangeDetector::new(self.config.ranges.clone()).analyze(record)
    }
}

/// Clean `record` with `config`; an invalid configuration yields an
/// unsuccessful result
pub fn auto_clean(record: &Record, config: &CleaningConfig) -> CleaningResult {
    match AutoCleaner::new(config.clone()) {
        Ok(cleaner) => cleaner.clean(record),
        Err(e) => CleaningResult::failed(format!("invalid configuration: {}", e), Vec::new(), Vec::new()),
    }
}
