//! EEG-Processing: ICA-based artifact removal for EEG recordings
//!
//! FastICA decomposition, heuristic component classification, selective
//! suppression and reconstruction, plus the filters and spectra they rely on.

pub mod linalg;
pub mod filters;
pub mod spectrum;
pub mod stats;
pub mod ica;
pub mod analyzers;
pub mod ranges;
pub mod metrics;
pub mod config;
pub mod cleaning;

pub use ica::{
    compose, decompose, ComposerConfig, DecomposerConfig, IcaComposer, IcaDecomposer,
    Nonlinearity, SuppressionPolicy,
};
pub use analyzers::{
    assign_suppression, AnalysisResult, Analyzer, ElectrodeArtifactAnalyzer,
    ElectrodeArtifactConfig, EyeArtifactAnalyzer, EyeArtifactConfig, EyeEvidence,
};
pub use filters::{filter_record, ButterworthFilter, FilterConfig, FilterType};
pub use spectrum::PowerSpectrum;
pub use ranges::{ArtifactRangeDetector, RangeAnalysis, RangeDetectorConfig};
pub use metrics::{StageMetrics, StageTimer};
pub use config::{CleaningConfig, CleaningProfile, ErrorHandling};
pub use cleaning::{auto_clean, AnalyzerReport, AutoCleaner, CleaningResult};
