//! Configuration of the automatic cleaning pipeline

use crate::analyzers::{ElectrodeArtifactConfig, EyeArtifactConfig};
use crate::ica::{ComposerConfig, DecomposerConfig};
use crate::ranges::RangeDetectorConfig;
use eeg_core::{EegError, EegResult};
use serde::{Deserialize, Serialize};

/// Preset families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleaningProfile {
    /// Default thresholds and convergence settings
    Standard,
    /// Looser convergence, for previews and interactive use
    Quick,
    /// Tight convergence and a steeper high-pass alternative
    Thorough,
    Custom,
}

/// What happens when an analyzer fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorHandling {
    /// Stop cleaning on the first analyzer failure
    #[default]
    StrictMode,
    /// Skip the failed analyzer and continue with the others
    BypassMode,
}

/// Full configuration of [`AutoCleaner`](crate::cleaning::AutoCleaner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub name: String,
    pub profile: CleaningProfile,
    pub error_handling: ErrorHandling,
    pub decomposer: DecomposerConfig,
    pub composer: ComposerConfig,
    pub electrode: ElectrodeArtifactConfig,
    pub eye: EyeArtifactConfig,
    pub ranges: RangeDetectorConfig,
}

/// Preset configurations
impl CleaningConfig {
    pub fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            profile: CleaningProfile::Standard,
            error_handling: ErrorHandling::StrictMode,
            decomposer: DecomposerConfig::default(),
            composer: ComposerConfig::default(),
            electrode: ElectrodeArtifactConfig::default(),
            eye: EyeArtifactConfig::default(),
            ranges: RangeDetectorConfig::default(),
        }
    }

    pub fn quick() -> Self {
        Self {
            name: "Quick".to_string(),
            profile: CleaningProfile::Quick,
            decomposer: DecomposerConfig {
                max_iterations: 500,
                tolerance: 1e-4,
                ..DecomposerConfig::default()
            },
            ..Self::standard()
        }
    }

    pub fn thorough() -> Self {
        Self {
            name: "Thorough".to_string(),
            profile: CleaningProfile::Thorough,
            decomposer: DecomposerConfig {
                max_iterations: 20_000,
                tolerance: 1e-8,
                ..DecomposerConfig::default()
            },
            composer: ComposerConfig {
                high_pass_order: 6,
                ..ComposerConfig::default()
            },
            ..Self::standard()
        }
    }

    /// Create configuration suitable for given profile
    pub fn for_profile(profile: CleaningProfile) -> Self {
        match profile {
            CleaningProfile::Standard => Self::standard(),
            CleaningProfile::Quick => Self::quick(),
            CleaningProfile::Thorough => Self::thorough(),
            CleaningProfile::Custom => Self {
                name: "Custom".to_string(),
                profile: CleaningProfile::Custom,
                ..Self::standard()
            },
        }
    }

    pub fn validate(&self) -> EegResult<()> {
        self.decomposer.validate()?;
        self.composer.validate()?;
        self.ranges.validate()?;

        if !(self.electrode.dominance_ratio > 1.0) {
            return Err(eeg_core::config_error!(
                "dominance_ratio must exceed 1, got {}",
                self.electrode.dominance_ratio
            ));
        }

        let ratios = [
            ("frontal_weight_ratio", self.eye.frontal_weight_ratio),
            ("low_frequency_power_ratio", self.eye.low_frequency_power_ratio),
            ("min_amplitude_ratio", self.eye.min_amplitude_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(eeg_core::config_error!("{} must lie in [0, 1], got {}", name, value));
            }
        }

        if !(self.eye.low_frequency_max_hz > 0.0) {
            return Err(eeg_core::config_error!(
                "low_frequency_max_hz must be positive, got {}",
                self.eye.low_frequency_max_hz
            ));
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EegResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EegError::ConfigurationError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON; missing fields take default values
    pub fn from_json(json: &str) -> EegResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EegError::ConfigurationError {
            message: format!("Failed to deserialize configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ica::Nonlinearity;

    #[test]
    fn test_presets_are_valid() {
        for profile in [
            CleaningProfile::Standard,
            CleaningProfile::Quick,
            CleaningProfile::Thorough,
            CleaningProfile::Custom,
        ] {
            let config = CleaningConfig::for_profile(profile);
            assert_eq!(config.profile, profile);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_standard_defaults() {
        let config = CleaningConfig::default();
        assert_eq!(config.decomposer.nonlinearity, Nonlinearity::LogCosh);
        assert_eq!(config.decomposer.max_iterations, 10_000);
        assert_eq!(config.decomposer.tolerance, 1e-6);
        assert_eq!(config.decomposer.high_pass_cutoff_hz, 10.0);
        assert!(!config.decomposer.normalize_power);
        assert_eq!(config.error_handling, ErrorHandling::StrictMode);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CleaningConfig::standard();
        config.eye.frontal_weight_ratio = 1.5;
        assert!(matches!(config.validate(), Err(EegError::ConfigurationError { .. })));

        let mut config = CleaningConfig::standard();
        config.electrode.dominance_ratio = 0.5;
        assert!(config.validate().is_err());

        let mut config = CleaningConfig::standard();
        config.decomposer.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_serialization() {
        let config = CleaningConfig::thorough();
        let json = config.to_json().unwrap();
        assert!(json.contains("Thorough"));

        let restored = CleaningConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CleaningConfig::from_json(
            r#"{ "decomposer": { "seed": 7, "nonlinearity": "Cube" }, "electrode": { "reference_lead": "Cz" } }"#,
        )
        .unwrap();

        assert_eq!(config.decomposer.seed, 7);
        assert_eq!(config.decomposer.nonlinearity, Nonlinearity::Cube);
        assert_eq!(config.decomposer.tolerance, 1e-6);
        assert_eq!(config.electrode.reference_lead.as_deref(), Some("Cz"));
        assert_eq!(config.electrode.min_electrodes, 3);

        assert!(CleaningConfig::from_json("{ not json").is_err());
        assert!(CleaningConfig::from_json(r#"{ "composer": { "high_pass_order": 5 } }"#).is_err());
    }
}
