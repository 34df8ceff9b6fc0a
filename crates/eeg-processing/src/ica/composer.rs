//! Reconstruction of a record from (partially suppressed) components

use crate::filters::{ButterworthFilter, FilterConfig};
use eeg_core::{AlternativeFilter, ComponentLead, ComponentRecord, EegResult, Record, SuppressionMode};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// Where suppression is applied during reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuppressionPolicy {
    /// Replace the suppressed component waveforms, keep the mixing matrix
    #[default]
    MatrixAndComponents,
}

/// Reconstruction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub policy: SuppressionPolicy,
    /// Order of the high-pass filter producing alternative waveforms
    pub high_pass_order: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            policy: SuppressionPolicy::MatrixAndComponents,
            high_pass_order: 4,
        }
    }
}

impl ComposerConfig {
    pub fn validate(&self) -> EegResult<()> {
        if self.high_pass_order == 0 || self.high_pass_order % 2 != 0 {
            return Err(eeg_core::config_error!(
                "high_pass_order must be even and positive, got {}",
                self.high_pass_order
            ));
        }
        Ok(())
    }
}

/// Mixes components back into electrode space
#[derive(Debug, Clone, Default)]
pub struct IcaComposer {
    config: ComposerConfig,
}

impl IcaComposer {
    pub fn new(config: ComposerConfig) -> EegResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Rebuild the electrode record as `A·S' + offsets`, where `S'` holds
    /// every component after its suppression mode has been applied.
    ///
    /// The result carries the source's lead names, types and annotations.
    pub fn compose(&self, components: &ComponentRecord) -> EegResult<Record> {
        components.check_dimensions()?;

        if components.component_count() == 0 {
            return Err(eeg_core::invalid_input!(
                "component record '{}' has no components",
                components.name
            ));
        }

        match self.config.policy {
            SuppressionPolicy::MatrixAndComponents => self.compose_suppressed_sources(components),
        }
    }

    fn compose_suppressed_sources(&self, components: &ComponentRecord) -> EegResult<Record> {
        let mut sources: Array2<f64> = Array2::zeros((components.component_count(), components.sample_count()));
        for (mut row, component) in sources.axis_iter_mut(Axis(0)).zip(&components.components) {
            let samples = match component.suppression {
                SuppressionMode::None => Cow::Borrowed(component.samples()),
                SuppressionMode::ZeroOut => continue,
                SuppressionMode::HighPassFiltered => self.alternative(components, component)?,
            };
            for (dst, &src) in row.iter_mut().zip(samples.iter()) {
                *dst = src;
            }
        }

        let mut electrodes = components.mixing.dot(&sources);
        for (mut row, &offset) in electrodes.axis_iter_mut(Axis(0)).zip(&components.offsets) {
            row += offset;
        }

        debug!(
            record = %components.source.name,
            suppressed = components
                .components
                .iter()
                .filter(|c| c.suppression != SuppressionMode::None)
                .count(),
            "composition finished"
        );

        Record::from_lead_matrix(
            components.source.name.clone(),
            components.sample_rate,
            &components.source.leads,
            &electrodes,
        )?
        .with_ranges(components.source.ranges.clone())
    }

    /// High-pass alternative of a component, cached on it per cutoff and order
    fn alternative<'a>(
        &self,
        record: &ComponentRecord,
        component: &'a ComponentLead,
    ) -> EegResult<Cow<'a, [f64]>> {
        let key = AlternativeFilter {
            cutoff_hz: record.alternative_cutoff_hz,
            order: self.config.high_pass_order,
        };
        let filter = ButterworthFilter::new(FilterConfig::highpass(key.cutoff_hz, key.order), record.sample_rate)?;
        Ok(component.alternative_samples_for(key, |samples| filter.apply_zero_phase(samples)))
    }
}

/// Compose with the default high-pass order; see [`IcaComposer::compose`]
pub fn compose(components: &ComponentRecord, policy: SuppressionPolicy) -> EegResult<Record> {
    let config = ComposerConfig {
        policy,
        ..ComposerConfig::default()
    };
    IcaComposer::new(config)?.compose(components)
}
