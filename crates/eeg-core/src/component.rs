//! Independent components and the record that carries them

use crate::error::{EegError, EegResult};
use crate::lead::{Lead, LeadDescriptor};
use crate::record::{Record, TimeRange};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::OnceLock;
use uuid::Uuid;

/// How a component contributes to the reconstructed signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SuppressionMode {
    /// Component is kept as is
    #[default]
    None,
    /// Component is removed from the reconstruction
    ZeroOut,
    /// Component is replaced by its high-pass filtered waveform
    HighPassFiltered,
}

impl std::fmt::Display for SuppressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressionMode::None => write!(f, "None"),
            SuppressionMode::ZeroOut => write!(f, "ZeroOut"),
            SuppressionMode::HighPassFiltered => write!(f, "HighPassFiltered"),
        }
    }
}

/// Artifact annotations set by the analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactFlags {
    /// Blink or saccade component
    pub eye: bool,
    /// Component localized on one electrode
    pub single_electrode: bool,
    /// Component localized on the reference electrode
    pub reference_electrode: bool,
}

impl ArtifactFlags {
    pub fn is_artifact(&self) -> bool {
        self.eye || self.single_electrode || self.reference_electrode
    }

    pub fn is_electrode_artifact(&self) -> bool {
        self.single_electrode || self.reference_electrode
    }
}

/// Convergence indicator of one extracted component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Convergence {
    pub converged: bool,
    /// Fixed-point iterations spent on this component
    pub iterations: usize,
}

/// High-pass filter an alternative waveform was produced with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlternativeFilter {
    pub cutoff_hz: f64,
    pub order: usize,
}

/// A lead produced by decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentLead {
    pub lead: Lead,
    pub suppression: SuppressionMode,
    pub flags: ArtifactFlags,
    pub convergence: Convergence,
    /// Cached alternative waveform and the filter that produced it;
    /// stale if `lead.samples` is replaced
    #[serde(skip)]
    alternative: OnceLock<(AlternativeFilter, Vec<f64>)>,
}

impl ComponentLead {
    pub fn new(name: impl Into<String>, samples: Vec<f64>, convergence: Convergence) -> Self {
        Self {
            lead: Lead::new(name, samples),
            suppression: SuppressionMode::None,
            flags: ArtifactFlags::default(),
            convergence,
            alternative: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.lead.name
    }

    pub fn samples(&self) -> &[f64] {
        &self.lead.samples
    }

    pub fn len(&self) -> usize {
        self.lead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lead.is_empty()
    }

    pub fn is_artifact(&self) -> bool {
        self.flags.is_artifact()
    }

    /// Alternative waveform produced by `filter`.
    ///
    /// The first call caches the output of `init`. Later calls with the same
    /// filter borrow the cache; calls with another filter run `init` again
    /// and leave the cache untouched.
    pub fn alternative_samples_for<F>(&self, filter: AlternativeFilter, init: F) -> Cow<'_, [f64]>
    where
        F: FnOnce(&[f64]) -> Vec<f64>,
    {
        match self.alternative.get() {
            Some((key, cached)) if *key == filter => return Cow::Borrowed(cached),
            Some(_) => return Cow::Owned(init(&self.lead.samples)),
            None => {}
        }

        let mut fresh = Some(init(&self.lead.samples));
        let (key, cached) = self
            .alternative
            .get_or_init(|| (filter, fresh.take().unwrap_or_default()));
        match fresh {
            // Another caller filled the cache with a different filter
            Some(samples) if *key != filter => Cow::Owned(samples),
            _ => Cow::Borrowed(cached),
        }
    }

    pub fn has_alternative(&self) -> bool {
        self.alternative.get().is_some()
    }

    /// Filter of the cached alternative waveform, if any
    pub fn alternative_filter(&self) -> Option<AlternativeFilter> {
        self.alternative.get().map(|(filter, _)| *filter)
    }

    /// Drop the cached alternative waveform
    pub fn clear_alternative(&mut self) {
        self.alternative = OnceLock::new();
    }
}

/// Non-owning reference to the record a decomposition was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHandle {
    pub record_id: Uuid,
    pub name: String,
    /// Electrode descriptors in matrix row order
    pub leads: Vec<LeadDescriptor>,
    pub ranges: Vec<TimeRange>,
}

impl SourceHandle {
    pub fn of(record: &Record) -> Self {
        Self {
            record_id: record.id,
            name: record.name.clone(),
            leads: record.descriptors(),
            ranges: record.ranges().to_vec(),
        }
    }

    pub fn electrode_count(&self) -> usize {
        self.leads.len()
    }

    pub fn lead_index(&self, name: &str) -> Option<usize> {
        self.leads.iter().position(|l| l.name == name)
    }

    /// Whether `record` is the record this handle points to
    pub fn refers_to(&self, record: &Record) -> bool {
        self.record_id == record.id
    }
}

/// Result of a decomposition: components plus mixing/demixing matrices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: Uuid,
    pub name: String,
    /// Sampling rate in Hz
    pub sample_rate: f64,
    pub components: Vec<ComponentLead>,
    /// Mixing matrix A (electrodes × components)
    pub mixing: Array2<f64>,
    /// Demixing matrix W (components × electrodes)
    pub demixing: Array2<f64>,
    /// Per-electrode offsets removed before demixing
    pub offsets: Vec<f64>,
    /// Cutoff of the high-pass alternative waveform, in Hz
    pub alternative_cutoff_hz: f64,
    pub source: SourceHandle,
}

impl ComponentRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        sample_rate: f64,
        components: Vec<ComponentLead>,
        mixing: Array2<f64>,
        demixing: Array2<f64>,
        offsets: Vec<f64>,
        alternative_cutoff_hz: f64,
        source: SourceHandle,
    ) -> EegResult<Self> {
        let record = ComponentRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            sample_rate,
            components,
            mixing,
            demixing,
            offsets,
            alternative_cutoff_hz,
            source,
        };
        record.check_dimensions()?;
        Ok(record)
    }

    /// Verify matrix, offset and component shapes against each other
    pub fn check_dimensions(&self) -> EegResult<()> {
        let electrodes = self.source.electrode_count();
        let components = self.components.len();

        let checks = [
            ("mixing matrix rows", electrodes, self.mixing.nrows()),
            ("mixing matrix columns", components, self.mixing.ncols()),
            ("demixing matrix rows", components, self.demixing.nrows()),
            ("demixing matrix columns", electrodes, self.demixing.ncols()),
            ("electrode offsets", electrodes, self.offsets.len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(EegError::DimensionMismatch { what, expected, actual });
            }
        }

        let samples = self.sample_count();
        if let Some(c) = self.components.iter().find(|c| c.len() != samples) {
            return Err(EegError::DimensionMismatch {
                what: "component samples",
                expected: samples,
                actual: c.len(),
            });
        }

        Ok(())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn electrode_count(&self) -> usize {
        self.source.electrode_count()
    }

    pub fn sample_count(&self) -> usize {
        self.components.first().map_or(0, ComponentLead::len)
    }

    pub fn component(&self, index: usize) -> Option<&ComponentLead> {
        self.components.get(index)
    }

    /// Spatial weights of a component across electrodes (column of A)
    pub fn mixing_vector(&self, index: usize) -> Array1<f64> {
        self.mixing.column(index).to_owned()
    }

    /// Electrode weights producing a component (row of W)
    pub fn demixing_vector(&self, index: usize) -> Array1<f64> {
        self.demixing.row(index).to_owned()
    }

    pub fn suppression_modes(&self) -> Vec<SuppressionMode> {
        self.components.iter().map(|c| c.suppression).collect()
    }

    pub fn set_suppression(&mut self, index: usize, mode: SuppressionMode) -> EegResult<()> {
        let count = self.components.len();
        let component = self.components.get_mut(index).ok_or_else(|| {
            crate::invalid_input!("component index {} out of bounds ({} components)", index, count)
        })?;
        component.suppression = mode;
        Ok(())
    }

    pub fn reset_suppression(&mut self) {
        for component in &mut self.components {
            component.suppression = SuppressionMode::None;
        }
    }

    pub fn artifact_count(&self) -> usize {
        self.components.iter().filter(|c| c.is_artifact()).count()
    }

    /// Components × samples matrix of the original waveforms
    pub fn component_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.component_count(), self.sample_count()));
        for (mut row, component) in matrix.rows_mut().into_iter().zip(&self.components) {
            for (dst, &src) in row.iter_mut().zip(component.samples()) {
                *dst = src;
            }
        }
        matrix
    }
}
