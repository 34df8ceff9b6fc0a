//! Record: a multi-lead recording with time-range annotations

use crate::error::{EegError, EegResult};
use crate::lead::{Lead, LeadDescriptor, LeadStats};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Annotated interval of a recording, in samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// First sample of the range
    pub start: usize,
    /// Number of samples in the range
    pub length: usize,
    pub label: String,
}

impl TimeRange {
    pub fn new(start: usize, length: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            length,
            label: label.into(),
        }
    }

    /// One past the last sample, saturating at `usize::MAX`
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn contains(&self, sample: usize) -> bool {
        sample >= self.start && sample < self.end()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Start and end in seconds for the given sample rate
    pub fn to_seconds(&self, sample_rate: f64) -> (f64, f64) {
        (self.start as f64 / sample_rate, self.end() as f64 / sample_rate)
    }
}

/// Multi-lead recording sharing one sample rate and one sample count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, used by derived records to refer back to this one
    pub id: Uuid,
    pub name: String,
    /// Sampling rate in Hz
    pub sample_rate: f64,
    leads: Vec<Lead>,
    ranges: Vec<TimeRange>,
}

impl Record {
    /// Create a record, validating that all leads have the same length
    pub fn new(name: impl Into<String>, sample_rate: f64, leads: Vec<Lead>) -> EegResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(crate::invalid_input!(
                "sample rate must be positive, got {}",
                sample_rate
            ));
        }

        if let Some(first) = leads.first() {
            let expected = first.len();
            if let Some(lead) = leads.iter().find(|l| l.len() != expected) {
                return Err(crate::invalid_input!(
                    "lead '{}' has {} samples, expected {}",
                    lead.name,
                    lead.len(),
                    expected
                ));
            }
        }

        Ok(Record {
            id: Uuid::new_v4(),
            name: name.into(),
            sample_rate,
            leads,
            ranges: Vec::new(),
        })
    }

    /// Build a record from a leads × samples matrix, reusing lead descriptors
    pub fn from_lead_matrix(
        name: impl Into<String>,
        sample_rate: f64,
        descriptors: &[LeadDescriptor],
        matrix: &Array2<f64>,
    ) -> EegResult<Self> {
        if matrix.nrows() != descriptors.len() {
            return Err(EegError::DimensionMismatch {
                what: "lead matrix rows",
                expected: descriptors.len(),
                actual: matrix.nrows(),
            });
        }

        let leads = descriptors
            .iter()
            .zip(matrix.rows())
            .map(|(descriptor, row)| Lead::from_descriptor(descriptor, row.to_vec()))
            .collect();

        Record::new(name, sample_rate, leads)
    }

    /// Return a copy with an added annotation
    pub fn with_range(mut self, range: TimeRange) -> EegResult<Self> {
        self.check_range(&range)?;
        self.ranges.push(range);
        Ok(self)
    }

    /// Return a copy with the given annotations (each must fit the record)
    pub fn with_ranges(mut self, ranges: Vec<TimeRange>) -> EegResult<Self> {
        for range in &ranges {
            self.check_range(range)?;
        }
        self.ranges = ranges;
        Ok(self)
    }

    /// Validate that a range is non-empty and lies inside the recording
    pub fn check_range(&self, range: &TimeRange) -> EegResult<()> {
        let Some(end) = range.start.checked_add(range.length) else {
            return Err(crate::invalid_input!(
                "range starting at {} with {} samples overflows the sample index",
                range.start,
                range.length
            ));
        };
        if range.is_empty() || end > self.sample_count() {
            return Err(crate::invalid_input!(
                "range [{}, {}) outside recording of {} samples",
                range.start,
                end,
                self.sample_count()
            ));
        }
        Ok(())
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn lead(&self, name: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.name == name)
    }

    pub fn lead_index(&self, name: &str) -> Option<usize> {
        self.leads.iter().position(|l| l.name == name)
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    /// Samples per lead (the recording duration in samples)
    pub fn sample_count(&self) -> usize {
        self.leads.first().map_or(0, Lead::len)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate
    }

    pub fn descriptors(&self) -> Vec<LeadDescriptor> {
        self.leads.iter().map(Lead::descriptor).collect()
    }

    /// Leads × samples matrix
    pub fn lead_matrix(&self) -> Array2<f64> {
        let rows = self.lead_count();
        let cols = self.sample_count();
        let mut matrix = Array2::zeros((rows, cols));
        for (mut row, lead) in matrix.rows_mut().into_iter().zip(&self.leads) {
            for (dst, &src) in row.iter_mut().zip(&lead.samples) {
                *dst = src;
            }
        }
        matrix
    }

    /// Largest absolute sample value over all leads
    pub fn max_abs_value(&self) -> f64 {
        self.leads
            .iter()
            .map(|l| l.stats().max_abs())
            .fold(0.0, f64::max)
    }

    pub fn lead_stats(&self) -> Vec<LeadStats> {
        self.leads.iter().map(Lead::stats).collect()
    }

    /// Copy with leads in display order (see [`Lead::position_cmp`])
    pub fn sorted_by_position(&self) -> Record {
        let mut sorted = self.clone();
        sorted.id = Uuid::new_v4();
        sorted.leads.sort_by(|a, b| a.position_cmp(b));
        sorted
    }

    /// Copy restricted to `[range.start, range.end())`.
    ///
    /// Annotations are shifted into the new time base; those falling
    /// outside are dropped and those crossing the border are clipped.
    pub fn slice_samples(&self, range: &TimeRange) -> EegResult<Record> {
        self.check_range(range)?;

        let leads = self.leads
            .iter()
            .map(|l| Lead {
                name: l.name.clone(),
                samples: l.samples[range.start..range.end()].to_vec(),
                electrode: l.electrode,
            })
            .collect();

        let ranges = self.ranges
            .iter()
            .filter(|r| r.overlaps(range))
            .map(|r| {
                let start = r.start.max(range.start);
                let end = r.end().min(range.end());
                TimeRange::new(start - range.start, end - start, r.label.clone())
            })
            .collect();

        let mut sliced = Record::new(self.name.clone(), self.sample_rate, leads)?;
        sliced.ranges = ranges;
        Ok(sliced)
    }
}
