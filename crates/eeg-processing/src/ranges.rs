//! Detection of artifact-contaminated time ranges
//!
//! A sample is suspicious when its amplitude or its first difference is an
//! outlier with respect to the lead's own robust statistics (median and
//! scaled MAD, or the scaled mean absolute deviation for leads that sit on
//! one value most of the time). Suspicious samples are grouped into ranges, nearby ranges are
//! merged and each range is padded.

use crate::stats::location_scale;
use eeg_core::{EegResult, Record, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeDetectorConfig {
    /// Amplitude outlier threshold in robust standard deviations
    pub amplitude_factor: f64,
    /// First-difference outlier threshold in robust standard deviations
    pub gradient_factor: f64,
    /// Ranges separated by at most this gap are merged (seconds)
    pub merge_gap_secs: f64,
    /// Padding added on both sides of every range (seconds)
    pub padding_secs: f64,
}

impl Default for RangeDetectorConfig {
    fn default() -> Self {
        Self {
            amplitude_factor: 5.0,
            gradient_factor: 5.0,
            merge_gap_secs: 0.1,
            padding_secs: 0.05,
        }
    }
}

impl RangeDetectorConfig {
    pub fn validate(&self) -> EegResult<()> {
        if !(self.amplitude_factor > 0.0 && self.gradient_factor > 0.0) {
            return Err(eeg_core::config_error!("outlier factors must be positive"));
        }
        if !(self.merge_gap_secs >= 0.0 && self.padding_secs >= 0.0) {
            return Err(eeg_core::config_error!("merge gap and padding must not be negative"));
        }
        Ok(())
    }
}

/// Outcome of a range detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeAnalysis {
    pub succeeded: bool,
    /// Sorted, non-overlapping ranges inside the recording
    pub ranges: Vec<TimeRange>,
    pub diagnostic: Option<String>,
}

const AMPLITUDE: u8 = 0b01;
const GRADIENT: u8 = 0b10;

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    kinds: u8,
}

/// Finds amplitude and gradient artifacts in a record
#[derive(Debug, Clone, Default)]
pub struct ArtifactRangeDetector {
    config: RangeDetectorConfig,
}

impl ArtifactRangeDetector {
    pub fn new(config: RangeDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RangeDetectorConfig {
        &self.config
    }

    pub fn analyze(&self, record: &Record) -> RangeAnalysis {
        let samples = record.sample_count();
        if record.lead_count() == 0 || samples < 2 {
            return RangeAnalysis {
                succeeded: false,
                ranges: Vec::new(),
                diagnostic: Some(format!("record '{}' is too short for range detection", record.name)),
            };
        }

        let mut marks = vec![0u8; samples];
        let mut skipped = Vec::new();

        for lead in record.leads() {
            if !self.mark_lead(&lead.samples, &mut marks) {
                skipped.push(lead.name.as_str());
            }
        }

        let ranges = self.build_ranges(&marks, record.sample_rate);

        debug!(record = %record.name, ranges = ranges.len(), "artifact range detection finished");

        let diagnostic = (!skipped.is_empty())
            .then(|| format!("leads without spread skipped: {}", skipped.join(", ")));

        RangeAnalysis {
            succeeded: true,
            ranges,
            diagnostic,
        }
    }

    /// Copy of `record` with the detected ranges appended to its annotations
    pub fn annotate(&self, record: &Record) -> EegResult<Record> {
        let analysis = self.analyze(record);
        if !analysis.succeeded {
            return Err(eeg_core::invalid_input!(
                "{}",
                analysis.diagnostic.unwrap_or_else(|| "range detection failed".to_string())
            ));
        }

        let mut ranges = record.ranges().to_vec();
        ranges.extend(analysis.ranges);
        record.clone().with_ranges(ranges)
    }

    /// Mark outlier samples of one lead; false when the lead is constant
    fn mark_lead(&self, samples: &[f64], marks: &mut [u8]) -> bool {
        let Some((center, scale)) = location_scale(samples) else {
            return false;
        };
        if !(scale > 0.0) {
            return false;
        }

        let limit = self.config.amplitude_factor * scale;
        for (mark, &value) in marks.iter_mut().zip(samples) {
            if (value - center).abs() > limit {
                *mark |= AMPLITUDE;
            }
        }

        let differences: Vec<f64> = samples.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some((d_center, d_scale)) = location_scale(&differences) {
            if d_scale > 0.0 {
                let limit = self.config.gradient_factor * d_scale;
                for (i, &d) in differences.iter().enumerate() {
                    if (d - d_center).abs() > limit {
                        // A jump touches both samples around it
                        marks[i] |= GRADIENT;
                        marks[i + 1] |= GRADIENT;
                    }
                }
            }
        }

        true
    }

    fn build_ranges(&self, marks: &[u8], sample_rate: f64) -> Vec<TimeRange> {
        let total = marks.len();
        let padding = (self.config.padding_secs * sample_rate).round() as usize;
        let gap = (self.config.merge_gap_secs * sample_rate).round() as usize;

        let mut spans: Vec<Span> = Vec::new();
        let mut current: Option<Span> = None;

        for (i, &mark) in marks.iter().enumerate() {
            if mark == 0 {
                spans.extend(current.take());
                continue;
            }
            match current.as_mut() {
                Some(span) => {
                    span.end = i + 1;
                    span.kinds |= mark;
                }
                None => current = Some(Span { start: i, end: i + 1, kinds: mark }),
            }
        }
        spans.extend(current);

        let mut merged: Vec<Span> = Vec::new();
        for span in spans {
            let padded = Span {
                start: span.start.saturating_sub(padding),
                end: (span.end + padding).min(total),
                kinds: span.kinds,
            };

            match merged.last_mut() {
                Some(last) if padded.start <= last.end + gap => {
                    last.end = last.end.max(padded.end);
                    last.kinds |= padded.kinds;
                }
                _ => merged.push(padded),
            }
        }

        merged
            .into_iter()
            .map(|span| TimeRange::new(span.start, span.end - span.start, label(span.kinds)))
            .collect()
    }
}

fn label(kinds: u8) -> &'static str {
    match (kinds & AMPLITUDE != 0, kinds & GRADIENT != 0) {
        (true, true) => "artifact: amplitude+gradient",
        (true, false) => "artifact: amplitude",
        _ => "artifact: gradient",
    }
}
