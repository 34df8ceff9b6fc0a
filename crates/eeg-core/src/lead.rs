//! Leads: named sample sequences, optionally tied to a scalp electrode

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scalp region of an electrode, derived from its 10-20 name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LeadType {
    Frontal,
    Temporal,
    Central,
    Parietal,
    Occipital,
    Unknown,
}

impl LeadType {
    /// Classify an electrode by its name prefix (`AF`/`F`, `T`, `C`, `P`, `O`).
    pub fn from_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();

        if upper.starts_with("AF") || upper.starts_with('F') {
            LeadType::Frontal
        } else if upper.starts_with('T') {
            LeadType::Temporal
        } else if upper.starts_with('C') {
            LeadType::Central
        } else if upper.starts_with('P') {
            LeadType::Parietal
        } else if upper.starts_with('O') {
            LeadType::Occipital
        } else {
            LeadType::Unknown
        }
    }

    pub fn is_frontal(&self) -> bool {
        matches!(self, LeadType::Frontal)
    }
}

impl std::fmt::Display for LeadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadType::Frontal => write!(f, "Frontal"),
            LeadType::Temporal => write!(f, "Temporal"),
            LeadType::Central => write!(f, "Central"),
            LeadType::Parietal => write!(f, "Parietal"),
            LeadType::Occipital => write!(f, "Occipital"),
            LeadType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Name and electrode classification of a lead, without its samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDescriptor {
    pub name: String,
    /// `Some` for electrode leads, `None` for derived channels
    pub electrode: Option<LeadType>,
}

/// A named signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub samples: Vec<f64>,
    /// `Some` for electrode leads, `None` for derived channels
    pub electrode: Option<LeadType>,
}

impl Lead {
    /// Create a derived (non-electrode) lead
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
            electrode: None,
        }
    }

    /// Create an electrode lead, classified from its name
    pub fn electrode(name: impl Into<String>, samples: Vec<f64>) -> Self {
        let name = name.into();
        let lead_type = LeadType::from_name(&name);
        Self {
            name,
            samples,
            electrode: Some(lead_type),
        }
    }

    /// Rebuild a lead from a descriptor and new samples
    pub fn from_descriptor(descriptor: &LeadDescriptor, samples: Vec<f64>) -> Self {
        Self {
            name: descriptor.name.clone(),
            samples,
            electrode: descriptor.electrode,
        }
    }

    pub fn descriptor(&self) -> LeadDescriptor {
        LeadDescriptor {
            name: self.name.clone(),
            electrode: self.electrode,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_electrode(&self) -> bool {
        self.electrode.is_some()
    }

    /// Scalp region, `Unknown` for derived leads
    pub fn lead_type(&self) -> LeadType {
        self.electrode.unwrap_or(LeadType::Unknown)
    }

    pub fn stats(&self) -> LeadStats {
        LeadStats::calculate(&self.samples)
    }

    /// Display ordering: electrodes before derived leads, then by scalp
    /// region, then by name.
    pub fn position_cmp(&self, other: &Lead) -> Ordering {
        let by_kind = match (self.electrode, other.electrode) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_kind.then_with(|| self.name.cmp(&other.name))
    }
}

/// Basic statistics for a lead
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl LeadStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;

        let sum_sq: f64 = data.iter().map(|x| x * x).sum();
        let rms = (sum_sq / n).sqrt();

        let variance: f64 = data.iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev,
            min,
            max,
            peak_to_peak: max - min,
        }
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Largest absolute sample value
    pub fn max_abs(&self) -> f64 {
        self.min.abs().max(self.max.abs())
    }
}
