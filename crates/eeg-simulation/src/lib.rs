//! EEG-Simulation: synthetic multi-electrode EEG recordings
//!
//! Known sources mixed onto a montage, for testing and development of the
//! cleaning engine.

pub mod source_patterns;
pub mod eeg_simulator;

pub use eeg_simulator::*;
pub use source_patterns::*;
