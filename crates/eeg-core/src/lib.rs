//! EEG-Core: Foundation types for EEG cleaning
//!
//! Leads, recordings with time-range annotations, and the component records
//! produced by independent component analysis.

pub mod error;
pub mod lead;
pub mod record;
pub mod component;

pub use lead::*;
pub use record::*;
pub use component::*;
pub use error::{EegError, EegResult};
