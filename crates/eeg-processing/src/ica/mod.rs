//! Independent component analysis: decomposition and reconstruction

pub mod composer;
pub mod decomposer;

pub use composer::{compose, ComposerConfig, IcaComposer, SuppressionPolicy};
pub use decomposer::{decompose, DecomposerConfig, IcaDecomposer, Nonlinearity};
