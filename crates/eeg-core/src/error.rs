//! Error handling for the EEG cleaning engine
//!
//! Hard failures (bad input, inconsistent matrix shapes) are reported through
//! [`EegError`]. Heuristic analysis failures are not errors; analyzers report
//! them through their own result values.

use core::fmt;

/// Result type alias for engine operations
pub type EegResult<T> = Result<T, EegError>;

/// Error type for all engine operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EegError {
    /// Input recording violates a precondition (too few leads, unequal
    /// lengths, zero-variance lead, out-of-range training interval, ...)
    InvalidInput {
        /// Description of the violated precondition
        reason: String,
    },

    /// Matrix or component shapes do not agree
    DimensionMismatch {
        /// What was being compared
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Invalid configuration value
    ConfigurationError {
        /// Description of the configuration problem
        message: String,
    },

    /// Numerical processing failure
    ProcessingError {
        /// Description of the failure
        message: String,
    },
}

impl fmt::Display for EegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EegError::InvalidInput { reason } => {
                write!(f, "Invalid input: {}", reason)
            }
            EegError::DimensionMismatch { what, expected, actual } => {
                write!(f, "Dimension mismatch for {}: expected {}, actual {}",
                       what, expected, actual)
            }
            EegError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            EegError::ProcessingError { message } => {
                write!(f, "Processing error: {}", message)
            }
        }
    }
}

impl std::error::Error for EegError {}

/// Convenience macro for creating invalid input errors
#[macro_export]
macro_rules! invalid_input {
    ($($arg:tt)+) => {
        $crate::error::EegError::InvalidInput {
            reason: format!($($arg)+)
        }
    };
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::EegError::ConfigurationError {
            message: format!($($arg)+)
        }
    };
}
