//! Timing of cleaning stages

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing and outcome of one cleaning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Stage name ("decompose", an analyzer name, "compose", ...)
    pub stage: String,
    /// Processing time in microseconds
    pub processing_time_us: u64,
    pub success: bool,
    /// Error message if the stage failed
    pub error_message: Option<String>,
}

impl StageMetrics {
    /// Start timing a stage
    pub fn start(stage: impl Into<String>) -> StageTimer {
        StageTimer {
            stage: stage.into(),
            start_time: Instant::now(),
        }
    }
}

/// Helper for timing a stage
#[derive(Debug)]
pub struct StageTimer {
    stage: String,
    start_time: Instant,
}

impl StageTimer {
    /// Finish timing and return metrics
    pub fn finish(self) -> StageMetrics {
        StageMetrics {
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            stage: self.stage,
            success: true,
            error_message: None,
        }
    }

    /// Finish with error
    pub fn finish_with_error(self, error: &str) -> StageMetrics {
        StageMetrics {
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            stage: self.stage,
            success: false,
            error_message: Some(error.to_string()),
        }
    }
}

/// Sum of the stage times in microseconds
pub fn total_time_us(stages: &[StageMetrics]) -> u64 {
    stages.iter().map(|m| m.processing_time_us).sum()
}
