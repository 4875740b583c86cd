//! Scoring configuration
//!
//! Plausibility window, completeness gate, comparison grid and the fallback
//! test design used when a payload does not declare its own.

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::resample::Grid;
use crate::types::TestDesign;

/// Shortest plausible response duration (ms)
pub const DEFAULT_MIN_DURATION_MS: f64 = 100.0;
/// Longest plausible response duration (ms)
pub const DEFAULT_MAX_DURATION_MS: f64 = 10_000.0;
/// Fraction of expected trials that must be valid to accept a subject
pub const DEFAULT_COMPLETENESS_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub completeness_ratio: f64,
    pub grid: Grid,
    pub default_design: TestDesign,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: DEFAULT_MIN_DURATION_MS,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            completeness_ratio: DEFAULT_COMPLETENESS_RATIO,
            grid: Grid::standard(),
            default_design: TestDesign::default(),
        }
    }
}

impl ScoringConfig {
    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<(), ScoreError> {
        if !(self.min_duration_ms <= self.max_duration_ms) {
            return Err(ScoreError::InvalidDesign(format!(
                "duration window [{}, {}] is empty",
                self.min_duration_ms, self.max_duration_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.completeness_ratio) {
            return Err(ScoreError::InvalidDesign(format!(
                "completeness ratio {} is outside [0, 1]",
                self.completeness_ratio
            )));
        }
        if let Err(defect) = self.default_design.check() {
            return Err(ScoreError::InvalidDesign(format!("default design: {defect}")));
        }
        Ok(())
    }

    /// Whether a response duration is physiologically plausible
    pub fn is_plausible_duration(&self, duration_ms: f64) -> bool {
        duration_ms >= self.min_duration_ms && duration_ms <= self.max_duration_ms
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
