//! Cohort aggregation
//!
//! Combines resampled subject curves into per-grid-point statistics. Every
//! call is a fresh computation over the curves it is given, so the full cohort
//! and any selection of subjects are aggregated independently.

use crate::error::ScoreError;
use crate::resample::Grid;
use crate::types::{CohortStatistics, NoiseRange, ResampledCurve, SubjectCurve};

/// Lowest reportable success rate (%)
pub const MIN_SUCCESS_RATE: f64 = 0.0;
/// Highest reportable success rate (%)
pub const MAX_SUCCESS_RATE: f64 = 100.0;

/// Aggregator bound to the grid every input curve must share
#[derive(Debug, Clone, Default)]
pub struct CohortAggregator {
    grid: Grid,
}

/// Mean and spread of the values observed at one grid point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct PointStats {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl CohortAggregator {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Aggregate resampled curves point by point
    ///
    /// Missing and non-finite values are skipped. A point with no values has
    /// mean 0 and count 0. The result does not depend on the order of `curves`.
    pub fn aggregate(&self, curves: &[ResampledCurve]) -> Result<CohortStatistics, ScoreError> {
        let width = self.grid.len();
        if let Some(bad) = curves
            .iter()
            .find(|c| c.success_rates.len() != width || c.mean_durations.len() != width)
        {
            return Err(ScoreError::InvalidGrid(format!(
                "curve for {} has {} points, grid has {width}",
                bad.subject_id,
                bad.success_rates.len()
            )));
        }

        let mut stats = CohortStatistics {
            grid: self.grid.points().to_vec(),
            mean: Vec::with_capacity(width),
            std_dev: Vec::with_capacity(width),
            lower_bound: Vec::with_capacity(width),
            upper_bound: Vec::with_capacity(width),
            min: Vec::with_capacity(width),
            max: Vec::with_capacity(width),
            mean_duration: Vec::with_capacity(width),
            counts: Vec::with_capacity(width),
            subject_count: curves.len(),
        };

        for index in 0..width {
            let rates = point_stats(curves.iter().map(|c| c.success_rates[index]));
            let durations = point_stats(curves.iter().map(|c| c.mean_durations[index]));

            stats.mean.push(rates.mean);
            stats.std_dev.push(rates.std_dev);
            stats
                .lower_bound
                .push((rates.mean - rates.std_dev).max(MIN_SUCCESS_RATE));
            stats
                .upper_bound
                .push((rates.mean + rates.std_dev).min(MAX_SUCCESS_RATE));
            stats.min.push(rates.min);
            stats.max.push(rates.max);
            stats.mean_duration.push(durations.mean);
            stats.counts.push(rates.count);
        }

        Ok(stats)
    }
}

/// Population statistics over the present, finite values
fn point_stats(values: impl Iterator<Item = Option<f64>>) -> PointStats {
    let mut values: Vec<f64> = values.flatten().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return PointStats::default();
    }
    // Summing in a fixed order keeps the result independent of subject order
    values.sort_by(f64::total_cmp);

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    } else {
        0.0
    };

    PointStats {
        count: values.len(),
        mean,
        std_dev,
        min: values[0],
        max: values[values.len() - 1],
    }
}

/// Noise range every accepted subject was designed to cover
///
/// Each subject's designed range is taken as `[min(start, end), max(start, end)]`.
/// The result's `min` is the largest upper end and its `max` the smallest lower
/// end, so it is inverted when the designed ranges differ.
pub fn common_range(curves: &[SubjectCurve]) -> Option<NoiseRange> {
    let ranges: Vec<NoiseRange> = curves.iter().map(|c| c.design.range()).collect();
    let min = ranges.iter().map(|r| r.max).reduce(f64::max)?;
    let max = ranges.iter().map(|r| r.min).reduce(f64::min)?;
    Some(NoiseRange { min, max })
}
