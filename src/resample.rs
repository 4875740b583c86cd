//! Grid resampling
//!
//! Subjects may be tested over different noise ranges. Mapping every curve onto
//! one canonical grid makes curves directly comparable and combinable.
//!
//! Interpolation is piecewise-linear with an asymmetric boundary policy:
//! - at or beyond the last observed level the last value is held flat
//! - below the first observed level the first segment is extended linearly

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::types::{ResampledCurve, SubjectCurve};

/// Lowest point of the standard grid (dB)
pub const STANDARD_GRID_START: f64 = -14.0;
/// Spacing of the standard grid (dB)
pub const STANDARD_GRID_STEP: f64 = 2.0;
/// Number of points of the standard grid
pub const STANDARD_GRID_POINTS: usize = 11;
/// Upper bound on the points of any grid
pub const MAX_GRID_POINTS: usize = 1_000;

/// Canonical ascending grid of noise levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Grid(Vec<f64>);

impl Default for Grid {
    fn default() -> Self {
        Self::standard()
    }
}

impl Grid {
    /// -14 dB to +6 dB in 2 dB steps
    pub fn standard() -> Self {
        Self(
            (0..STANDARD_GRID_POINTS)
                .map(|i| STANDARD_GRID_START + i as f64 * STANDARD_GRID_STEP)
                .collect(),
        )
    }

    /// Build a grid from finite, strictly ascending points
    pub fn new(points: Vec<f64>) -> Result<Self, ScoreError> {
        if points.is_empty() {
            return Err(ScoreError::InvalidGrid("grid has no points".to_string()));
        }
        if points.len() > MAX_GRID_POINTS {
            return Err(ScoreError::InvalidGrid(format!(
                "grid has {} points, at most {MAX_GRID_POINTS} allowed",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(ScoreError::InvalidGrid(format!("non-finite point {bad}")));
        }
        ensure_strictly_ascending(&points)
            .map_err(|(a, b)| ScoreError::InvalidGrid(format!("{b} does not follow {a}")))?;
        Ok(Self(points))
    }

    /// Evenly spaced grid from `start` to `end` inclusive
    pub fn linear(start: f64, end: f64, step: f64) -> Result<Self, ScoreError> {
        if !(step > 0.0) || !(end >= start) {
            return Err(ScoreError::InvalidGrid(format!(
                "cannot step from {start} to {end} by {step}"
            )));
        }
        let span = ((end - start) / step).floor();
        if !(span < MAX_GRID_POINTS as f64) {
            return Err(ScoreError::InvalidGrid(format!(
                "stepping from {start} to {end} by {step} exceeds {MAX_GRID_POINTS} points"
            )));
        }
        let count = span as usize + 1;
        Self::new((0..count).map(|i| start + i as f64 * step).collect())
    }

    pub fn points(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<f64>> for Grid {
    type Error = ScoreError;

    fn try_from(points: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Grid> for Vec<f64> {
    fn from(grid: Grid) -> Self {
        grid.0
    }
}

/// Resampler bound to one canonical grid
#[derive(Debug, Clone, Default)]
pub struct GridResampler {
    grid: Grid,
}

impl GridResampler {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Map a subject curve's success rates and durations onto the grid
    pub fn resample(&self, curve: &SubjectCurve) -> Result<ResampledCurve, ScoreError> {
        let success_rates =
            interpolate_onto(&curve.noise_levels, &curve.success_rates, &self.grid)?;
        let mean_durations =
            interpolate_onto(&curve.noise_levels, &curve.mean_durations, &self.grid)?;

        Ok(ResampledCurve {
            subject_id: curve.subject_id.clone(),
            grid: self.grid.points().to_vec(),
            success_rates,
            mean_durations,
        })
    }
}

/// Interpolate the series `(xs, ys)` at every grid point
///
/// `xs` must be strictly ascending and as long as `ys`. An empty series yields
/// `None` at every point.
pub fn interpolate_onto(
    xs: &[f64],
    ys: &[f64],
    grid: &Grid,
) -> Result<Vec<Option<f64>>, ScoreError> {
    if xs.len() != ys.len() {
        return Err(ScoreError::InvalidGrid(format!(
            "series has {} levels but {} values",
            xs.len(),
            ys.len()
        )));
    }
    ensure_strictly_ascending(xs).map_err(|(a, b)| {
        ScoreError::InvalidGrid(format!("series level {b} does not follow {a}"))
    })?;

    Ok(grid
        .points()
        .iter()
        .map(|&x| interpolate_at(xs, ys, x))
        .collect())
}

/// Value of the series at `x`; the series must be strictly ascending
fn interpolate_at(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    let last = xs.len().checked_sub(1)?;

    // Scan forward while the next level is still below x
    let mut i = 0;
    while i < last && xs[i + 1] < x {
        i += 1;
    }

    if i == last {
        return Some(ys[last]);
    }

    let (x1, x2) = (xs[i], xs[i + 1]);
    let (y1, y2) = (ys[i], ys[i + 1]);

    if x == x1 {
        return Some(y1);
    }
    if x == x2 {
        return Some(y2);
    }

    Some(y1 + ((y2 - y1) * (x - x1)) / (x2 - x1))
}

fn ensure_strictly_ascending(xs: &[f64]) -> Result<(), (f64, f64)> {
    match xs.windows(2).find(|pair| !(pair[0] < pair[1])) {
        Some(pair) => Err((pair[0], pair[1])),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestDesign;

    fn curve(levels: &[f64], rates: &[f64]) -> SubjectCurve {
        SubjectCurve {
            subject_id: "s1".to_string(),
            design: TestDesign::default(),
            noise_levels: levels.to_vec(),
            success_rates: rates.to_vec(),
            mean_durations: vec![800.0; levels.len()],
            trial_counts: vec![4; levels.len()],
            valid_trial_count: 4 * levels.len(),
            expected_trial_count: 4 * levels.len(),
            trials: Vec::new(),
        }
    }

    #[test]
    fn test_standard_grid() {
        let grid = Grid::standard();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid.points()[0], -14.0);
        assert_eq!(grid.points()[10], 6.0);
        assert_eq!(Grid::linear(-14.0, 6.0, 2.0).unwrap(), grid);
    }

    #[test]
    fn test_grid_rejects_bad_points() {
        assert!(Grid::new(vec![]).is_err());
        assert!(Grid::new(vec![0.0, 0.0]).is_err());
        assert!(Grid::new(vec![2.0, 0.0]).is_err());
        assert!(Grid::new(vec![0.0, f64::NAN]).is_err());
        assert!(Grid::linear(0.0, 4.0, 0.0).is_err());
    }

    #[test]
    fn test_grid_size_is_bounded() {
        assert!(Grid::linear(0.0, 1e12, 1e-6).is_err());
        assert!(Grid::linear(0.0, f64::MAX, f64::MIN_POSITIVE).is_err());
        assert_eq!(
            Grid::linear(0.0, 999.0, 1.0).unwrap().len(),
            MAX_GRID_POINTS
        );
        assert!(Grid::linear(0.0, 1000.0, 1.0).is_err());
        let too_many: Vec<f64> = (0..=MAX_GRID_POINTS).map(|i| i as f64).collect();
        assert!(Grid::new(too_many).is_err());
    }

    #[test]
    fn test_grid_serde_validates() {
        let grid: Grid = serde_json::from_str("[-4, -2, 0]").unwrap();
        assert_eq!(grid.points(), &[-4.0, -2.0, 0.0]);
        assert!(serde_json::from_str::<Grid>("[0, -2]").is_err());
    }

    #[test]
    fn test_flat_extrapolation_right() {
        let grid = Grid::new(vec![0.0]).unwrap();
        let values = interpolate_onto(&[-10.0, -8.0, -6.0], &[20.0, 50.0, 90.0], &grid).unwrap();
        assert_eq!(values, vec![Some(90.0)]);
    }

    #[test]
    fn test_observed_levels_are_exact() {
        let xs = [-12.0, -9.0, -6.0, -3.0];
        let ys = [100.0 / 3.0, 200.0 / 3.0, 70.0, 0.1 + 0.2];
        let grid = Grid::new(xs.to_vec()).unwrap();
        let values = interpolate_onto(&xs, &ys, &grid).unwrap();
        let expected: Vec<Option<f64>> = ys.iter().copied().map(Some).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_interpolation_between_levels() {
        let grid = Grid::new(vec![-9.0, -7.0]).unwrap();
        let values = interpolate_onto(&[-10.0, -8.0, -6.0], &[20.0, 50.0, 90.0], &grid).unwrap();
        assert_eq!(values, vec![Some(35.0), Some(70.0)]);
    }

    #[test]
    fn test_linear_extrapolation_left() {
        // First segment slope is 15 %/dB, extended below -10 dB
        let grid = Grid::new(vec![-14.0, -12.0]).unwrap();
        let values = interpolate_onto(&[-10.0, -8.0, -6.0], &[20.0, 50.0, 90.0], &grid).unwrap();
        assert_eq!(values, vec![Some(-40.0), Some(-10.0)]);
    }

    #[test]
    fn test_single_point_series_is_flat() {
        let grid = Grid::standard();
        let values = interpolate_onto(&[-4.0], &[75.0], &grid).unwrap();
        assert!(values.iter().all(|v| *v == Some(75.0)));
    }

    #[test]
    fn test_empty_series_is_missing() {
        let grid = Grid::standard();
        let values = interpolate_onto(&[], &[], &grid).unwrap();
        assert_eq!(values.len(), 11);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn test_unsorted_series_is_rejected() {
        let grid = Grid::standard();
        assert!(interpolate_onto(&[-6.0, -8.0], &[1.0, 2.0], &grid).is_err());
        assert!(interpolate_onto(&[-6.0], &[1.0, 2.0], &grid).is_err());
    }

    #[test]
    fn test_resample_curve() {
        let resampler = GridResampler::default();
        let resampled = resampler
            .resample(&curve(&[-10.0, -8.0, -6.0], &[20.0, 50.0, 90.0]))
            .unwrap();

        assert_eq!(resampled.subject_id, "s1");
        assert_eq!(resampled.grid, Grid::standard().points().to_vec());
        assert_eq!(resampled.success_rates.len(), 11);
        // Grid index 2 is -10 dB
        assert_eq!(resampled.success_rates[2], Some(20.0));
        // Grid index 10 is +6 dB
        assert_eq!(resampled.success_rates[10], Some(90.0));
        assert!(resampled.mean_durations.iter().all(|d| *d == Some(800.0)));
    }
}
