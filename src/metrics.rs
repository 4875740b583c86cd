//! Per-subject comparison metrics
//!
//! Threshold levels are read off a subject's curve by inverse linear
//! interpolation: the level at which the success rate crosses a target
//! percentage. Outside the observed rates the nearest segment is extended.

use crate::types::{ComparisonMetrics, SubjectComparison, SubjectCurve, SubjectSummary};

impl ComparisonMetrics {
    /// Threshold levels and mid-curve slope of one subject
    pub fn from_curve(curve: &SubjectCurve) -> Self {
        let levels = &curve.noise_levels;
        let rates = &curve.success_rates;

        Self {
            rsb0: level_at_rate(levels, rates, 0.0),
            rsb50: level_at_rate(levels, rates, 50.0),
            rsb100: level_at_rate(levels, rates, 100.0),
            slope50: slope_near_rate(levels, rates, 50.0),
        }
    }

    /// `self - other` per metric, `None` unless both sides are known
    pub fn difference(&self, other: &Self) -> Self {
        let diff = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        Self {
            rsb0: diff(self.rsb0, other.rsb0),
            rsb50: diff(self.rsb50, other.rsb50),
            rsb100: diff(self.rsb100, other.rsb100),
            slope50: diff(self.slope50, other.slope50),
        }
    }
}

impl SubjectComparison {
    pub fn new(first: &SubjectCurve, second: &SubjectCurve) -> Self {
        let first_metrics = ComparisonMetrics::from_curve(first);
        let second_metrics = ComparisonMetrics::from_curve(second);
        Self {
            first_id: first.subject_id.clone(),
            second_id: second.subject_id.clone(),
            difference: first_metrics.difference(&second_metrics),
            first: first_metrics,
            second: second_metrics,
        }
    }
}

impl SubjectSummary {
    /// Mean and population spread of a subject's per-level success rates
    pub fn from_curve(curve: &SubjectCurve) -> Option<Self> {
        let rates = &curve.success_rates;
        if rates.is_empty() {
            return None;
        }
        let n = rates.len() as f64;
        let mean = rates.iter().sum::<f64>() / n;
        let std_dev = (rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();

        Some(Self {
            mean,
            std_dev,
            lower_bound: (mean - std_dev).max(0.0),
            upper_bound: (mean + std_dev).min(100.0),
        })
    }
}

/// Noise level at which the curve reaches `target` percent
fn level_at_rate(levels: &[f64], rates: &[f64], target: f64) -> Option<f64> {
    if levels.len() < 2 || levels.len() != rates.len() {
        return None;
    }
    let last = rates.len() - 1;

    let mut i = 0;
    while i < last && rates[i + 1] < target {
        i += 1;
    }

    // Below the first point, or past the last one, extend the end segment
    let (a, b) = if i == 0 && rates[0] > target {
        (0, 1)
    } else if i == last {
        (last - 1, last)
    } else {
        (i, i + 1)
    };

    let level = levels[a] + (levels[b] - levels[a]) * (target - rates[a]) / (rates[b] - rates[a]);
    level.is_finite().then_some(level)
}

/// Slope (% per dB) at the observed point whose rate is closest to `target`
///
/// Interior points average the slopes of both adjacent segments.
fn slope_near_rate(levels: &[f64], rates: &[f64], target: f64) -> Option<f64> {
    if levels.len() < 2 || levels.len() != rates.len() {
        return None;
    }
    let last = rates.len() - 1;

    let mut closest = 0;
    for (i, rate) in rates.iter().enumerate().skip(1) {
        if (rate - target).abs() < (rates[closest] - target).abs() {
            closest = i;
        }
    }

    let segment = |a: usize| (rates[a + 1] - rates[a]) / (levels[a + 1] - levels[a]);
    let slope = if closest == 0 {
        segment(0)
    } else if closest == last {
        segment(last - 1)
    } else {
        (segment(closest - 1) + segment(closest)) / 2.0
    };
    slope.is_finite().then_some(slope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestDesign;
    use pretty_assertions::assert_eq;

    fn curve(id: &str, levels: &[f64], rates: &[f64]) -> SubjectCurve {
        SubjectCurve {
            subject_id: id.to_string(),
            design: TestDesign::default(),
            noise_levels: levels.to_vec(),
            success_rates: rates.to_vec(),
            mean_durations: vec![900.0; levels.len()],
            trial_counts: vec![4; levels.len()],
            valid_trial_count: 4 * levels.len(),
            expected_trial_count: 4 * levels.len(),
            trials: Vec::new(),
        }
    }

    #[test]
    fn test_thresholds_inside_curve() {
        let c = curve("a", &[-12.0, -8.0, -4.0, 0.0], &[0.0, 25.0, 75.0, 100.0]);
        let metrics = ComparisonMetrics::from_curve(&c);
        assert_eq!(metrics.rsb0, Some(-12.0));
        assert_eq!(metrics.rsb50, Some(-6.0));
        assert_eq!(metrics.rsb100, Some(0.0));
        // Closest to 50 is 25 at -8 dB: (6.25 + 12.5) / 2
        assert_eq!(metrics.slope50, Some(9.375));
    }

    #[test]
    fn test_thresholds_extrapolate_both_ends() {
        // 12.5 %/dB throughout
        let c = curve("a", &[-8.0, -6.0, -4.0], &[25.0, 50.0, 75.0]);
        let metrics = ComparisonMetrics::from_curve(&c);
        assert_eq!(metrics.rsb0, Some(-10.0));
        assert_eq!(metrics.rsb50, Some(-6.0));
        assert_eq!(metrics.rsb100, Some(-2.0));
        assert_eq!(metrics.slope50, Some(12.5));
    }

    #[test]
    fn test_flat_curve_has_no_threshold() {
        let c = curve("a", &[-4.0, -2.0], &[100.0, 100.0]);
        let metrics = ComparisonMetrics::from_curve(&c);
        assert_eq!(metrics.rsb50, None);
        assert_eq!(metrics.slope50, Some(0.0));
    }

    #[test]
    fn test_single_point_has_no_metrics() {
        let c = curve("a", &[-4.0], &[50.0]);
        assert_eq!(ComparisonMetrics::from_curve(&c), ComparisonMetrics::default());
    }

    #[test]
    fn test_comparison_difference() {
        let a = curve("a", &[-8.0, -6.0, -4.0], &[20.0, 50.0, 80.0]);
        let b = curve("b", &[-6.0, -4.0, -2.0], &[20.0, 50.0, 80.0]);
        let comparison = SubjectComparison::new(&a, &b);
        assert_eq!(comparison.first_id, "a");
        assert_eq!(comparison.second_id, "b");
        assert_eq!(comparison.difference.rsb50, Some(-2.0));
        assert_eq!(comparison.difference.slope50, Some(0.0));

        let flat = curve("c", &[-4.0], &[50.0]);
        let comparison = SubjectComparison::new(&a, &flat);
        assert_eq!(comparison.difference, ComparisonMetrics::default());
    }

    #[test]
    fn test_subject_summary() {
        let c = curve("a", &[-4.0, -2.0, 0.0, 2.0], &[0.0, 0.0, 100.0, 100.0]);
        let summary = SubjectSummary::from_curve(&c).unwrap();
        assert_eq!(summary.mean, 50.0);
        assert_eq!(summary.std_dev, 50.0);
        assert_eq!(summary.lower_bound, 0.0);
        assert_eq!(summary.upper_bound, 100.0);

        assert_eq!(SubjectSummary::from_curve(&curve("e", &[], &[])), None);
    }
}
