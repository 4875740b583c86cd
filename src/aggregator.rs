//! Subject aggregation
//!
//! Buckets a subject's valid trials by observed noise level and applies the
//! completeness gate. This is the only place a subject is accepted or rejected.

use crate::config::DEFAULT_COMPLETENESS_RATIO;
use crate::types::{RejectReason, Rejection, SubjectCurve, TrialRecord};
use crate::validator::ValidatedTrials;

/// Per-level summary of a subject's trials
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub noise_level: f64,
    pub trial_count: usize,
    pub correct_count: usize,
    /// Percentage of correct responses (0-100)
    pub success_rate: f64,
    /// Arithmetic mean of response durations (ms)
    pub mean_duration: f64,
}

/// Aggregator turning validated trials into a subject curve
#[derive(Debug, Clone, Copy)]
pub struct SubjectAggregator {
    completeness_ratio: f64,
}

impl Default for SubjectAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETENESS_RATIO)
    }
}

impl SubjectAggregator {
    pub fn new(completeness_ratio: f64) -> Self {
        Self { completeness_ratio }
    }

    /// Build the subject's curve, or reject it when too few trials are valid
    pub fn aggregate(
        &self,
        subject_id: &str,
        validated: ValidatedTrials,
    ) -> Result<SubjectCurve, Rejection> {
        let valid = validated.valid_trial_count();
        let expected = validated.expected_trial_count;

        if !self.passes_gate(valid, expected) {
            return Err(Rejection::new(
                subject_id,
                RejectReason::InsufficientData { valid, expected },
            ));
        }

        let levels = summarize_levels(&validated.trials);

        Ok(SubjectCurve {
            subject_id: subject_id.to_string(),
            design: validated.design,
            noise_levels: levels.iter().map(|l| l.noise_level).collect(),
            success_rates: levels.iter().map(|l| l.success_rate).collect(),
            mean_durations: levels.iter().map(|l| l.mean_duration).collect(),
            trial_counts: levels.iter().map(|l| l.trial_count).collect(),
            valid_trial_count: valid,
            expected_trial_count: expected,
            trials: validated.trials,
        })
    }

    fn passes_gate(&self, valid: usize, expected: usize) -> bool {
        (valid as f64) >= self.completeness_ratio * expected as f64
    }
}

/// Group trials by exact noise level, ascending
pub fn summarize_levels(trials: &[TrialRecord]) -> Vec<LevelSummary> {
    let mut sorted: Vec<&TrialRecord> = trials.iter().collect();
    sorted.sort_by(|a, b| a.noise_level.total_cmp(&b.noise_level));

    let mut levels = Vec::new();
    let mut rest = sorted.as_slice();
    while let Some(first) = rest.first() {
        let len = rest
            .iter()
            .take_while(|t| t.noise_level == first.noise_level)
            .count();
        let (group, tail) = rest.split_at(len);
        levels.push(summarize_group(first.noise_level, group));
        rest = tail;
    }
    levels
}

fn summarize_group(noise_level: f64, group: &[&TrialRecord]) -> LevelSummary {
    let trial_count = group.len();
    let correct_count = group.iter().filter(|t| t.is_correct).count();
    let total_duration: f64 = group.iter().map(|t| t.duration_ms).sum();
    LevelSummary {
        noise_level,
        trial_count,
        correct_count,
        success_rate: 100.0 * correct_count as f64 / trial_count as f64,
        mean_duration: total_duration / trial_count as f64,
    }
}
