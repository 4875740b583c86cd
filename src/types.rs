//! Core types for the RSB scoring pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: canonical subject records, validated trials, subject curves,
//! resampled curves and cohort statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::RawTrialPayload;

/// Default first noise level of a test session (dB)
pub const DEFAULT_NOISE_START: i64 = 0;
/// Default last noise level of a test session (dB)
pub const DEFAULT_NOISE_END: i64 = -14;
/// Default step between consecutive noise levels (dB)
pub const DEFAULT_NOISE_STEP: i64 = -2;
/// Default number of words presented at each noise level
pub const DEFAULT_WORDS_PER_LEVEL: i64 = 4;

/// Upper bound on designed levels, beyond which a design is considered corrupt
pub const MAX_DESIGN_LEVELS: usize = 1_000;
/// Upper bound on words presented at one level
pub const MAX_WORDS_PER_LEVEL: usize = 1_000;

/// Why a test design cannot be scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DesignDefect {
    #[error("noise step is zero")]
    ZeroStep,

    #[error("noise span declares more than {} levels", MAX_DESIGN_LEVELS)]
    TooManyLevels,

    #[error("negative word count {0}")]
    NegativeWordCount(i64),

    #[error("word count {0} exceeds {} per level", MAX_WORDS_PER_LEVEL)]
    TooManyWords(i64),
}

/// Test design parameters of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDesign {
    /// First noise level (dB)
    pub noise_start: i64,
    /// Last noise level (dB)
    pub noise_end: i64,
    /// Step between levels (dB), typically negative
    pub noise_step: i64,
    /// Words presented per level
    pub words_per_level: i64,
}

impl Default for TestDesign {
    fn default() -> Self {
        Self {
            noise_start: DEFAULT_NOISE_START,
            noise_end: DEFAULT_NOISE_END,
            noise_step: DEFAULT_NOISE_STEP,
            words_per_level: DEFAULT_WORDS_PER_LEVEL,
        }
    }
}

impl TestDesign {
    /// Number of designed noise levels: `|floor((end - start) / step)| + 1`
    ///
    /// Returns `None` when the step is zero or the count does not fit a `usize`.
    pub fn level_count(&self) -> Option<usize> {
        if self.noise_step == 0 {
            return None;
        }
        // Wide enough for any pair of i64 bounds
        let span = i128::from(self.noise_end) - i128::from(self.noise_start);
        let step = i128::from(self.noise_step);
        let mut quotient = span / step;
        if span % step != 0 && (span < 0) != (step < 0) {
            quotient -= 1;
        }
        usize::try_from(quotient.unsigned_abs()).ok()?.checked_add(1)
    }

    /// Check that the design can be scored
    ///
    /// Returns the expected trial slot count.
    pub fn check(&self) -> Result<usize, DesignDefect> {
        if self.noise_step == 0 {
            return Err(DesignDefect::ZeroStep);
        }
        let levels = self
            .level_count()
            .filter(|&n| n <= MAX_DESIGN_LEVELS)
            .ok_or(DesignDefect::TooManyLevels)?;
        let words = usize::try_from(self.words_per_level)
            .map_err(|_| DesignDefect::NegativeWordCount(self.words_per_level))?;
        if words > MAX_WORDS_PER_LEVEL {
            return Err(DesignDefect::TooManyWords(self.words_per_level));
        }
        levels
            .checked_mul(words)
            .ok_or(DesignDefect::TooManyWords(self.words_per_level))
    }

    /// Designed noise levels in presentation order
    ///
    /// Empty when the span has no level count within [`MAX_DESIGN_LEVELS`].
    pub fn levels(&self) -> Vec<f64> {
        let count = self
            .level_count()
            .filter(|&n| n <= MAX_DESIGN_LEVELS)
            .unwrap_or(0);
        let (start, step) = (i128::from(self.noise_start), i128::from(self.noise_step));
        (0..count)
            .map(|i| (start + i as i128 * step) as f64)
            .collect()
    }

    /// Number of trial slots the session is expected to contain, 0 when the
    /// design cannot be scored
    pub fn expected_trial_count(&self) -> usize {
        self.check().unwrap_or(0)
    }

    /// Lowest and highest designed level
    pub fn range(&self) -> NoiseRange {
        NoiseRange {
            min: self.noise_start.min(self.noise_end) as f64,
            max: self.noise_start.max(self.noise_end) as f64,
        }
    }
}

/// Closed range of noise levels (dB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseRange {
    pub min: f64,
    pub max: f64,
}

/// One presentation of one word to one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Slot index in the raw payload
    pub slot: usize,
    /// Word that was presented
    pub target_word: String,
    /// Transcribed response
    pub response: String,
    /// Noise level of the presentation (dB)
    pub noise_level: f64,
    /// Beginning of speech (ms)
    pub start_time_ms: f64,
    /// End of speech (ms)
    pub end_time_ms: f64,
    /// `end_time_ms - start_time_ms`
    pub duration_ms: f64,
    /// Whether the response contains the target word
    pub is_correct: bool,
}

impl TrialRecord {
    pub fn new(
        slot: usize,
        target_word: impl Into<String>,
        response: impl Into<String>,
        noise_level: f64,
        start_time_ms: f64,
        end_time_ms: f64,
    ) -> Self {
        let target_word = target_word.into();
        let response = response.into();
        let is_correct = response_matches(&target_word, &response);
        Self {
            slot,
            target_word,
            response,
            // -0.0 and 0.0 are the same level
            noise_level: noise_level + 0.0,
            start_time_ms,
            end_time_ms,
            duration_ms: end_time_ms - start_time_ms,
            is_correct,
        }
    }
}

/// A response is correct when it contains the target word, ignoring case.
///
/// Extra speech around the target is tolerated, and so is a short target
/// embedded inside a longer word.
pub fn response_matches(target_word: &str, response: &str) -> bool {
    response
        .to_lowercase()
        .contains(&target_word.to_lowercase())
}

/// One subject's validated performance curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCurve {
    pub subject_id: String,
    /// Design the session was scored against
    pub design: TestDesign,
    /// Observed noise levels, ascending and unique
    pub noise_levels: Vec<f64>,
    /// Percentage of correct responses per level (0-100)
    pub success_rates: Vec<f64>,
    /// Mean response duration per level (ms)
    pub mean_durations: Vec<f64>,
    /// Number of valid trials per level
    pub trial_counts: Vec<usize>,
    pub valid_trial_count: usize,
    pub expected_trial_count: usize,
    /// Valid trials, in slot order
    pub trials: Vec<TrialRecord>,
}

impl SubjectCurve {
    /// Percentage of correct responses over all valid trials
    pub fn overall_success_rate(&self) -> Option<f64> {
        if self.trials.is_empty() {
            return None;
        }
        let correct = self.trials.iter().filter(|t| t.is_correct).count();
        Some(100.0 * correct as f64 / self.trials.len() as f64)
    }

    /// Fraction of expected trials that were valid
    pub fn completeness(&self) -> f64 {
        if self.expected_trial_count == 0 {
            return 1.0;
        }
        self.valid_trial_count as f64 / self.expected_trial_count as f64
    }
}

/// A subject curve mapped onto a canonical grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledCurve {
    pub subject_id: String,
    pub grid: Vec<f64>,
    /// Success rate per grid point, `None` where the curve has no data at all
    pub success_rates: Vec<Option<f64>>,
    /// Mean duration per grid point (ms)
    pub mean_durations: Vec<Option<f64>>,
}

/// Aggregate statistics over a set of resampled curves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    pub grid: Vec<f64>,
    pub mean: Vec<f64>,
    /// Population standard deviation
    pub std_dev: Vec<f64>,
    /// `max(0, mean - std_dev)`
    pub lower_bound: Vec<f64>,
    /// `min(100, mean + std_dev)`
    pub upper_bound: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub mean_duration: Vec<f64>,
    /// Number of contributing values per grid point
    pub counts: Vec<usize>,
    pub subject_count: usize,
}

/// Why a subject produced no curve
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("excluded, insufficient data ({valid} valid of {expected} expected trials)")]
    InsufficientData { valid: usize, expected: usize },

    #[error("excluded, no data")]
    NoData,

    #[error("excluded, malformed payload: {detail}")]
    MalformedPayload { detail: String },
}

/// A subject excluded from analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub subject_id: String,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn new(subject_id: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            subject_id: subject_id.into(),
            reason,
        }
    }
}

/// State of a subject's raw trial payload after adaptation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum SubjectPayload {
    Present(RawTrialPayload),
    Missing,
    Malformed(String),
}

/// Canonical subject record, independent of where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: String,
    pub name: String,
    pub payload: SubjectPayload,
    pub age: Option<u32>,
    pub pathology: Option<String>,
    pub comment: Option<String>,
    pub user_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SubjectRecord {
    /// Record with only an id and a payload
    pub fn new(id: impl Into<String>, payload: RawTrialPayload) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            payload: SubjectPayload::Present(payload),
            age: None,
            pathology: None,
            comment: None,
            user_id: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Whether `key` names this subject by id or by name
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.name == key
    }
}

/// Threshold metrics used to compare subjects
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    /// Noise level at 0% intelligibility (dB)
    pub rsb0: Option<f64>,
    /// Noise level at 50% intelligibility (dB)
    pub rsb50: Option<f64>,
    /// Noise level at 100% intelligibility (dB)
    pub rsb100: Option<f64>,
    /// Curve slope around 50% (% per dB)
    pub slope50: Option<f64>,
}

/// Side-by-side comparison of two subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectComparison {
    pub first_id: String,
    pub first: ComparisonMetrics,
    pub second_id: String,
    pub second: ComparisonMetrics,
    /// `first - second` for each metric
    pub difference: ComparisonMetrics,
}

/// Summary of one subject's per-level success rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Recognition statistics for one target word across subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStats {
    pub word: String,
    pub presentations: usize,
    pub correct: usize,
    pub errors: usize,
    /// Rounded percentage of correct responses
    pub rate: u32,
}

/// Misrecognitions of one target word across subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordErrors {
    pub word: String,
    pub errors: usize,
}

/// Overview of the subject population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_subjects: usize,
    pub average_age: Option<f64>,
    pub rsb_range: Option<NoiseRange>,
    /// Percentage of designed slots with both a word and a response
    pub average_answered_rate: f64,
    pub last_test_date: Option<DateTime<Utc>>,
}

/// Result of analysing a cohort or a selection of subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub curves: Vec<SubjectCurve>,
    pub rejections: Vec<Rejection>,
    pub statistics: CohortStatistics,
    pub common_range: Option<NoiseRange>,
}

/// A selection analysed against the full cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionAnalysis {
    pub cohort: Analysis,
    pub selection: Analysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_design_levels() {
        let design = TestDesign::default();
        assert_eq!(design.level_count(), Some(8));
        assert_eq!(
            design.levels(),
            vec![0.0, -2.0, -4.0, -6.0, -8.0, -10.0, -12.0, -14.0]
        );
        assert_eq!(design.expected_trial_count(), 32);
    }

    #[test]
    fn test_ascending_design() {
        let design = TestDesign {
            noise_start: -14,
            noise_end: 6,
            noise_step: 2,
            words_per_level: 4,
        };
        assert_eq!(design.level_count(), Some(11));
        assert_eq!(design.expected_trial_count(), 44);
        assert_eq!(design.range(), NoiseRange { min: -14.0, max: 6.0 });
    }

    #[test]
    fn test_uneven_span_floors() {
        // (-13 - 0) / -2 = 6.5 floors to 6
        let design = TestDesign {
            noise_end: -13,
            ..Default::default()
        };
        assert_eq!(design.level_count(), Some(7));
    }

    #[test]
    fn test_zero_step_has_no_levels() {
        let design = TestDesign {
            noise_step: 0,
            ..Default::default()
        };
        assert_eq!(design.level_count(), None);
        assert!(design.levels().is_empty());
        assert_eq!(design.expected_trial_count(), 0);
        assert_eq!(design.check(), Err(DesignDefect::ZeroStep));
    }

    #[test]
    fn test_saturated_span_does_not_overflow() {
        let design = TestDesign {
            noise_start: i64::MAX,
            noise_end: i64::MIN,
            noise_step: -2,
            words_per_level: 4,
        };
        assert_eq!(design.level_count(), Some(1usize << 63));
        assert_eq!(design.check(), Err(DesignDefect::TooManyLevels));
        assert!(design.levels().is_empty());
        assert_eq!(design.expected_trial_count(), 0);

        let unit_step = TestDesign {
            noise_step: 1,
            noise_start: i64::MIN,
            noise_end: i64::MAX,
            words_per_level: 1,
        };
        // 2^64 levels do not fit
        assert_eq!(unit_step.level_count(), None);
        assert_eq!(unit_step.check(), Err(DesignDefect::TooManyLevels));
    }

    #[test]
    fn test_word_count_is_bounded() {
        let huge = TestDesign {
            words_per_level: i64::MAX,
            ..Default::default()
        };
        assert_eq!(huge.check(), Err(DesignDefect::TooManyWords(i64::MAX)));
        assert_eq!(huge.expected_trial_count(), 0);

        let negative = TestDesign {
            words_per_level: -1,
            ..Default::default()
        };
        assert_eq!(negative.check(), Err(DesignDefect::NegativeWordCount(-1)));

        let largest = TestDesign {
            words_per_level: MAX_WORDS_PER_LEVEL as i64,
            ..Default::default()
        };
        assert_eq!(largest.check(), Ok(8 * MAX_WORDS_PER_LEVEL));
    }

    #[test]
    fn test_response_matching() {
        assert!(response_matches("cat", "the cat sat"));
        assert!(response_matches("Cat", "THE CAT"));
        assert!(response_matches("cat", "concatenate"));
        assert!(!response_matches("cat", "dog"));
    }

    #[test]
    fn test_trial_record_derives_fields() {
        let trial = TrialRecord::new(3, "maison", "une maison", -0.0, 1000.0, 1850.0);
        assert_eq!(trial.duration_ms, 850.0);
        assert!(trial.is_correct);
        assert!(trial.noise_level.is_sign_positive());
    }

    #[test]
    fn test_reject_reason_message() {
        let reason = RejectReason::InsufficientData {
            valid: 30,
            expected: 44,
        };
        assert_eq!(
            reason.to_string(),
            "excluded, insufficient data (30 valid of 44 expected trials)"
        );
    }
}
