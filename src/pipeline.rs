//! Pipeline orchestration
//!
//! This module provides the public API for RSB scoring.
//! It orchestrates the full pipeline from raw subject payloads to cohort
//! statistics.

use crate::aggregator::SubjectAggregator;
use crate::cohort::{common_range, CohortAggregator};
use crate::config::ScoringConfig;
use crate::error::ScoreError;
use crate::overview;
use crate::phonetics::{self, PhoneticComparison, SubjectPhonetics};
use crate::resample::GridResampler;
use crate::schema::RawTrialPayload;
use crate::source::SubjectSource;
use crate::types::{
    Analysis, CohortStatistics, OverviewStats, RejectReason, Rejection, ResampledCurve,
    SelectionAnalysis, SubjectComparison, SubjectCurve, SubjectPayload, SubjectRecord, TestDesign,
    WordErrors, WordStats,
};
use crate::validator::TrialValidator;

/// Score one subject's raw JSON payload with the default configuration.
///
/// # Arguments
/// * `subject_id` - Identifier reported in the curve or the rejection
/// * `raw_json` - Flat trial payload JSON
/// * `design` - Test design to score against; `None` reads it from the payload
///
/// # Example
/// ```ignore
/// let curve = score_subject("alice", &payload_json, None)?;
/// println!("{:?}", curve.success_rates);
/// ```
pub fn score_subject(
    subject_id: &str,
    raw_json: &str,
    design: Option<TestDesign>,
) -> Result<SubjectCurve, Rejection> {
    let payload = match RawTrialPayload::from_json_str(raw_json) {
        Ok(payload) => payload,
        Err(e) => {
            return log_outcome(Err(Rejection::new(
                subject_id,
                RejectReason::MalformedPayload {
                    detail: e.to_string(),
                },
            )))
        }
    };
    let processor = RsbProcessor::new();
    match design {
        Some(design) => processor.score_payload_with_design(subject_id, &payload, design),
        None => processor.score_payload(subject_id, &payload),
    }
}

/// Analyze subjects from a source with the default configuration.
///
/// `ids` selects subjects by id or name; `None` analyzes every subject.
pub fn analyze(
    source: &dyn SubjectSource,
    ids: Option<&[String]>,
) -> Result<Analysis, ScoreError> {
    RsbProcessor::new().analyze(source, ids)
}

/// Processor holding a scoring configuration.
///
/// Pipeline stages:
/// 1. TrialValidator - Parse slots and drop implausible trials
/// 2. SubjectAggregator - Per-level rates and the completeness gate
/// 3. GridResampler - Map curves onto the comparison grid
/// 4. CohortAggregator - Mean, spread and bounds per grid point
pub struct RsbProcessor {
    config: ScoringConfig,
    resampler: GridResampler,
    cohort: CohortAggregator,
}

impl Default for RsbProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RsbProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            resampler: GridResampler::new(config.grid.clone()),
            cohort: CohortAggregator::new(config.grid.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Load configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ScoreError> {
        *self = Self::with_config(ScoringConfig::from_json(json)?);
        Ok(())
    }

    /// Save configuration to JSON
    pub fn save_config(&self) -> Result<String, ScoreError> {
        self.config
            .to_json()
            .map_err(|e| ScoreError::Export(e.to_string()))
    }

    /// Score a payload against the design it declares
    pub fn score_payload(
        &self,
        subject_id: &str,
        payload: &RawTrialPayload,
    ) -> Result<SubjectCurve, Rejection> {
        let design = payload.design(&self.config.default_design);
        self.score_payload_with_design(subject_id, payload, design)
    }

    /// Score a payload against an explicit design
    pub fn score_payload_with_design(
        &self,
        subject_id: &str,
        payload: &RawTrialPayload,
        design: TestDesign,
    ) -> Result<SubjectCurve, Rejection> {
        let validated = match TrialValidator::new(&self.config).validate_with_design(payload, design)
        {
            Ok(validated) => validated,
            Err(reason) => return log_outcome(Err(Rejection::new(subject_id, reason))),
        };

        tracing::trace!(
            subject = subject_id,
            dropped_structural = validated.dropped_structural,
            dropped_implausible = validated.dropped_implausible,
            "validated trial slots"
        );

        log_outcome(
            SubjectAggregator::new(self.config.completeness_ratio).aggregate(subject_id, validated),
        )
    }

    /// Score a canonical subject record
    pub fn score_record(&self, record: &SubjectRecord) -> Result<SubjectCurve, Rejection> {
        match &record.payload {
            SubjectPayload::Present(payload) => self.score_payload(&record.id, payload),
            SubjectPayload::Missing => {
                log_outcome(Err(Rejection::new(&record.id, RejectReason::NoData)))
            }
            SubjectPayload::Malformed(detail) => log_outcome(Err(Rejection::new(
                &record.id,
                RejectReason::MalformedPayload {
                    detail: detail.clone(),
                },
            ))),
        }
    }

    /// Map a curve onto the configured grid
    pub fn resample(&self, curve: &SubjectCurve) -> Result<ResampledCurve, ScoreError> {
        self.resampler.resample(curve)
    }

    /// Cohort statistics over accepted curves
    pub fn aggregate(&self, curves: &[SubjectCurve]) -> Result<CohortStatistics, ScoreError> {
        let resampled = curves
            .iter()
            .map(|c| self.resample(c))
            .collect::<Result<Vec<_>, _>>()?;
        self.cohort.aggregate(&resampled)
    }

    /// Score every record and aggregate the accepted ones
    ///
    /// Rejections are reported in the result. Fails only when no subject is
    /// accepted.
    pub fn analyze_records(&self, records: &[SubjectRecord]) -> Result<Analysis, ScoreError> {
        let (curves, rejections) = self.score_all(records);

        if curves.is_empty() {
            return Err(ScoreError::NoValidData(format!(
                "none of {} subject(s) passed validation",
                records.len()
            )));
        }

        let statistics = self.aggregate(&curves)?;
        tracing::info!(
            accepted = curves.len(),
            rejected = rejections.len(),
            "analysis complete"
        );

        Ok(Analysis {
            common_range: common_range(&curves),
            curves,
            rejections,
            statistics,
        })
    }

    /// Analyze subjects pulled from a source
    ///
    /// A failing source is treated as having no subjects.
    pub fn analyze(
        &self,
        source: &dyn SubjectSource,
        ids: Option<&[String]>,
    ) -> Result<Analysis, ScoreError> {
        let records = fetch_or_empty(source, ids);
        self.analyze_records(&records)
    }

    /// Analyze a selection alongside the full cohort
    ///
    /// The two statistics are independent computations.
    pub fn analyze_selection(
        &self,
        source: &dyn SubjectSource,
        ids: &[String],
    ) -> Result<SelectionAnalysis, ScoreError> {
        Ok(SelectionAnalysis {
            cohort: self.analyze(source, None)?,
            selection: self.analyze(source, Some(ids))?,
        })
    }

    /// Compare the threshold metrics of two subjects
    pub fn compare(
        &self,
        source: &dyn SubjectSource,
        first: &str,
        second: &str,
    ) -> Result<SubjectComparison, ScoreError> {
        let first_curve = self.scored_subject(source, first)?;
        let second_curve = self.scored_subject(source, second)?;
        Ok(SubjectComparison::new(&first_curve, &second_curve))
    }

    /// Per-word recognition statistics over every accepted subject
    pub fn word_stats(&self, source: &dyn SubjectSource) -> Vec<WordStats> {
        let records = fetch_or_empty(source, None);
        let (curves, _) = self.score_all(&records);
        overview::word_stats(&curves)
    }

    /// Words misrecognized by accepted subjects, most errors first
    pub fn word_errors(&self, source: &dyn SubjectSource) -> Vec<WordErrors> {
        let records = fetch_or_empty(source, None);
        let (curves, _) = self.score_all(&records);
        overview::word_errors(&curves)
    }

    /// Phoneme error analysis of one accepted subject
    pub fn phonetics(
        &self,
        source: &dyn SubjectSource,
        key: &str,
    ) -> Result<SubjectPhonetics, ScoreError> {
        let curve = self.scored_subject(source, key)?;
        Ok(phonetics::analyze_subject(&curve))
    }

    /// Compare the phoneme errors of two subjects
    pub fn compare_phonetics(
        &self,
        source: &dyn SubjectSource,
        first: &str,
        second: &str,
    ) -> Result<PhoneticComparison, ScoreError> {
        let first = self.phonetics(source, first)?;
        let second = self.phonetics(source, second)?;
        Ok(phonetics::compare_phonetics(&first, &second))
    }

    /// Overview of every subject in the source
    pub fn overview(&self, source: &dyn SubjectSource) -> OverviewStats {
        let records = fetch_or_empty(source, None);
        overview::overview(&records, &self.config.default_design)
    }

    fn scored_subject(
        &self,
        source: &dyn SubjectSource,
        key: &str,
    ) -> Result<SubjectCurve, ScoreError> {
        let records = source.fetch_subjects_by_ids(&[key.to_string()])?;
        let record = records
            .first()
            .ok_or_else(|| ScoreError::UnknownSubject(key.to_string()))?;
        self.score_record(record)
            .map_err(|rejection| ScoreError::NoValidData(format!("{key}: {}", rejection.reason)))
    }

    fn score_all(&self, records: &[SubjectRecord]) -> (Vec<SubjectCurve>, Vec<Rejection>) {
        #[cfg(feature = "parallel")]
        let results: Vec<Result<SubjectCurve, Rejection>> = {
            use rayon::prelude::*;
            records.par_iter().map(|r| self.score_record(r)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<SubjectCurve, Rejection>> =
            records.iter().map(|r| self.score_record(r)).collect();

        let mut curves = Vec::new();
        let mut rejections = Vec::new();
        for result in results {
            match result {
                Ok(curve) => curves.push(curve),
                Err(rejection) => rejections.push(rejection),
            }
        }
        (curves, rejections)
    }
}

fn log_outcome(result: Result<SubjectCurve, Rejection>) -> Result<SubjectCurve, Rejection> {
    match &result {
        Ok(curve) => tracing::debug!(
            subject = %curve.subject_id,
            valid = curve.valid_trial_count,
            expected = curve.expected_trial_count,
            "subject accepted"
        ),
        Err(rejection) => tracing::warn!(
            subject = %rejection.subject_id,
            reason = %rejection.reason,
            "subject rejected"
        ),
    }
    result
}

fn fetch_or_empty(source: &dyn SubjectSource, ids: Option<&[String]>) -> Vec<SubjectRecord> {
    let fetched = match ids {
        Some(ids) => source.fetch_subjects_by_ids(ids),
        None => source.fetch_subjects(),
    };
    fetched.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "subject source failed, treating as no data");
        Vec::new()
    })
}
