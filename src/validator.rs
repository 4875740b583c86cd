//! Trial validation
//!
//! This module turns a flat trial payload into validated trial records:
//! - designed noise levels and expected slot count from the test design
//! - structural checks (word, response, level and timings present)
//! - plausibility checks (response duration within the configured window)
//!
//! Individual trials that fail a check are dropped silently. Only the
//! completeness gate of the aggregator can exclude a subject.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::schema::{RawSlot, RawTrialPayload};
use crate::types::{RejectReason, TestDesign, TrialRecord};

/// Trials that survived validation, with the design they were checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedTrials {
    pub design: TestDesign,
    pub designed_levels: Vec<f64>,
    pub expected_trial_count: usize,
    pub trials: Vec<TrialRecord>,
    /// Slots missing a required field
    pub dropped_structural: usize,
    /// Slots with an implausible response duration
    pub dropped_implausible: usize,
}

impl ValidatedTrials {
    pub fn valid_trial_count(&self) -> usize {
        self.trials.len()
    }
}

/// Why a slot was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotDefect {
    Structural,
    Implausible,
}

/// Validator for raw trial payloads
pub struct TrialValidator<'a> {
    config: &'a ScoringConfig,
}

impl<'a> TrialValidator<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Validate a payload against the design it declares
    pub fn validate(&self, payload: &RawTrialPayload) -> Result<ValidatedTrials, RejectReason> {
        let design = payload.design(&self.config.default_design);
        self.validate_with_design(payload, design)
    }

    /// Validate a payload against an explicit design
    pub fn validate_with_design(
        &self,
        payload: &RawTrialPayload,
        design: TestDesign,
    ) -> Result<ValidatedTrials, RejectReason> {
        if payload.is_empty() {
            return Err(RejectReason::NoData);
        }
        let expected_trial_count = design
            .check()
            .map_err(|defect| RejectReason::MalformedPayload {
                detail: defect.to_string(),
            })?;
        let designed_levels = design.levels();

        let mut trials = Vec::new();
        let mut dropped_structural = 0;
        let mut dropped_implausible = 0;

        for index in 0..expected_trial_count {
            match self.check_slot(payload.slot(index)) {
                Ok(trial) => trials.push(trial),
                Err(SlotDefect::Structural) => {
                    tracing::trace!(slot = index, "dropping incomplete trial slot");
                    dropped_structural += 1;
                }
                Err(SlotDefect::Implausible) => {
                    tracing::trace!(slot = index, "dropping trial with implausible duration");
                    dropped_implausible += 1;
                }
            }
        }

        Ok(ValidatedTrials {
            design,
            designed_levels,
            expected_trial_count,
            trials,
            dropped_structural,
            dropped_implausible,
        })
    }

    fn check_slot(&self, slot: RawSlot<'_>) -> Result<TrialRecord, SlotDefect> {
        let (Some(word), Some(response), Some(level), Some(start), Some(end)) = (
            slot.word,
            slot.response,
            slot.noise_level,
            slot.speech_start,
            slot.speech_end,
        ) else {
            return Err(SlotDefect::Structural);
        };

        if !self.config.is_plausible_duration(end - start) {
            return Err(SlotDefect::Implausible);
        }

        Ok(TrialRecord::new(slot.index, word, response, level, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn slot(fields: &mut Map<String, Value>, i: usize, word: &str, resp: &str, rsb: f64, dur: f64) {
        fields.insert(format!("wordHist/{i}/word"), json!(word));
        fields.insert(format!("wordHist/{i}/resp"), json!(resp));
        fields.insert(format!("wordHist/{i}/rsb"), json!(rsb));
        fields.insert(format!("wordHist/{i}/beginningOfSpeechTime"), json!(1000.0));
        fields.insert(format!("wordHist/{i}/endOfSpeechTime"), json!(1000.0 + dur));
    }

    fn small_design_payload() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("rsbStart".into(), json!(0));
        fields.insert("rsbEnd".into(), json!(-2));
        fields.insert("rsbStep".into(), json!(-2));
        fields.insert("wordCnt".into(), json!(2));
        fields
    }

    #[test]
    fn test_all_slots_valid() {
        let mut fields = small_design_payload();
        slot(&mut fields, 0, "chat", "le chat", 0.0, 500.0);
        slot(&mut fields, 1, "chien", "loup", 0.0, 700.0);
        slot(&mut fields, 2, "pain", "pain", -2.0, 900.0);
        slot(&mut fields, 3, "vin", "vingt", -2.0, 1100.0);

        let config = ScoringConfig::default();
        let validated = TrialValidator::new(&config)
            .validate(&RawTrialPayload::from(fields))
            .unwrap();

        assert_eq!(validated.designed_levels, vec![0.0, -2.0]);
        assert_eq!(validated.expected_trial_count, 4);
        assert_eq!(validated.valid_trial_count(), 4);
        assert_eq!(validated.dropped_structural, 0);
        assert_eq!(validated.dropped_implausible, 0);
        assert!(validated.trials[0].is_correct);
        assert!(!validated.trials[1].is_correct);
        assert!(validated.trials[3].is_correct);
    }

    #[test]
    fn test_duration_window_is_inclusive() {
        let mut fields = small_design_payload();
        slot(&mut fields, 0, "a", "a", 0.0, 100.0);
        slot(&mut fields, 1, "b", "b", 0.0, 10_000.0);
        slot(&mut fields, 2, "c", "c", -2.0, 99.0);
        slot(&mut fields, 3, "d", "d", -2.0, 10_001.0);

        let config = ScoringConfig::default();
        let validated = TrialValidator::new(&config)
            .validate(&RawTrialPayload::from(fields))
            .unwrap();

        assert_eq!(validated.valid_trial_count(), 2);
        assert_eq!(validated.dropped_implausible, 2);
        assert!(validated.trials.iter().all(|t| t.noise_level == 0.0));
    }

    #[test]
    fn test_structural_defects_are_dropped() {
        let mut fields = small_design_payload();
        slot(&mut fields, 0, "a", "a", 0.0, 500.0);
        slot(&mut fields, 1, "", "b", 0.0, 500.0);
        slot(&mut fields, 2, "c", "c", -2.0, 500.0);
        fields.insert("wordHist/2/rsb".into(), json!("n/a"));
        // slot 3 absent entirely

        let config = ScoringConfig::default();
        let validated = TrialValidator::new(&config)
            .validate(&RawTrialPayload::from(fields))
            .unwrap();

        assert_eq!(validated.valid_trial_count(), 1);
        assert_eq!(validated.dropped_structural, 3);
    }

    #[test]
    fn test_slots_beyond_design_are_ignored() {
        let mut fields = small_design_payload();
        for i in 0..6 {
            slot(&mut fields, i, "a", "a", 0.0, 500.0);
        }
        let config = ScoringConfig::default();
        let validated = TrialValidator::new(&config)
            .validate(&RawTrialPayload::from(fields))
            .unwrap();
        assert_eq!(validated.valid_trial_count(), 4);
    }

    #[test]
    fn test_empty_payload_is_no_data() {
        let config = ScoringConfig::default();
        let result = TrialValidator::new(&config).validate(&RawTrialPayload::default());
        assert_eq!(result.unwrap_err(), RejectReason::NoData);
    }

    #[test]
    fn test_zero_step_is_malformed() {
        let mut fields = small_design_payload();
        fields.insert("rsbStep".into(), json!(0));
        let config = ScoringConfig::default();
        let result = TrialValidator::new(&config).validate(&RawTrialPayload::from(fields));
        assert!(matches!(
            result.unwrap_err(),
            RejectReason::MalformedPayload { .. }
        ));
    }

    fn rejection_detail(fields: Map<String, Value>) -> String {
        let config = ScoringConfig::default();
        match TrialValidator::new(&config).validate(&RawTrialPayload::from(fields)) {
            Err(RejectReason::MalformedPayload { detail }) => detail,
            other => panic!("expected a malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_word_count_is_malformed() {
        let mut fields = small_design_payload();
        slot(&mut fields, 0, "a", "a", 0.0, 500.0);

        fields.insert("wordCnt".into(), json!(1e19));
        assert!(rejection_detail(fields.clone()).contains("word count"));

        fields.insert("wordCnt".into(), json!(100_000_000_000_i64));
        assert!(rejection_detail(fields.clone()).contains("word count"));

        fields.insert("wordCnt".into(), json!(-3));
        assert!(rejection_detail(fields).contains("negative"));
    }

    #[test]
    fn test_overflowing_span_is_malformed() {
        let mut fields = small_design_payload();
        slot(&mut fields, 0, "a", "a", 0.0, 500.0);
        fields.insert("rsbStart".into(), json!(1e30));
        fields.insert("rsbEnd".into(), json!(-1e30));
        fields.insert("rsbStep".into(), json!(-2));
        assert!(rejection_detail(fields.clone()).contains("levels"));

        fields.insert("rsbStep".into(), json!(1));
        assert!(rejection_detail(fields).contains("levels"));
    }

    #[test]
    fn test_explicit_design_overrides_payload() {
        let mut fields = small_design_payload();
        for i in 0..6 {
            slot(&mut fields, i, "a", "a", 0.0, 500.0);
        }
        let design = TestDesign {
            noise_start: 0,
            noise_end: -4,
            noise_step: -2,
            words_per_level: 2,
        };
        let config = ScoringConfig::default();
        let validated = TrialValidator::new(&config)
            .validate_with_design(&RawTrialPayload::from(fields), design)
            .unwrap();
        assert_eq!(validated.expected_trial_count, 6);
        assert_eq!(validated.valid_trial_count(), 6);
    }
}
