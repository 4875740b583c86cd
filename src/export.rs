//! Report encoding
//!
//! This module encodes analysis results into self-describing JSON reports
//! and exports cohort statistics as CSV.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoreError;
use crate::types::{
    Analysis, CohortStatistics, ComparisonMetrics, NoiseRange, Rejection, SelectionAnalysis,
    SubjectCurve, SubjectSummary,
};
use crate::{PRODUCER_NAME, RSB_SCORE_VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Header row of the cohort CSV export
pub const CSV_HEADER: &str = "RSB (dB),Mean %,Std dev,Min,Max,Mean time (ms)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One accepted subject in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub subject_id: String,
    pub valid_trial_count: usize,
    pub expected_trial_count: usize,
    pub completeness: f64,
    pub noise_levels: Vec<f64>,
    pub success_rates: Vec<f64>,
    pub mean_durations: Vec<f64>,
    pub summary: Option<SubjectSummary>,
    pub metrics: ComparisonMetrics,
}

/// Statistics over a selection of subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSection {
    pub subject_ids: Vec<String>,
    pub rejections: Vec<Rejection>,
    pub statistics: CohortStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub subjects: Vec<SubjectEntry>,
    pub rejections: Vec<Rejection>,
    pub statistics: CohortStatistics,
    pub common_range: Option<NoiseRange>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selection: Option<SelectionSection>,
}

/// Report encoder stamping every report with its producer
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a cohort analysis
    pub fn encode(&self, analysis: &Analysis) -> AnalysisReport {
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: RSB_SCORE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            subjects: analysis.curves.iter().map(subject_entry).collect(),
            rejections: analysis.rejections.clone(),
            statistics: analysis.statistics.clone(),
            common_range: analysis.common_range,
            selection: None,
        }
    }

    /// Encode a selection together with the cohort it was drawn from
    pub fn encode_selection(&self, analysis: &SelectionAnalysis) -> AnalysisReport {
        let mut report = self.encode(&analysis.cohort);
        report.selection = Some(SelectionSection {
            subject_ids: analysis
                .selection
                .curves
                .iter()
                .map(|c| c.subject_id.clone())
                .collect(),
            rejections: analysis.selection.rejections.clone(),
            statistics: analysis.selection.statistics.clone(),
        });
        report
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, analysis: &Analysis) -> Result<String, ScoreError> {
        serde_json::to_string_pretty(&self.encode(analysis)).map_err(ScoreError::JsonError)
    }
}

fn subject_entry(curve: &SubjectCurve) -> SubjectEntry {
    SubjectEntry {
        subject_id: curve.subject_id.clone(),
        valid_trial_count: curve.valid_trial_count,
        expected_trial_count: curve.expected_trial_count,
        completeness: curve.completeness(),
        noise_levels: curve.noise_levels.clone(),
        success_rates: curve.success_rates.clone(),
        mean_durations: curve.mean_durations.clone(),
        summary: SubjectSummary::from_curve(curve),
        metrics: ComparisonMetrics::from_curve(curve),
    }
}

/// Cohort statistics as CSV, one row per grid point
pub fn cohort_to_csv(stats: &CohortStatistics) -> Result<String, ScoreError> {
    let width = stats.grid.len();
    let columns = [
        &stats.mean,
        &stats.std_dev,
        &stats.min,
        &stats.max,
        &stats.mean_duration,
    ];
    if columns.iter().any(|c| c.len() != width) {
        return Err(ScoreError::Export(
            "statistics columns do not match the grid".to_string(),
        ));
    }

    let mut lines = Vec::with_capacity(width + 1);
    lines.push(CSV_HEADER.to_string());
    for (i, level) in stats.grid.iter().enumerate() {
        lines.push(format!(
            "{level},{:.2},{:.2},{:.2},{:.2},{:.2}",
            stats.mean[i], stats.std_dev[i], stats.min[i], stats.max[i], stats.mean_duration[i]
        ));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestDesign;
    use pretty_assertions::assert_eq;

    fn make_test_analysis() -> Analysis {
        let curve = SubjectCurve {
            subject_id: "alice".to_string(),
            design: TestDesign::default(),
            noise_levels: vec![-4.0, -2.0],
            success_rates: vec![25.0, 75.0],
            mean_durations: vec![1200.0, 800.0],
            trial_counts: vec![4, 4],
            valid_trial_count: 8,
            expected_trial_count: 8,
            trials: Vec::new(),
        };
        let statistics = CohortStatistics {
            grid: vec![-4.0, -2.0],
            mean: vec![25.0, 75.0],
            std_dev: vec![0.0, 0.0],
            lower_bound: vec![25.0, 75.0],
            upper_bound: vec![25.0, 75.0],
            min: vec![25.0, 75.0],
            max: vec![25.0, 75.0],
            mean_duration: vec![1200.0, 800.0],
            counts: vec![1, 1],
            subject_count: 1,
        };
        Analysis {
            curves: vec![curve],
            rejections: Vec::new(),
            statistics,
            common_range: Some(NoiseRange {
                min: 0.0,
                max: -14.0,
            }),
        }
    }

    #[test]
    fn test_encode_report() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&make_test_analysis());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, RSB_SCORE_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.subjects.len(), 1);

        let subject = &report.subjects[0];
        assert_eq!(subject.completeness, 1.0);
        assert_eq!(subject.metrics.rsb50, Some(-3.0));
        assert_eq!(subject.summary.map(|s| s.mean), Some(50.0));
        assert!(report.selection.is_none());
    }

    #[test]
    fn test_encode_to_json() {
        let json = ReportEncoder::new()
            .encode_to_json(&make_test_analysis())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("statistics").is_some());
        assert!(parsed.get("selection").is_none());
    }

    #[test]
    fn test_encode_selection() {
        let analysis = SelectionAnalysis {
            cohort: make_test_analysis(),
            selection: make_test_analysis(),
        };
        let report = ReportEncoder::new().encode_selection(&analysis);
        let selection = report.selection.unwrap();
        assert_eq!(selection.subject_ids, vec!["alice".to_string()]);
    }

    #[test]
    fn test_cohort_csv() {
        let csv = cohort_to_csv(&make_test_analysis().statistics).unwrap();
        assert_eq!(
            csv,
            "RSB (dB),Mean %,Std dev,Min,Max,Mean time (ms)\n\
             -4,25.00,0.00,25.00,25.00,1200.00\n\
             -2,75.00,0.00,75.00,75.00,800.00"
        );
    }
}
