//! Population overview and per-word recognition statistics

use std::collections::HashMap;

use crate::types::{
    NoiseRange, OverviewStats, SubjectCurve, SubjectPayload, SubjectRecord, TestDesign, WordErrors,
    WordStats,
};

/// Recognition statistics per target word across the given curves
///
/// Words are compared lower-cased. Sorted by presentations, most first, then
/// alphabetically.
pub fn word_stats(curves: &[SubjectCurve]) -> Vec<WordStats> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    for trial in curves.iter().flat_map(|c| &c.trials) {
        let entry = counts.entry(trial.target_word.to_lowercase()).or_default();
        entry.0 += 1;
        if trial.is_correct {
            entry.1 += 1;
        }
    }

    let mut stats: Vec<WordStats> = counts
        .into_iter()
        .map(|(word, (presentations, correct))| WordStats {
            word,
            presentations,
            correct,
            errors: presentations - correct,
            rate: (100.0 * correct as f64 / presentations as f64).round() as u32,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.presentations
            .cmp(&a.presentations)
            .then_with(|| a.word.cmp(&b.word))
    });
    stats
}

/// Words that were misrecognized at least once, most errors first
pub fn word_errors(curves: &[SubjectCurve]) -> Vec<WordErrors> {
    let mut errors: Vec<WordErrors> = word_stats(curves)
        .into_iter()
        .filter(|s| s.errors > 0)
        .map(|s| WordErrors {
            word: s.word,
            errors: s.errors,
        })
        .collect();
    errors.sort_by(|a, b| b.errors.cmp(&a.errors).then_with(|| a.word.cmp(&b.word)));
    errors
}

/// Overview of every record, accepted or not
///
/// Designs missing from a payload fall back to `defaults` field by field.
/// Payloads whose design cannot be scored count toward the totals only.
pub fn overview(records: &[SubjectRecord], defaults: &TestDesign) -> OverviewStats {
    let ages: Vec<f64> = records.iter().filter_map(|r| r.age).map(f64::from).collect();
    let average_age = (!ages.is_empty())
        .then(|| round_to_tenth(ages.iter().sum::<f64>() / ages.len() as f64));

    let mut range: Option<NoiseRange> = None;
    let mut answered_rates = Vec::new();

    for record in records {
        let SubjectPayload::Present(payload) = &record.payload else {
            continue;
        };
        let design = payload.design(defaults);
        let Ok(expected) = design.check() else {
            continue;
        };
        let designed = design.range();
        range = Some(match range {
            Some(r) => NoiseRange {
                min: r.min.min(designed.min),
                max: r.max.max(designed.max),
            },
            None => designed,
        });

        if expected > 0 {
            let answered = (0..expected)
                .map(|i| payload.slot(i))
                .filter(|slot| slot.word.is_some() && slot.response.is_some())
                .count();
            answered_rates.push(answered as f64 / expected as f64);
        }
    }

    let average_answered_rate = if answered_rates.is_empty() {
        0.0
    } else {
        round_to_tenth(100.0 * answered_rates.iter().sum::<f64>() / answered_rates.len() as f64)
    };

    OverviewStats {
        total_subjects: records.len(),
        average_age,
        rsb_range: range,
        average_answered_rate,
        last_test_date: records.iter().filter_map(|r| r.ended_at).max(),
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
