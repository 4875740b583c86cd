//! Phoneme-level error analysis of scored trials
//!
//! Each trial's target and response are transcribed and aligned. Every
//! non-matching position is a phoneme error, classified by phoneme category
//! and by where it falls in the target word. A subject's errors are summed
//! overall and per noise level, and substitutions feed a confusion table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::alignment::{align, EditKind};
use super::transcription::{
    phoneme_info, phonetic_distance, transcribe, PhonemeClass, PhonemeKind,
};
use crate::types::{SubjectCurve, TrialRecord};

/// One phoneme the subject got wrong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeError {
    /// Target phoneme, absent for an insertion
    pub target_phoneme: Option<String>,
    /// Heard phoneme, absent for a deletion
    pub response_phoneme: Option<String>,
    /// Index in the alignment
    pub position: usize,
    pub target_word: String,
    pub response_word: String,
    pub noise_level: f64,
    pub kind: EditKind,
}

/// Phoneme groups errors are tallied under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhonemeCategory {
    Vowel,
    Consonant,
    /// Nasal consonants
    Nasal,
    Stop,
    Fricative,
}

impl PhonemeCategory {
    pub const ALL: [PhonemeCategory; 5] = [
        PhonemeCategory::Vowel,
        PhonemeCategory::Consonant,
        PhonemeCategory::Nasal,
        PhonemeCategory::Stop,
        PhonemeCategory::Fricative,
    ];

    /// Categories a phoneme belongs to; empty for unknown symbols
    pub fn of(symbol: &str) -> Vec<PhonemeCategory> {
        let Some(info) = phoneme_info(symbol) else {
            return Vec::new();
        };
        match info.class {
            PhonemeClass::Vowel => vec![PhonemeCategory::Vowel],
            PhonemeClass::Consonant => {
                let mut categories = vec![PhonemeCategory::Consonant];
                match info.kind {
                    PhonemeKind::Nasal => categories.push(PhonemeCategory::Nasal),
                    PhonemeKind::VoicelessStop | PhonemeKind::VoicedStop => {
                        categories.push(PhonemeCategory::Stop)
                    }
                    PhonemeKind::VoicelessFricative | PhonemeKind::VoicedFricative => {
                        categories.push(PhonemeCategory::Fricative)
                    }
                    _ => {}
                }
                categories
            }
        }
    }
}

/// Part of the target word an error falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordPosition {
    Start,
    Middle,
    End,
}

impl WordPosition {
    /// Thirds of the target length; the middle also takes positions that
    /// cannot be placed
    pub fn classify(position: usize, target_length: usize) -> WordPosition {
        let ratio = position as f64 / target_length as f64;
        if ratio < 0.33 {
            WordPosition::Start
        } else if ratio > 0.66 {
            WordPosition::End
        } else {
            WordPosition::Middle
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub vowels: usize,
    pub consonants: usize,
    pub nasals: usize,
    pub stops: usize,
    pub fricatives: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: PhonemeCategory) -> usize {
        match category {
            PhonemeCategory::Vowel => self.vowels,
            PhonemeCategory::Consonant => self.consonants,
            PhonemeCategory::Nasal => self.nasals,
            PhonemeCategory::Stop => self.stops,
            PhonemeCategory::Fricative => self.fricatives,
        }
    }

    fn add(&mut self, category: PhonemeCategory) {
        let slot = match category {
            PhonemeCategory::Vowel => &mut self.vowels,
            PhonemeCategory::Consonant => &mut self.consonants,
            PhonemeCategory::Nasal => &mut self.nasals,
            PhonemeCategory::Stop => &mut self.stops,
            PhonemeCategory::Fricative => &mut self.fricatives,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCounts {
    pub start: usize,
    pub middle: usize,
    pub end: usize,
}

/// How often one target phoneme was heard as another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confusion {
    pub target_phoneme: String,
    pub response_phoneme: String,
    pub count: usize,
    /// Share of all target phonemes in the breakdown
    pub percentage: f64,
    pub mean_noise_level: f64,
}

/// Phoneme errors over a set of trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeBreakdown {
    /// Phonemes in the target words
    pub total_phonemes: usize,
    /// Target phonemes less errors, never below zero
    pub correct_phonemes: usize,
    pub errors: Vec<PhonemeError>,
    /// Substitutions, most frequent first
    pub confusions: Vec<Confusion>,
    pub errors_by_category: CategoryCounts,
    pub errors_by_position: PositionCounts,
    /// Percentage of correct phonemes; `None` without target phonemes
    pub accuracy: Option<f64>,
    /// Mean phonetic distance between target and response
    pub mean_distance: Option<f64>,
}

/// Phoneme analysis of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPhonetics {
    pub subject_id: String,
    /// Observed noise levels, ascending
    pub noise_levels: Vec<f64>,
    /// Accuracy at each of `noise_levels`
    pub accuracy_by_level: Vec<Option<f64>>,
    /// Breakdown at each of `noise_levels`
    pub by_level: Vec<PhonemeBreakdown>,
    pub overall: PhonemeBreakdown,
}

/// Confusion counts of one target phoneme in two subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionDifference {
    pub phoneme: String,
    pub first_count: usize,
    pub second_count: usize,
    pub difference: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDifference {
    pub category: PhonemeCategory,
    pub first_errors: usize,
    pub second_errors: usize,
    pub difference: i64,
}

/// Phoneme analysis of two subjects side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneticComparison {
    pub first_id: String,
    pub second_id: String,
    /// Noise levels of the first subject
    pub noise_levels: Vec<f64>,
    /// `first - second` accuracy at each level, `None` unless both are known
    pub accuracy_difference: Vec<Option<f64>>,
    /// Substitution counts per target phoneme, by phoneme
    pub confusion_differences: Vec<ConfusionDifference>,
    pub category_differences: Vec<CategoryDifference>,
}

/// Phoneme errors of one trial
pub fn trial_errors(trial: &TrialRecord) -> Vec<PhonemeError> {
    let target = transcribe(&trial.target_word);
    let response = transcribe(&trial.response);

    align(&target, &response)
        .into_iter()
        .enumerate()
        .filter(|(_, aligned)| aligned.kind != EditKind::Match)
        .map(|(position, aligned)| PhonemeError {
            target_phoneme: aligned.target,
            response_phoneme: aligned.response,
            position,
            target_word: trial.target_word.clone(),
            response_word: trial.response.clone(),
            noise_level: trial.noise_level,
            kind: aligned.kind,
        })
        .collect()
}

/// Phoneme breakdown over a set of trials
pub fn breakdown(trials: &[&TrialRecord]) -> PhonemeBreakdown {
    let mut total_phonemes = 0;
    let mut total_distance = 0;
    let mut errors = Vec::new();
    let mut errors_by_category = CategoryCounts::default();
    let mut errors_by_position = PositionCounts::default();

    for trial in trials {
        let target_length = transcribe(&trial.target_word).len();
        total_phonemes += target_length;
        total_distance += phonetic_distance(&trial.target_word, &trial.response);

        for error in trial_errors(trial) {
            if let Some(target) = &error.target_phoneme {
                for category in PhonemeCategory::of(target) {
                    errors_by_category.add(category);
                }
            }
            match WordPosition::classify(error.position, target_length) {
                WordPosition::Start => errors_by_position.start += 1,
                WordPosition::Middle => errors_by_position.middle += 1,
                WordPosition::End => errors_by_position.end += 1,
            }
            errors.push(error);
        }
    }

    let correct_phonemes = total_phonemes.saturating_sub(errors.len());
    PhonemeBreakdown {
        total_phonemes,
        correct_phonemes,
        confusions: confusions(&errors, total_phonemes),
        errors,
        errors_by_category,
        errors_by_position,
        accuracy: (total_phonemes > 0)
            .then(|| 100.0 * correct_phonemes as f64 / total_phonemes as f64),
        mean_distance: (!trials.is_empty())
            .then(|| total_distance as f64 / trials.len() as f64),
    }
}

fn confusions(errors: &[PhonemeError], total_phonemes: usize) -> Vec<Confusion> {
    let mut pairs: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for error in errors.iter().filter(|e| e.kind == EditKind::Substitution) {
        if let (Some(target), Some(response)) = (&error.target_phoneme, &error.response_phoneme) {
            pairs
                .entry((target.as_str(), response.as_str()))
                .or_default()
                .push(error.noise_level);
        }
    }

    let mut table: Vec<Confusion> = pairs
        .into_iter()
        .map(|((target, response), mut levels)| {
            levels.sort_by(f64::total_cmp);
            let count = levels.len();
            Confusion {
                target_phoneme: target.to_string(),
                response_phoneme: response.to_string(),
                count,
                percentage: if total_phonemes == 0 {
                    0.0
                } else {
                    100.0 * count as f64 / total_phonemes as f64
                },
                mean_noise_level: levels.iter().sum::<f64>() / count as f64,
            }
        })
        .collect();
    // Stable sort keeps the phoneme order among equal counts
    table.sort_by(|a, b| b.count.cmp(&a.count));
    table
}

/// Phoneme analysis of an accepted subject's valid trials
pub fn analyze_subject(curve: &SubjectCurve) -> SubjectPhonetics {
    let all: Vec<&TrialRecord> = curve.trials.iter().collect();

    let by_level: Vec<PhonemeBreakdown> = curve
        .noise_levels
        .iter()
        .map(|&level| {
            let trials: Vec<&TrialRecord> = curve
                .trials
                .iter()
                .filter(|t| t.noise_level == level)
                .collect();
            breakdown(&trials)
        })
        .collect();

    SubjectPhonetics {
        subject_id: curve.subject_id.clone(),
        noise_levels: curve.noise_levels.clone(),
        accuracy_by_level: by_level.iter().map(|b| b.accuracy).collect(),
        by_level,
        overall: breakdown(&all),
    }
}

/// Compare the phoneme analyses of two subjects
pub fn compare_phonetics(first: &SubjectPhonetics, second: &SubjectPhonetics) -> PhoneticComparison {
    let accuracy_difference = first
        .noise_levels
        .iter()
        .zip(&first.accuracy_by_level)
        .map(|(level, accuracy)| {
            let other = second
                .noise_levels
                .iter()
                .position(|l| l == level)
                .and_then(|i| second.accuracy_by_level.get(i).copied().flatten());
            Some((*accuracy)? - other?)
        })
        .collect();

    let mut per_phoneme: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for confusion in &first.overall.confusions {
        per_phoneme
            .entry(confusion.target_phoneme.as_str())
            .or_default()
            .0 += confusion.count;
    }
    for confusion in &second.overall.confusions {
        per_phoneme
            .entry(confusion.target_phoneme.as_str())
            .or_default()
            .1 += confusion.count;
    }
    let confusion_differences = per_phoneme
        .into_iter()
        .map(|(phoneme, (first_count, second_count))| ConfusionDifference {
            phoneme: phoneme.to_string(),
            first_count,
            second_count,
            difference: first_count as i64 - second_count as i64,
        })
        .collect();

    let category_differences = PhonemeCategory::ALL
        .iter()
        .map(|&category| {
            let first_errors = first.overall.errors_by_category.get(category);
            let second_errors = second.overall.errors_by_category.get(category);
            CategoryDifference {
                category,
                first_errors,
                second_errors,
                difference: first_errors as i64 - second_errors as i64,
            }
        })
        .collect();

    PhoneticComparison {
        first_id: first.subject_id.clone(),
        second_id: second.subject_id.clone(),
        noise_levels: first.noise_levels.clone(),
        accuracy_difference,
        confusion_differences,
        category_differences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestDesign;
    use pretty_assertions::assert_eq;

    fn trial(target: &str, response: &str, level: f64) -> TrialRecord {
        TrialRecord::new(0, target, response, level, 0.0, 800.0)
    }

    fn curve(id: &str, trials: Vec<TrialRecord>) -> SubjectCurve {
        let mut levels: Vec<f64> = trials.iter().map(|t| t.noise_level).collect();
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        SubjectCurve {
            subject_id: id.to_string(),
            design: TestDesign::default(),
            success_rates: vec![0.0; levels.len()],
            mean_durations: vec![800.0; levels.len()],
            trial_counts: vec![1; levels.len()],
            noise_levels: levels,
            valid_trial_count: trials.len(),
            expected_trial_count: trials.len(),
            trials,
        }
    }

    #[test]
    fn test_trial_errors() {
        let errors = trial_errors(&trial("pain", "bain", -4.0));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, EditKind::Substitution);
        assert_eq!(errors[0].target_phoneme.as_deref(), Some("p"));
        assert_eq!(errors[0].response_phoneme.as_deref(), Some("b"));
        assert_eq!(errors[0].position, 0);
        assert_eq!(errors[0].noise_level, -4.0);

        assert!(trial_errors(&trial("chat", "le chat", 0.0)).is_empty());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            PhonemeCategory::of("p"),
            vec![PhonemeCategory::Consonant, PhonemeCategory::Stop]
        );
        assert_eq!(
            PhonemeCategory::of("m"),
            vec![PhonemeCategory::Consonant, PhonemeCategory::Nasal]
        );
        assert_eq!(PhonemeCategory::of("ɛ̃"), vec![PhonemeCategory::Vowel]);
        assert_eq!(PhonemeCategory::of("ʁ"), vec![PhonemeCategory::Consonant]);
        assert!(PhonemeCategory::of("?").is_empty());
    }

    #[test]
    fn test_positions() {
        assert_eq!(WordPosition::classify(0, 3), WordPosition::Start);
        assert_eq!(WordPosition::classify(1, 3), WordPosition::Middle);
        assert_eq!(WordPosition::classify(2, 3), WordPosition::End);
        assert_eq!(WordPosition::classify(0, 0), WordPosition::Middle);
        assert_eq!(WordPosition::classify(1, 0), WordPosition::End);
    }

    #[test]
    fn test_breakdown() {
        let trials = [
            trial("pain", "bain", -4.0),
            trial("train", "rain", -4.0),
            trial("chat", "chat", 0.0),
        ];
        let refs: Vec<&TrialRecord> = trials.iter().collect();
        let result = breakdown(&refs);

        // p ɛ̃ + t ʁ ɛ̃ + ʃ a
        assert_eq!(result.total_phonemes, 7);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.correct_phonemes, 5);
        assert_eq!(result.accuracy, Some(100.0 * 5.0 / 7.0));
        assert_eq!(result.mean_distance, Some(2.0 / 3.0));
        assert_eq!(result.errors_by_category.consonants, 2);
        assert_eq!(result.errors_by_category.stops, 2);
        assert_eq!(result.errors_by_category.vowels, 0);
        assert_eq!(result.errors_by_position.start, 2);

        assert_eq!(result.confusions.len(), 1);
        assert_eq!(result.confusions[0].target_phoneme, "p");
        assert_eq!(result.confusions[0].response_phoneme, "b");
        assert_eq!(result.confusions[0].count, 1);
        assert_eq!(result.confusions[0].mean_noise_level, -4.0);
    }

    #[test]
    fn test_insertions_never_make_accuracy_negative() {
        let trials = [trial("un", "un chat blanc", 0.0)];
        let refs: Vec<&TrialRecord> = trials.iter().collect();
        let result = breakdown(&refs);
        assert_eq!(result.total_phonemes, 1);
        assert_eq!(result.correct_phonemes, 0);
        assert_eq!(result.accuracy, Some(0.0));
    }

    #[test]
    fn test_empty_breakdown() {
        let result = breakdown(&[]);
        assert_eq!(result.total_phonemes, 0);
        assert_eq!(result.accuracy, None);
        assert_eq!(result.mean_distance, None);
    }

    #[test]
    fn test_analyze_subject_by_level() {
        let analysis = analyze_subject(&curve(
            "s",
            vec![
                trial("pain", "bain", -4.0),
                trial("chat", "chat", 0.0),
                trial("loup", "loup", -4.0),
            ],
        ));
        assert_eq!(analysis.noise_levels, vec![-4.0, 0.0]);
        assert_eq!(analysis.accuracy_by_level, vec![Some(75.0), Some(100.0)]);
        assert_eq!(analysis.by_level[0].errors.len(), 1);
        assert_eq!(analysis.overall.total_phonemes, 6);
    }

    #[test]
    fn test_compare_phonetics() {
        let first = analyze_subject(&curve(
            "a",
            vec![trial("pain", "bain", -4.0), trial("pont", "bon", 0.0)],
        ));
        let second = analyze_subject(&curve(
            "b",
            vec![trial("pain", "pain", -4.0), trial("feu", "veux", 2.0)],
        ));
        let comparison = compare_phonetics(&first, &second);

        assert_eq!(comparison.noise_levels, vec![-4.0, 0.0]);
        assert_eq!(comparison.accuracy_difference, vec![Some(-50.0), None]);

        let p = comparison
            .confusion_differences
            .iter()
            .find(|c| c.phoneme == "p")
            .unwrap();
        assert_eq!((p.first_count, p.second_count, p.difference), (2, 0, 2));
        let f = comparison
            .confusion_differences
            .iter()
            .find(|c| c.phoneme == "f")
            .unwrap();
        assert_eq!(f.difference, -1);

        let stops = &comparison.category_differences[3];
        assert_eq!(stops.category, PhonemeCategory::Stop);
        assert_eq!((stops.first_errors, stops.second_errors), (2, 0));
        let fricatives = &comparison.category_differences[4];
        assert_eq!(fricatives.difference, -1);
    }
}
