//! Phonetic error analysis
//!
//! Finer than word scoring: each target and response is transcribed into
//! French phonemes and aligned, so a response can be partly right.
//!
//! Pipeline: TrialRecord → transcription → alignment → per-subject breakdown

pub mod alignment;
pub mod analysis;
pub mod transcription;

pub use alignment::{align, AlignedPhoneme, EditKind};
pub use analysis::{
    analyze_subject, breakdown, compare_phonetics, trial_errors, CategoryCounts,
    CategoryDifference, Confusion, ConfusionDifference, PhonemeBreakdown, PhonemeCategory,
    PhonemeError, PhoneticComparison, PositionCounts, SubjectPhonetics, WordPosition,
};
pub use transcription::{
    normalize_word, phoneme_info, phonetic_distance, transcribe, PhonemeClass, PhonemeInfo,
    PhonemeKind, FRENCH_PHONEMES,
};
