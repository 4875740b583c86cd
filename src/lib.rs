//! RSB Score - Scoring engine for speech-in-noise word recognition tests
//!
//! Subjects hear words at a sequence of signal-to-noise ratios (RSB, in dB)
//! and their transcribed responses are scored into performance curves through
//! a deterministic pipeline: trial validation → subject aggregation → grid
//! resampling → cohort aggregation.
//!
//! ## Modules
//!
//! - **Scoring Pipeline**: Turn raw trial payloads into validated subject curves
//! - **Cohort Analysis**: Combine curves into per-level statistics
//! - **Phonetics**: Phoneme-level error analysis of scored trials
//! - **Adapters**: Read subject rows from the store or from uploaded files

pub mod adapters;
pub mod aggregator;
pub mod cohort;
pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod overview;
pub mod phonetics;
pub mod pipeline;
pub mod resample;
pub mod schema;
pub mod source;
pub mod types;
pub mod validator;

pub use config::ScoringConfig;
pub use error::ScoreError;
pub use pipeline::{analyze, score_subject, RsbProcessor};
pub use resample::Grid;
pub use source::{InMemorySource, SubjectSource};

// Schema exports
pub use schema::RawTrialPayload;

/// Version embedded in all reports
pub const RSB_SCORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "rsb-score";
