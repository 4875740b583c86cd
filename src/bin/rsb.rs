//! RSB CLI - Command-line interface for RSB Score
//!
//! Commands:
//! - analyze: Score subjects and aggregate cohort statistics
//! - score: Score a single trial payload
//! - compare: Compare threshold metrics of two subjects
//! - words: Per-word recognition statistics
//! - phonetics: Phoneme error analysis of one subject, or two compared
//! - overview: Population overview

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rsb_score::adapters::{StoreAdapter, SubjectPayloadAdapter, UploadAdapter};
use rsb_score::export::{cohort_to_csv, ReportEncoder};
use rsb_score::types::Rejection;
use rsb_score::{
    Grid, InMemorySource, RawTrialPayload, RsbProcessor, ScoreError, ScoringConfig,
    PRODUCER_NAME, RSB_SCORE_VERSION,
};

/// RSB - Scoring engine for speech-in-noise word recognition tests
#[derive(Parser)]
#[command(name = "rsb")]
#[command(version = RSB_SCORE_VERSION)]
#[command(about = "Score speech-in-noise tests and aggregate cohort curves", long_about = None)]
struct Cli {
    /// Scoring configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Comparison grid override, e.g. "-14,-10,-6,-2,2,6"
    #[arg(long, global = true, value_delimiter = ',', allow_hyphen_values = true)]
    grid: Option<Vec<f64>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score subjects and aggregate cohort statistics
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Subject ids or names to analyze alongside the full cohort
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<String>>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Score a single trial payload
    Score {
        /// Payload file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Subject id reported in the output
        #[arg(long, default_value = "subject")]
        id: String,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Compare threshold metrics of two subjects
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// First subject id or name
        first: String,

        /// Second subject id or name
        second: String,
    },

    /// Per-word recognition statistics over accepted subjects
    Words {
        #[command(flatten)]
        input: InputArgs,

        /// List only misrecognized words, most errors first
        #[arg(long)]
        errors: bool,
    },

    /// Phoneme error analysis of a subject
    Phonetics {
        #[command(flatten)]
        input: InputArgs,

        /// Subject id or name
        subject: String,

        /// Second subject to compare against
        other: Option<String>,
    },

    /// Population overview
    Overview {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input file path, repeatable (use - for stdin)
    #[arg(short, long, required = true)]
    input: Vec<PathBuf>,

    /// Where the input rows come from
    #[arg(long, default_value = "store")]
    origin: Origin,
}

#[derive(Clone, Copy, ValueEnum)]
enum Origin {
    /// Subject store rows (JSON array of rows)
    Store,
    /// Uploaded session files, one subject per file
    Upload,
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Cohort statistics as CSV
    Csv,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rsb_score=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), RsbCliError> {
    let processor = build_processor(cli.config.as_deref(), cli.grid)?;

    match cli.command {
        Commands::Analyze { input, ids, format } => cmd_analyze(&processor, &input, ids, format),
        Commands::Score { input, id, format } => cmd_score(&processor, &input, &id, format),
        Commands::Compare {
            input,
            first,
            second,
        } => {
            let source = load_source(&input)?;
            let comparison = processor.compare(&source, &first, &second)?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
            Ok(())
        }
        Commands::Words { input, errors } => {
            let source = load_source(&input)?;
            let output = if errors {
                serde_json::to_string_pretty(&processor.word_errors(&source))?
            } else {
                serde_json::to_string_pretty(&processor.word_stats(&source))?
            };
            println!("{output}");
            Ok(())
        }
        Commands::Phonetics {
            input,
            subject,
            other,
        } => {
            let source = load_source(&input)?;
            let output = match other {
                Some(other) => serde_json::to_string_pretty(
                    &processor.compare_phonetics(&source, &subject, &other)?,
                )?,
                None => serde_json::to_string_pretty(&processor.phonetics(&source, &subject)?)?,
            };
            println!("{output}");
            Ok(())
        }
        Commands::Overview { input } => {
            let source = load_source(&input)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&processor.overview(&source))?
            );
            Ok(())
        }
    }
}

fn build_processor(
    config: Option<&Path>,
    grid: Option<Vec<f64>>,
) -> Result<RsbProcessor, RsbCliError> {
    let mut config = match config {
        Some(path) => ScoringConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };
    if let Some(points) = grid {
        config.grid = Grid::new(points)?;
    }
    Ok(RsbProcessor::with_config(config))
}

fn cmd_analyze(
    processor: &RsbProcessor,
    input: &InputArgs,
    ids: Option<Vec<String>>,
    format: OutputFormat,
) -> Result<(), RsbCliError> {
    let source = load_source(input)?;
    let encoder = ReportEncoder::new();

    let report = match ids {
        Some(ids) => encoder.encode_selection(&processor.analyze_selection(&source, &ids)?),
        None => encoder.encode(&processor.analyze(&source, None)?),
    };

    let output = match format {
        OutputFormat::Csv => {
            let stats = report
                .selection
                .as_ref()
                .map_or(&report.statistics, |s| &s.statistics);
            cohort_to_csv(stats)?
        }
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };
    println!("{output}");
    Ok(())
}

fn cmd_score(
    processor: &RsbProcessor,
    input: &Path,
    id: &str,
    format: OutputFormat,
) -> Result<(), RsbCliError> {
    if format == OutputFormat::Csv {
        return Err(RsbCliError::Usage(
            "csv output is only available for analyze".to_string(),
        ));
    }
    let payload = RawTrialPayload::from_json_str(&read_input(input)?)?;
    let curve = processor
        .score_payload(id, &payload)
        .map_err(RsbCliError::Rejected)?;

    let output = match format {
        OutputFormat::Json => serde_json::to_string(&curve)?,
        _ => serde_json::to_string_pretty(&curve)?,
    };
    println!("{output}");
    Ok(())
}

fn load_source(input: &InputArgs) -> Result<InMemorySource, RsbCliError> {
    let mut source = InMemorySource::default();
    for path in &input.input {
        let raw_json = read_input(path)?;
        let records = match input.origin {
            Origin::Store => StoreAdapter.parse(&raw_json)?,
            Origin::Upload => UploadAdapter::new(subject_name(path)).parse(&raw_json)?,
        };
        source.extend(records);
    }
    tracing::debug!(subjects = source.len(), "loaded subject records");
    Ok(source)
}

fn subject_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string())
}

fn read_input(path: &Path) -> Result<String, RsbCliError> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

// Error handling

#[derive(Debug, thiserror::Error)]
enum RsbCliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{}: {}", .0.subject_id, .0.reason)]
    Rejected(Rejection),
    #[error("{0}")]
    Usage(String),
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
    producer: String,
}

impl From<RsbCliError> for CliError {
    fn from(e: RsbCliError) -> Self {
        let message = e.to_string();
        let (code, hint) = match &e {
            RsbCliError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            RsbCliError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
            RsbCliError::Score(ScoreError::NoValidData(_)) => (
                "NO_VALID_DATA",
                Some("No subject passed the completeness gate"),
            ),
            RsbCliError::Score(ScoreError::UnknownSubject(_)) => {
                ("UNKNOWN_SUBJECT", Some("Subjects match by id or by name"))
            }
            RsbCliError::Score(ScoreError::InvalidGrid(_) | ScoreError::InvalidDesign(_)) => {
                ("CONFIG_ERROR", Some("Check the configuration file and --grid"))
            }
            RsbCliError::Score(_) => ("PARSE_ERROR", Some("Check input format and --origin")),
            RsbCliError::Rejected(_) => ("SUBJECT_REJECTED", None),
            RsbCliError::Usage(_) => ("USAGE_ERROR", None),
        };
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
            producer: PRODUCER_NAME.to_string(),
        }
    }
}
