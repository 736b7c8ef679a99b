//! CLI entry point for the data quality analyzer.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_quality::reporting::{ReportWriter, file_stem, read_csv, render_cleaning, render_report};
use lex_quality::{
    AnalysisConfig, CleaningConfig, DuplicateStrategy, ImputationStrategy, JobStoreConfig,
    OutlierStrategy, Pipeline, QualityService,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

/// CLI-compatible duplicate strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDuplicateStrategy {
    /// Leave duplicate rows untouched
    Keep,
    /// Add an `_is_duplicate` column
    Flag,
    /// Keep only the first occurrence
    Remove,
    /// Remove when duplication is severe, otherwise flag
    Auto,
}

impl From<CliDuplicateStrategy> for DuplicateStrategy {
    fn from(cli: CliDuplicateStrategy) -> Self {
        match cli {
            CliDuplicateStrategy::Keep => DuplicateStrategy::Keep,
            CliDuplicateStrategy::Flag => DuplicateStrategy::Flag,
            CliDuplicateStrategy::Remove => DuplicateStrategy::Remove,
            CliDuplicateStrategy::Auto => DuplicateStrategy::Auto,
        }
    }
}

/// CLI-compatible imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliImputation {
    /// Median of the non-missing values
    Median,
    /// Mean of the non-missing values
    Mean,
    /// Most frequent value
    Mode,
    /// Constant zero
    Zero,
}

impl From<CliImputation> for ImputationStrategy {
    fn from(cli: CliImputation) -> Self {
        match cli {
            CliImputation::Median => ImputationStrategy::Median,
            CliImputation::Mean => ImputationStrategy::Mean,
            CliImputation::Mode => ImputationStrategy::Mode,
            CliImputation::Zero => ImputationStrategy::Zero,
        }
    }
}

/// CLI-compatible outlier strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierStrategy {
    /// Clamp values to the IQR bounds
    Clip,
    /// Add a `<column>_is_outlier` column
    Flag,
    /// Remove rows holding outliers
    Remove,
}

impl From<CliOutlierStrategy> for OutlierStrategy {
    fn from(cli: CliOutlierStrategy) -> Self {
        match cli {
            CliOutlierStrategy::Clip => OutlierStrategy::Clip,
            CliOutlierStrategy::Flag => OutlierStrategy::Flag,
            CliOutlierStrategy::Remove => OutlierStrategy::Remove,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Data quality analysis and cleaning",
    long_about = "Profiles a CSV file, reports data quality issues with a 0-100 score, \
                  and optionally writes a cleaned copy.\n\n\
                  EXAMPLES:\n  \
                  # Analyse only\n  \
                  lex-quality -i data.csv\n\n  \
                  # Analyse and clean, removing duplicates and clipping outliers\n  \
                  lex-quality -i data.csv --clean --duplicates remove --outliers clip\n\n  \
                  # Compare against last month's extract\n  \
                  lex-quality -i data.csv --reference last_month.csv\n\n  \
                  # Machine-readable output\n  \
                  lex-quality -i data.csv --json | jq .report.quality_score"
)]
struct Args {
    /// Path to the CSV file to analyse
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for reports and cleaned data
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// JSON file with analysis thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference CSV file for drift detection
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Clean the dataset after analysis and write `<name>_cleaned.csv`
    #[arg(long)]
    clean: bool,

    /// Strategy for duplicate rows
    #[arg(long, value_enum, default_value = "auto")]
    duplicates: CliDuplicateStrategy,

    /// Default imputation for numeric columns
    #[arg(long, value_enum, default_value = "median")]
    imputation: CliImputation,

    /// Per-column imputation override, e.g. `--impute-column city=mode`
    #[arg(long = "impute-column", value_name = "COLUMN=STRATEGY")]
    impute_columns: Vec<String>,

    /// Strategy for IQR outliers
    #[arg(long, value_enum, default_value = "clip")]
    outliers: CliOutlierStrategy,

    /// Trim and collapse whitespace in text columns before cleaning
    #[arg(long)]
    normalize_text: bool,

    /// Drop columns holding a single value
    #[arg(long)]
    drop_constant: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Print the report as JSON to stdout instead of a summary
    ///
    /// Disables all logs so stdout only holds JSON.
    #[arg(long)]
    json: bool,

    /// Write the JSON report (and cleaning summary) to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let analysis_config = load_analysis_config(&args)?;
    let cleaning_config = build_cleaning_config(&args)?;

    let pipeline = Pipeline::builder()
        .config(analysis_config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;
    let service = QualityService::new(pipeline, JobStoreConfig::default())?;

    info!("Loading dataset from: {}", args.input.display());
    let data = read_csv(&args.input)?;
    info!("Dataset loaded: {:?}", data.shape());

    let outcome = match &args.reference {
        Some(path) => {
            info!("Loading reference dataset from: {}", path.display());
            let reference = read_csv(path)?;
            service.analyze_with_reference(data, &reference)?
        }
        None => service.analyze(data)?,
    };

    let stem = file_stem(&args.input);
    let writer = ReportWriter::new(&args.output);

    let cleaning = match &cleaning_config {
        Some(config) => {
            let summary = service.clean(&outcome.job_id, config)?;
            let mut cleaned = service.get_cleaned_table(&outcome.job_id)?;
            writer.write_table(&mut cleaned, &stem)?;
            Some(summary)
        }
        None => None,
    };

    if args.emit_report {
        writer.write_json(outcome.report.as_ref(), &stem, "_report")?;
        if let Some(summary) = &cleaning {
            writer.write_json(summary, &stem, "_cleaning")?;
        }
    }

    if args.json {
        let output = json!({
            "job_id": outcome.job_id,
            "report": outcome.report,
            "cleaning": cleaning,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print!("{}", render_report(&outcome.report));
    if let Some(summary) = &cleaning {
        print!("{}", render_cleaning(summary));
    }
    println!("{}", "=".repeat(80));
    Ok(())
}

fn load_analysis_config(args: &Args) -> Result<AnalysisConfig> {
    match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Ok(AnalysisConfig::from_json(&content)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn build_cleaning_config(args: &Args) -> Result<Option<CleaningConfig>> {
    if !args.clean {
        return Ok(None);
    }

    let mut builder = CleaningConfig::builder()
        .duplicates(args.duplicates.into())
        .imputation(args.imputation.into())
        .outliers(args.outliers.into())
        .normalize_text(args.normalize_text)
        .drop_constant_columns(args.drop_constant);

    for entry in &args.impute_columns {
        let (column, strategy) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected COLUMN=STRATEGY, got '{}'", entry))?;
        builder = builder.column_imputation(column.trim(), strategy.parse()?);
    }

    Ok(Some(builder.build()?))
}
