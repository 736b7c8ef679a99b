//! Data Quality Analysis Library
//!
//! Profiles a tabular dataset, detects quality problems, scores the result
//! and applies configurable cleaning, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Profiling**: semantic type inference, column statistics, identifier and
//!   constant-column detection
//! - **Analyzers**: missing values, duplicates, outliers (IQR, z-score and an
//!   isolation forest), text inconsistencies, numeric correlation and
//!   categorical association, run in parallel
//! - **Scoring**: completeness, uniqueness, consistency and validity
//!   sub-scores with a graded overall score
//! - **Cleaning**: duplicate, imputation and outlier strategies driven by the
//!   analysis report
//! - **Drift**: optional comparison against a reference table
//! - **Jobs**: an in-memory job store with TTL eviction behind
//!   [`QualityService`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_quality::{CleaningConfig, DuplicateStrategy, QualityService};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let service = QualityService::with_defaults()?;
//! let outcome = service.analyze(df)?;
//! println!("Quality score: {}", outcome.report.quality_score.overall);
//!
//! let config = CleaningConfig::builder()
//!     .duplicates(DuplicateStrategy::Remove)
//!     .build()?;
//! let summary = service.clean(&outcome.job_id, &config)?;
//! let cleaned = service.get_cleaned_table(&outcome.job_id)?;
//! ```
//!
//! # Pipeline Only
//!
//! The pipeline can be used without the job store:
//!
//! ```rust,ignore
//! use lex_quality::{AnalysisConfig, Pipeline};
//!
//! let config = AnalysisConfig::builder()
//!     .iqr_multiplier(3.0)
//!     .duplicate_thresholds(0.02, 0.10)
//!     .build()?;
//!
//! let report = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .analyze(&df)?;
//! ```

pub mod analyzers;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analyzers::{Analyzer, AnalysisContext, DriftAnalyzer};
pub use cleaner::CleaningEngine;
pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, CleaningConfig, CleaningConfigBuilder,
    ConfigValidationError, DuplicateStrategy, ImputationStrategy, JobStoreConfig,
    OutlierStrategy, ScoreWeights,
};
pub use error::{QualityError, Result as QualityResult, ResultExt};
pub use jobs::{AnalysisOutcome, JobId, JobStatus, JobStore, JobSummary, QualityService};
pub use pipeline::{
    AnalysisStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use profiler::{DataProfiler, TableProfile};
pub use quality::QualityScorer;
pub use types::{
    AnalyzerFindings, AnalyzerKind, CleaningSummary, ColumnProfile, DriftReport, Finding,
    FindingPayload, Grade, InferredType, QualityScore, Report, Severity, TableShape,
};
