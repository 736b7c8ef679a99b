//! Main analysis pipeline.
//!
//! This module provides the core `Pipeline` struct and its builder. A run
//! validates the table, profiles every column, fans the analyzers out over
//! rayon, joins their findings in a fixed order and scores the result.

use crate::analyzers::{AnalysisContext, Analyzer, DriftAnalyzer, default_analyzers};
use crate::config::{AnalysisConfig, ConfigValidationError};
use crate::error::{QualityError, Result};
use crate::pipeline::progress::{
    AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::quality::QualityScorer;
use crate::types::{AnalyzerFindings, AnalyzerKind, Finding, Report, TableShape};
use polars::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

/// The data-quality analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::{AnalysisConfig, Pipeline};
///
/// let report = Pipeline::builder()
///     .config(AnalysisConfig::builder().iqr_multiplier(3.0).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .analyze(&dataframe)?;
///
/// println!("Quality score: {}", report.quality_score.overall);
/// ```
pub struct Pipeline {
    config: AnalysisConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Shared by every job of a service and driven from rayon workers
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Reject tables the pipeline will not analyse.
    ///
    /// A table without columns, or beyond the configured row or column
    /// bounds, is an input error.
    pub fn validate_table(&self, df: &DataFrame) -> Result<()> {
        if df.width() == 0 {
            return Err(QualityError::InvalidInput("table has no columns".to_string()));
        }
        if df.height() > self.config.max_rows {
            return Err(QualityError::InvalidInput(format!(
                "table has {} rows, limit is {}",
                df.height(),
                self.config.max_rows
            )));
        }
        if df.width() > self.config.max_columns {
            return Err(QualityError::InvalidInput(format!(
                "table has {} columns, limit is {}",
                df.width(),
                self.config.max_columns
            )));
        }
        Ok(())
    }

    /// Analyse a table and produce its quality report.
    pub fn analyze(&self, df: &DataFrame) -> Result<Report> {
        self.run(df, None)
    }

    /// Analyse a table and compare its distributions against `reference`.
    pub fn analyze_with_reference(&self, df: &DataFrame, reference: &DataFrame) -> Result<Report> {
        self.run(df, Some(reference))
    }

    fn run(&self, df: &DataFrame, reference: Option<&DataFrame>) -> Result<Report> {
        match self.run_internal(df, reference) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Analysis complete, quality score {}",
                    report.quality_score.overall
                )));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Analysis error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: &DataFrame, reference: Option<&DataFrame>) -> Result<Report> {
        let start_time = Instant::now();

        // Step 1: Bounds
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Validating,
            0.0,
            "Validating input table...",
        ));
        self.validate_table(df)?;
        if let Some(reference) = reference {
            self.validate_table(reference)
                .map_err(|e| e.with_context("reference table"))?;
        }
        let shape = TableShape {
            rows: df.height(),
            columns: df.width(),
        };
        info!("Analyzing table: {} rows x {} columns", shape.rows, shape.columns);

        // Step 2: Profiling
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Profiling,
            0.0,
            format!("Profiling {} columns...", shape.columns),
        ));
        let profile = DataProfiler::profile_table(df, &self.config)
            .map_err(|e| QualityError::AnalysisFailed(format!("profiling: {e:#}")))?;
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Profiling,
            1.0,
            "Profiling complete",
        ));

        // Step 3: Analyzer fan-out, joined before scoring
        let findings = self.run_analyzers(df, &profile.columns, profile.findings)?;

        // Step 4: Optional drift against a reference table
        let drift = match reference {
            Some(reference) => {
                self.report_progress(ProgressUpdate::new(
                    AnalysisStage::DriftDetection,
                    0.0,
                    "Comparing against reference table...",
                ));
                let report = DriftAnalyzer::compare(reference, df, &profile.columns, &self.config)
                    .map_err(|e| QualityError::AnalysisFailed(format!("drift: {e:#}")))?;
                info!(
                    "Drift detected in {} of {} compared columns",
                    report.drifted_columns.len(),
                    report.columns.len()
                );
                Some(report)
            }
            None => None,
        };

        // Step 5: Score from findings alone
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Scoring,
            0.0,
            "Computing quality score...",
        ));
        let all: Vec<Finding> = findings
            .iter()
            .flat_map(|group| group.findings.iter().cloned())
            .collect();
        let quality_score = QualityScorer::score(shape, &all, &self.config.score_weights)?;

        info!(
            "Analysis finished in {:.2}s: {} findings, score {} ({:?})",
            start_time.elapsed().as_secs_f64(),
            all.len(),
            quality_score.overall,
            quality_score.grade
        );

        Ok(Report {
            shape,
            memory_bytes: df.estimated_size(),
            columns: profile.columns,
            findings,
            quality_score,
            warnings: profile.warnings,
            drift,
        })
    }

    fn run_analyzers(
        &self,
        df: &DataFrame,
        profiles: &[crate::types::ColumnProfile],
        type_findings: Vec<Finding>,
    ) -> Result<Vec<AnalyzerFindings>> {
        let ctx = AnalysisContext::new(df, profiles, &self.config);
        let total = self.analyzers.len();
        let completed = AtomicUsize::new(0);

        let results: Vec<(AnalyzerKind, anyhow::Result<Vec<Finding>>)> = self
            .analyzers
            .par_iter()
            .map(|analyzer| {
                let kind = analyzer.kind();
                let started = Instant::now();
                let result = analyzer.analyze(&ctx);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("Analyzer {} finished in {:?}", kind, started.elapsed());
                self.report_progress(ProgressUpdate::with_items(
                    AnalysisStage::Analyzing,
                    kind.as_str(),
                    done,
                    total,
                    format!("Finished {kind} ({done}/{total})"),
                ));
                (kind, result)
            })
            .collect();

        let mut groups = vec![AnalyzerFindings {
            analyzer: AnalyzerKind::TypeInference,
            findings: type_findings,
        }];
        for (kind, result) in results {
            let findings =
                result.map_err(|e| QualityError::AnalysisFailed(format!("{kind}: {e:#}")))?;
            match groups.iter_mut().find(|group| group.analyzer == kind) {
                Some(group) => group.findings.extend(findings),
                None => groups.push(AnalyzerFindings {
                    analyzer: kind,
                    findings,
                }),
            }
        }
        groups.sort_by_key(|group| group.analyzer);
        Ok(groups)
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<AnalysisConfig>,
    analyzers: Option<Vec<Box<dyn Analyzer>>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    /// Set the analysis configuration.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the standard analyzer set.
    ///
    /// Scoring needs the missing-value, duplicate and inconsistency
    /// summaries; a set without those analyzers fails at scoring time.
    pub fn analyzers(mut self, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Analyzer updates arrive from rayon worker threads in completion order.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            analyzers: self.analyzers.unwrap_or_else(default_analyzers),
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn sample_df() -> DataFrame {
        df!(
            "id" => [1i64, 2, 3, 4, 5, 6],
            "amount" => [Some(10.0), Some(12.5), None, Some(11.0), Some(10.0), Some(13.0)],
            "city" => ["Paris", "paris", "Rome", "Rome", "Oslo", "Oslo"]
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.analyzers.len(), 5);
        assert_eq!(pipeline.config().iqr_multiplier, 1.5);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = AnalysisConfig {
            iqr_multiplier: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_validate_table_bounds() {
        let pipeline = Pipeline::builder()
            .config(AnalysisConfig::builder().max_rows(3).build().unwrap())
            .build()
            .unwrap();
        let err = pipeline.validate_table(&sample_df()).unwrap_err();
        assert!(err.is_input_error());
        let err = pipeline.validate_table(&DataFrame::empty()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_findings_grouped_in_analyzer_order() {
        let report = Pipeline::builder().build().unwrap().analyze(&sample_df()).unwrap();
        let order: Vec<AnalyzerKind> = report.findings.iter().map(|g| g.analyzer).collect();
        assert_eq!(
            order,
            vec![
                AnalyzerKind::TypeInference,
                AnalyzerKind::MissingValues,
                AnalyzerKind::Duplicates,
                AnalyzerKind::Outliers,
                AnalyzerKind::Inconsistencies,
                AnalyzerKind::Correlations,
            ]
        );
        assert_eq!(report.shape.rows, 6);
        assert!(report.drift.is_none());
        assert_eq!(report.memory_bytes, sample_df().estimated_size());
    }

    #[test]
    fn test_progress_reaches_completion() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        Pipeline::builder()
            .on_progress(move |update| sink.lock().push(update.stage))
            .build()
            .unwrap()
            .analyze(&sample_df())
            .unwrap();
        let stages = stages.lock();
        assert_eq!(stages.first(), Some(&AnalysisStage::Validating));
        assert_eq!(stages.last(), Some(&AnalysisStage::Complete));
        assert_eq!(
            stages.iter().filter(|s| **s == AnalysisStage::Analyzing).count(),
            5
        );
    }

    #[test]
    fn test_missing_summary_analyzer_fails_scoring() {
        let pipeline = Pipeline::builder().analyzers(Vec::new()).build().unwrap();
        let err = pipeline.analyze(&sample_df()).unwrap_err();
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
    }
}
