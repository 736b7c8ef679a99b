//! Job lifecycle.
//!
//! [`QualityService`] is the request-level facade: it registers a job per
//! analysed table, runs the pipeline, keeps the report and table in the
//! [`JobStore`], and serves cleaning, downloads and deletion by job id.

mod store;

pub use store::{Job, JobId, JobStatus, JobStore, JobSummary};

use crate::cleaner::CleaningEngine;
use crate::config::{CleaningConfig, JobStoreConfig};
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::types::{CleaningSummary, Report};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Result of a successful analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub job_id: JobId,
    pub report: Arc<Report>,
}

/// Cheaply cloneable handle over a shared job store and pipeline.
///
/// Every method is a synchronous unit of work; callers on an async runtime
/// should run them on a blocking thread.
#[derive(Clone)]
pub struct QualityService {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
}

static_assertions::assert_impl_all!(QualityService: Send, Sync, Clone);

impl QualityService {
    pub fn new(pipeline: Pipeline, config: JobStoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(JobStore::new(config)),
            pipeline: Arc::new(pipeline),
        })
    }

    /// Service with the default pipeline and retention settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Pipeline::builder().build()?, JobStoreConfig::default())
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Analyse a table under a new job.
    ///
    /// Tables outside the configured bounds are rejected before a job exists.
    pub fn analyze(&self, table: DataFrame) -> Result<AnalysisOutcome> {
        self.run_job(table, None)
    }

    /// Analyse a table and compare it against a reference table.
    pub fn analyze_with_reference(
        &self,
        table: DataFrame,
        reference: &DataFrame,
    ) -> Result<AnalysisOutcome> {
        self.run_job(table, Some(reference))
    }

    fn run_job(&self, table: DataFrame, reference: Option<&DataFrame>) -> Result<AnalysisOutcome> {
        self.pipeline.validate_table(&table)?;

        let job_id = self.store.create(table.clone());
        info!("Job {} registered ({} rows)", job_id, table.height());

        let result = match reference {
            Some(reference) => self.pipeline.analyze_with_reference(&table, reference),
            None => self.pipeline.analyze(&table),
        };

        match result {
            Ok(report) => {
                let report = Arc::new(report);
                self.store.attach_report(&job_id, Arc::clone(&report))?;
                Ok(AnalysisOutcome { job_id, report })
            }
            Err(e) => {
                warn!("Job {} failed: {}", job_id, e);
                // The job may have been deleted meanwhile; the analysis error wins
                let _ = self.store.mark_failed(&job_id, e.to_string());
                Err(e)
            }
        }
    }

    /// Clean the job's source table and retain the result.
    pub fn clean(&self, job_id: &JobId, config: &CleaningConfig) -> Result<CleaningSummary> {
        let (source, report) = self.store.snapshot_for_cleaning(job_id)?;
        let (cleaned, summary) = CleaningEngine::clean(&source, &report, config)?;
        self.store
            .attach_cleaned(job_id, cleaned, config.clone(), summary.clone())?;
        info!(
            "Job {} cleaned: {} -> {} rows",
            job_id, summary.rows_before, summary.rows_after
        );
        Ok(summary)
    }

    pub fn get_cleaned_table(&self, job_id: &JobId) -> Result<DataFrame> {
        self.store.cleaned_table(job_id)
    }

    pub fn get_report(&self, job_id: &JobId) -> Result<Arc<Report>> {
        self.store.report(job_id)
    }

    /// Delete a job. Deleting an unknown id is not an error.
    pub fn delete(&self, job_id: &JobId) {
        if self.store.remove(job_id) {
            info!("Job {} deleted", job_id);
        }
    }

    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.store.list()
    }

    /// Start the background TTL reaper. Requires a tokio runtime.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        self.store.spawn_reaper()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateStrategy;
    use polars::prelude::*;

    fn table() -> DataFrame {
        df!(
            "a" => [Some(1.0), Some(1.0), None, Some(4.0)],
            "b" => ["x", "x", "y", "z"]
        )
        .unwrap()
    }

    #[test]
    fn test_analyze_registers_job() {
        let service = QualityService::with_defaults().unwrap();
        let outcome = service.analyze(table()).unwrap();
        assert_eq!(
            service.store().status(&outcome.job_id).unwrap(),
            JobStatus::Analyzed
        );
        let report = service.get_report(&outcome.job_id).unwrap();
        assert_eq!(report.shape.rows, 4);
    }

    #[test]
    fn test_rejected_table_creates_no_job() {
        let service = QualityService::with_defaults().unwrap();
        let err = service.analyze(DataFrame::empty()).unwrap_err();
        assert!(err.is_input_error());
        assert!(service.list_jobs().is_empty());
    }

    #[test]
    fn test_clean_then_download() {
        let service = QualityService::with_defaults().unwrap();
        let outcome = service.analyze(table()).unwrap();
        assert!(service.get_cleaned_table(&outcome.job_id).is_err());

        let config = CleaningConfig::builder()
            .duplicates(DuplicateStrategy::Remove)
            .build()
            .unwrap();
        let summary = service.clean(&outcome.job_id, &config).unwrap();
        let cleaned = service.get_cleaned_table(&outcome.job_id).unwrap();
        assert_eq!(cleaned.height(), summary.rows_after);
        assert_eq!(
            service.store().status(&outcome.job_id).unwrap(),
            JobStatus::Cleaned
        );
    }

    #[test]
    fn test_clean_conflicts_while_analyzing() {
        let service = QualityService::with_defaults().unwrap();
        let id = service.store().create(table());
        let err = service
            .clean(&id, &CleaningConfig::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let service = QualityService::with_defaults().unwrap();
        let outcome = service.analyze(table()).unwrap();
        service.delete(&outcome.job_id);
        service.delete(&outcome.job_id);
        let err = service
            .clean(&outcome.job_id, &CleaningConfig::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
