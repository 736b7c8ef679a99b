//! In-memory job store with time-to-live eviction.
//!
//! The index maps job ids to entries behind a `parking_lot::RwLock`; each
//! entry carries its own lock so jobs never contend with each other. Access
//! times are atomics so readers refresh them without taking a write lock.

use crate::config::{CleaningConfig, JobStoreConfig};
use crate::error::{QualityError, Result};
use crate::types::{CleaningSummary, Report};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque job identifier (a uuid v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Registered; the report is not attached yet
    Analyzing,
    Analyzed,
    Cleaned,
    Failed,
}

/// One analysis job and everything derived from its table.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    /// Never mutated after creation
    pub source: DataFrame,
    pub report: Option<Arc<Report>>,
    pub cleaned: Option<DataFrame>,
    pub cleaning_config: Option<CleaningConfig>,
    pub cleaning_summary: Option<CleaningSummary>,
    pub status: JobStatus,
    pub error: Option<String>,
}

/// Listing view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
}

struct JobEntry {
    job: RwLock<Job>,
    last_accessed_ms: AtomicI64,
}

impl JobEntry {
    fn touch(&self) {
        self.last_accessed_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// Keyed store owning the lifetime of every job.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    config: JobStoreConfig,
}

static_assertions::assert_impl_all!(JobStore: Send, Sync);

impl JobStore {
    pub fn new(config: JobStoreConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &JobStoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Clone an entry out of the index and refresh its access time.
    fn entry(&self, id: &JobId) -> Result<Arc<JobEntry>> {
        let entry = self
            .jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| QualityError::JobNotFound(id.to_string()))?;
        entry.touch();
        Ok(entry)
    }

    /// Mutate a job while holding the index read lock, so a concurrent
    /// delete either happens first (NotFound) or waits for the write.
    fn update<T>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> Result<T>) -> Result<T> {
        let jobs = self.jobs.read();
        let entry = jobs
            .get(id)
            .ok_or_else(|| QualityError::JobNotFound(id.to_string()))?;
        entry.touch();
        let mut job = entry.job.write();
        f(&mut job)
    }

    /// Register a new job in `analyzing` state.
    pub fn create(&self, source: DataFrame) -> JobId {
        let id = JobId::new();
        let entry = JobEntry {
            job: RwLock::new(Job {
                id: id.clone(),
                created_at: Utc::now(),
                source,
                report: None,
                cleaned: None,
                cleaning_config: None,
                cleaning_summary: None,
                status: JobStatus::Analyzing,
                error: None,
            }),
            last_accessed_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        };
        self.jobs.write().insert(id.clone(), Arc::new(entry));
        debug!("Created job {}", id);
        id
    }

    pub fn attach_report(&self, id: &JobId, report: Arc<Report>) -> Result<()> {
        self.update(id, |job| {
            job.report = Some(report);
            job.status = JobStatus::Analyzed;
            Ok(())
        })
    }

    pub fn mark_failed(&self, id: &JobId, message: impl Into<String>) -> Result<()> {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(message.into());
            Ok(())
        })
    }

    /// Source table and report of an analysed job.
    ///
    /// Conflict while the analysis is running or after it failed.
    pub fn snapshot_for_cleaning(&self, id: &JobId) -> Result<(DataFrame, Arc<Report>)> {
        let entry = self.entry(id)?;
        let job = entry.job.read();
        match (&job.report, job.status) {
            (Some(report), JobStatus::Analyzed | JobStatus::Cleaned) => {
                Ok((job.source.clone(), Arc::clone(report)))
            }
            (_, JobStatus::Failed) => Err(QualityError::conflict(
                id,
                format!(
                    "analysis failed: {}",
                    job.error.as_deref().unwrap_or("unknown error")
                ),
            )),
            _ => Err(QualityError::conflict(id, "analysis has not finished")),
        }
    }

    pub fn attach_cleaned(
        &self,
        id: &JobId,
        cleaned: DataFrame,
        config: CleaningConfig,
        summary: CleaningSummary,
    ) -> Result<()> {
        self.update(id, |job| {
            job.cleaned = Some(cleaned);
            job.cleaning_config = Some(config);
            job.cleaning_summary = Some(summary);
            job.status = JobStatus::Cleaned;
            Ok(())
        })
    }

    /// The latest cleaned table of a job.
    pub fn cleaned_table(&self, id: &JobId) -> Result<DataFrame> {
        let entry = self.entry(id)?;
        let job = entry.job.read();
        job.cleaned
            .clone()
            .ok_or_else(|| QualityError::NoCleanedTable(id.to_string()))
    }

    pub fn report(&self, id: &JobId) -> Result<Arc<Report>> {
        let entry = self.entry(id)?;
        let job = entry.job.read();
        match (&job.report, job.status) {
            (Some(report), _) => Ok(Arc::clone(report)),
            (None, JobStatus::Failed) => Err(QualityError::conflict(id, "analysis failed")),
            (None, _) => Err(QualityError::conflict(id, "analysis has not finished")),
        }
    }

    pub fn status(&self, id: &JobId) -> Result<JobStatus> {
        Ok(self.entry(id)?.job.read().status)
    }

    /// Remove a job. Returns whether it existed.
    pub fn remove(&self, id: &JobId) -> bool {
        let removed = self.jobs.write().remove(id).is_some();
        if removed {
            debug!("Removed job {}", id);
        }
        removed
    }

    /// All jobs ordered by creation time.
    pub fn list(&self) -> Vec<JobSummary> {
        let entries: Vec<Arc<JobEntry>> = self.jobs.read().values().cloned().collect();
        let mut summaries: Vec<JobSummary> = entries
            .iter()
            .map(|entry| {
                let job = entry.job.read();
                JobSummary {
                    job_id: job.id.clone(),
                    created_at: job.created_at,
                    status: job.status,
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        summaries
    }

    /// Evict every job not accessed within the TTL.
    pub fn reap_expired(&self) -> usize {
        self.reap_expired_at(Utc::now().timestamp_millis())
    }

    /// Evict every job whose last access is at least one TTL before `now_ms`.
    pub fn reap_expired_at(&self, now_ms: i64) -> usize {
        let ttl_ms = i64::try_from(self.config.ttl().as_millis()).unwrap_or(i64::MAX);
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, entry| {
            now_ms.saturating_sub(entry.last_accessed_ms.load(Ordering::Relaxed)) < ttl_ms
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            info!("Evicted {} expired jobs", evicted);
        }
        evicted
    }

    /// Start a background task that reaps expired jobs every
    /// `reap_interval_secs`.
    ///
    /// The task holds a weak reference and exits once the store is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = self.config.reap_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Job store dropped, stopping reaper");
                    break;
                };
                store.reap_expired();
            }
        })
    }
}
