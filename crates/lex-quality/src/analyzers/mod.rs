//! Data-quality analyzers.
//!
//! Each analyzer is a pure function over the same immutable table and its
//! column profiles. Analyzers never see each other's output, so the
//! pipeline can run them concurrently and join before scoring.
//!
//! # Implementing an analyzer
//!
//! ```rust,ignore
//! use lex_quality::analyzers::{AnalysisContext, Analyzer};
//! use lex_quality::types::{AnalyzerKind, Finding};
//!
//! struct MyAnalyzer;
//!
//! impl Analyzer for MyAnalyzer {
//!     fn kind(&self) -> AnalyzerKind { AnalyzerKind::Outliers }
//!     fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<Vec<Finding>> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

mod correlation;
mod drift;
mod duplicates;
mod inconsistency;
mod isolation_forest;
mod missing;
mod outliers;

pub use correlation::CorrelationAnalyzer;
pub use drift::DriftAnalyzer;
pub use duplicates::DuplicateAnalyzer;
pub use inconsistency::InconsistencyAnalyzer;
pub use missing::MissingValueAnalyzer;
pub use outliers::OutlierAnalyzer;

pub(crate) use duplicates::{first_occurrence_mask, row_signatures};

use crate::config::AnalysisConfig;
use crate::types::{AnalyzerKind, ColumnProfile, Finding};
use anyhow::{Context, Result};
use polars::prelude::*;

/// Read-only inputs shared by every analyzer in one pipeline run.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub df: &'a DataFrame,
    pub profiles: &'a [ColumnProfile],
    pub config: &'a AnalysisConfig,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(df: &'a DataFrame, profiles: &'a [ColumnProfile], config: &'a AnalysisConfig) -> Self {
        Self {
            df,
            profiles,
            config,
        }
    }

    pub fn rows(&self) -> usize {
        self.df.height()
    }

    pub fn series(&self, name: &str) -> Result<&'a Series> {
        let column = self
            .df
            .column(name)
            .with_context(|| format!("column '{name}' missing from table"))?;
        Ok(column.as_materialized_series())
    }
}

/// A single, independent quality check.
pub trait Analyzer: Send + Sync {
    /// Which analyzer the findings are attributed to.
    fn kind(&self) -> AnalyzerKind;

    /// Inspect the table and emit findings. Must not depend on other analyzers.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>>;
}

/// The standard analyzer set, in report order.
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(MissingValueAnalyzer),
        Box::new(DuplicateAnalyzer),
        Box::new(OutlierAnalyzer),
        Box::new(InconsistencyAnalyzer),
        Box::new(CorrelationAnalyzer),
    ]
}
