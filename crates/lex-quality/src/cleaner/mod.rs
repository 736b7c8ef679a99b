//! Cleaning engine.
//!
//! Applies the remediation strategies of a [`CleaningConfig`] to a table,
//! guided by the report produced when the same table was analysed:
//! - Constant-column removal and whitespace normalization (opt-in)
//! - Duplicate handling (keep, flag, remove, or auto from the report severity)
//! - Missing-value imputation on the de-duplicated table
//! - Outlier treatment against the analysis-time IQR bounds

mod duplicates;
mod imputation;
mod outliers;
mod sanitizers;

use crate::config::CleaningConfig;
use crate::error::{QualityError, Result, ResultExt};
use crate::types::{CleaningSummary, Report};
use polars::prelude::*;
use tracing::{info, warn};

/// Marker column added by the `flag` duplicate strategy.
pub const DUPLICATE_FLAG_COLUMN: &str = "_is_duplicate";

/// Suffix of the marker columns added by the `flag` outlier strategy.
pub const OUTLIER_FLAG_SUFFIX: &str = "_is_outlier";

/// Applies cleaning strategies to an analysed table.
pub struct CleaningEngine;

impl CleaningEngine {
    /// Check that every per-column override names a known column and fits
    /// its inferred type.
    pub fn validate(report: &Report, config: &CleaningConfig) -> Result<()> {
        config.validate()?;
        for (column, strategy) in &config.column_imputation {
            let profile = report
                .profile(column)
                .ok_or_else(|| QualityError::ColumnNotFound(column.clone()))?;
            if strategy.requires_numeric() && !profile.is_numeric() {
                return Err(QualityError::UnsupportedStrategy {
                    column: column.clone(),
                    strategy: strategy.as_str().to_string(),
                    inferred_type: profile.inferred_type.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Clean `df` and return the new table with a summary of what changed.
    ///
    /// The source table is never modified.
    pub fn clean(
        df: &DataFrame,
        report: &Report,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, CleaningSummary)> {
        Self::validate(report, config)?;

        let mut summary = CleaningSummary {
            rows_before: df.height(),
            ..CleaningSummary::default()
        };
        let mut df = df.clone();

        info!(
            "Cleaning table ({} rows): duplicates={}, imputation={}, outliers={}",
            df.height(),
            config.duplicates,
            config.imputation,
            config.outliers
        );

        // 1. Constant columns
        if config.drop_constant_columns {
            df = Self::drop_constant_columns(df, report, &mut summary)?;
        }

        // 2. Whitespace
        if config.normalize_text {
            summary.values_normalized =
                sanitizers::normalize_whitespace(&mut df).context("Normalizing text")?;
        }

        // 3. Duplicates, so imputation sees de-duplicated statistics
        let strategy = duplicates::resolve_strategy(config.duplicates, report);
        df = duplicates::apply(df, strategy, &mut summary).context("Handling duplicates")?;

        // 4. Missing values
        imputation::impute(&mut df, report, config, &mut summary).context("Imputing")?;

        // 5. Outliers
        df = outliers::apply(df, report, config.outliers, &mut summary)
            .context("Treating outliers")?;

        summary.rows_after = df.height();
        summary.rows_removed = summary.duplicate_rows_removed + summary.outlier_rows_removed;

        info!(
            "Cleaning complete: {} -> {} rows, {} cells imputed, {} values clipped",
            summary.rows_before, summary.rows_after, summary.cells_imputed, summary.values_clipped
        );
        Ok((df, summary))
    }

    fn drop_constant_columns(
        df: DataFrame,
        report: &Report,
        summary: &mut CleaningSummary,
    ) -> Result<DataFrame> {
        let constant: Vec<String> = report
            .columns
            .iter()
            .filter(|profile| profile.constant)
            .map(|profile| profile.name.clone())
            .filter(|name| df.column(name).is_ok())
            .collect();

        if constant.is_empty() {
            return Ok(df);
        }
        if constant.len() == df.width() {
            warn!("Every column is constant; keeping them to preserve the table");
            return Ok(df);
        }

        let names: Vec<PlSmallStr> = constant.iter().map(|s| s.as_str().into()).collect();
        let df = df.drop_many(names);
        info!("Dropped {} constant columns: {:?}", constant.len(), constant);
        summary.columns_dropped = constant;
        Ok(df)
    }
}
