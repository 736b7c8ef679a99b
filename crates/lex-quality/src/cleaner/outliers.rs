//! Outlier treatment against the bounds recorded at analysis time.

use crate::config::OutlierStrategy;
use crate::error::Result;
use crate::types::{AnalyzerKind, CleaningSummary, FindingPayload, IqrResult, Report};
use crate::utils::{is_string_dtype, numeric_values, text_values};
use polars::prelude::*;
use tracing::{debug, info};

use super::OUTLIER_FLAG_SUFFIX;

/// Columns whose analysis-time IQR check found at least one candidate.
fn columns_with_outliers(report: &Report) -> Vec<(&str, &IqrResult)> {
    report
        .findings_for(AnalyzerKind::Outliers)
        .filter_map(|finding| match &finding.payload {
            FindingPayload::Outliers { iqr, .. } if iqr.count > 0 => {
                finding.columns.first().map(|name| (name.as_str(), iqr))
            }
            _ => None,
        })
        .collect()
}

fn is_outside(value: f64, bounds: &IqrResult) -> bool {
    value < bounds.lower_bound || value > bounds.upper_bound
}

/// Clamp outside values, leaving every other cell as it was.
///
/// Numeric dtypes come back as Float64. String columns stay strings, so cells
/// that never parsed as numbers survive unchanged.
fn clip_column(series: &Series, values: &[Option<f64>], bounds: &IqrResult) -> Result<Series> {
    let clamp = |x: f64| x.clamp(bounds.lower_bound, bounds.upper_bound);
    let name = series.name().clone();

    if is_string_dtype(series.dtype()) {
        let clipped: Vec<Option<String>> = text_values(series)?
            .into_iter()
            .zip(values)
            .map(|(text, value)| match value {
                Some(x) if is_outside(*x, bounds) => Some(clamp(*x).to_string()),
                _ => text,
            })
            .collect();
        return Ok(Series::new(name, clipped));
    }

    let clipped: Vec<Option<f64>> = series
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|cell| cell.map(|x| if x.is_finite() { clamp(x) } else { x }))
        .collect();
    Ok(Series::new(name, clipped))
}

pub(super) fn apply(
    mut df: DataFrame,
    report: &Report,
    strategy: OutlierStrategy,
    summary: &mut CleaningSummary,
) -> Result<DataFrame> {
    let targets = columns_with_outliers(report);
    let mut keep = vec![true; df.height()];

    for (name, bounds) in targets {
        if df.column(name).is_err() {
            continue;
        }
        let series = df.column(name)?.as_materialized_series().clone();
        let values = numeric_values(&series)?;
        let outside: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| is_outside(x, bounds)))
            .collect();
        let count = outside.iter().filter(|o| **o).count();
        if count == 0 {
            continue;
        }

        match strategy {
            OutlierStrategy::Clip => {
                df.replace(name, clip_column(&series, &values, bounds)?)?;
                summary.values_clipped += count;
                debug!(
                    "Clipped {} values of '{}' to [{}, {}]",
                    count, name, bounds.lower_bound, bounds.upper_bound
                );
            }
            OutlierStrategy::Flag => {
                let flag_name = format!("{name}{OUTLIER_FLAG_SUFFIX}");
                df.with_column(Series::new(flag_name.as_str().into(), outside))?;
                summary.values_flagged_outlier += count;
                debug!("Flagged {} outliers in '{}'", count, name);
            }
            OutlierStrategy::Remove => {
                for (row, is_outside) in outside.iter().enumerate() {
                    if *is_outside {
                        keep[row] = false;
                    }
                }
            }
        }
    }

    if strategy == OutlierStrategy::Remove {
        let removed = keep.iter().filter(|k| !**k).count();
        if removed > 0 {
            df = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
            info!("Removed {} rows holding outliers", removed);
        }
        summary.outlier_rows_removed = removed;
    }
    Ok(df)
}
