//! Missing-value imputation.
//!
//! Numeric columns are filled with a statistic of the remaining values and
//! written back as Float64. Other columns are filled with their most frequent
//! value through a gather, so their dtype is preserved.

use crate::config::{CleaningConfig, ImputationStrategy};
use crate::error::Result;
use crate::types::{CleaningSummary, ColumnProfile, ImputationRecord, InferredType, Report};
use crate::utils::{
    mean, null_mask, numeric_values, quantile_sorted, sorted_values, text_values, value_counts,
};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// The strategy that applies to a column, or `None` when it must be skipped.
fn resolve_strategy(profile: &ColumnProfile, config: &CleaningConfig) -> Option<ImputationStrategy> {
    if let Some(strategy) = config.override_for(&profile.name) {
        return Some(strategy);
    }
    if profile.identifier_like {
        return None;
    }
    if profile.is_numeric() {
        return Some(config.imputation);
    }
    match profile.inferred_type {
        InferredType::Categorical | InferredType::Boolean => Some(ImputationStrategy::Mode),
        _ => None,
    }
}

/// Most frequent value; ties go to the smallest rendered value.
fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    value_counts(values).into_iter().next().map(|(value, _)| value)
}

fn numeric_fill(present: &[f64], strategy: ImputationStrategy) -> Option<f64> {
    match strategy {
        ImputationStrategy::Mean => mean(present),
        ImputationStrategy::Median => {
            let sorted = sorted_values(present);
            (!sorted.is_empty()).then(|| quantile_sorted(&sorted, 0.5))
        }
        ImputationStrategy::Zero => Some(0.0),
        ImputationStrategy::Mode => {
            let rendered: Vec<String> = present.iter().map(|v| v.to_string()).collect();
            mode(rendered.iter().map(String::as_str)).and_then(|v| v.parse().ok())
        }
    }
}

/// Result of filling one column.
#[derive(Debug, PartialEq)]
struct Filled {
    value: String,
    /// Missing cells filled
    missing: usize,
    /// Present cells that did not parse as finite numbers and were filled
    coerced: usize,
}

/// Fill a numeric column and write it back as Float64.
///
/// Cells of a string column that do not parse cannot be kept in a Float64
/// column, so they are filled too and counted separately.
fn impute_numeric(
    df: &mut DataFrame,
    name: &str,
    strategy: ImputationStrategy,
) -> Result<Option<Filled>> {
    let series = df.column(name)?.as_materialized_series().clone();
    let values = numeric_values(&series)?;
    let missing = series.null_count();
    let coerced = values
        .iter()
        .filter(|v| v.is_none())
        .count()
        .saturating_sub(missing);
    if missing == 0 {
        return Ok(Some(Filled {
            value: String::new(),
            missing: 0,
            coerced: 0,
        }));
    }
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let Some(fill) = numeric_fill(&present, strategy) else {
        return Ok(None);
    };

    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill)).collect();
    df.replace(name, Series::new(name.into(), filled))?;
    Ok(Some(Filled {
        value: fill.to_string(),
        missing,
        coerced,
    }))
}

/// Fill a non-numeric column with its mode, preserving the dtype.
fn impute_mode(df: &mut DataFrame, name: &str) -> Result<Option<Filled>> {
    let series = df.column(name)?.as_materialized_series().clone();
    let rendered = text_values(&series)?;
    let missing = series.null_count();
    if missing == 0 {
        return Ok(Some(Filled {
            value: String::new(),
            missing: 0,
            coerced: 0,
        }));
    }
    let Some(fill) = mode(rendered.iter().flatten().map(String::as_str)) else {
        return Ok(None);
    };
    let Some(source) = rendered.iter().position(|v| v.as_deref() == Some(fill.as_str())) else {
        return Ok(None);
    };

    let indices: Vec<IdxSize> = null_mask(&series)
        .into_iter()
        .enumerate()
        .map(|(i, is_null)| {
            if is_null {
                source as IdxSize
            } else {
                i as IdxSize
            }
        })
        .collect();
    let filled = series.take(&IdxCa::from_vec("idx".into(), indices))?;
    df.replace(name, filled)?;
    Ok(Some(Filled {
        value: fill,
        missing,
        coerced: 0,
    }))
}

pub(super) fn impute(
    df: &mut DataFrame,
    report: &Report,
    config: &CleaningConfig,
    summary: &mut CleaningSummary,
) -> Result<()> {
    for profile in &report.columns {
        if df.column(&profile.name).is_err() || profile.missing_count == 0 {
            continue;
        }

        let Some(strategy) = resolve_strategy(profile, config) else {
            debug!("No suitable imputation for '{}'", profile.name);
            summary.skipped_columns.push(profile.name.clone());
            continue;
        };

        let outcome = if profile.is_numeric() {
            impute_numeric(df, &profile.name, strategy)?
        } else {
            impute_mode(df, &profile.name)?
        };

        match outcome {
            Some(Filled { missing: 0, .. }) => {}
            Some(filled) => {
                let cells = filled.missing + filled.coerced;
                debug!(
                    "Filled {} cells of '{}' with {} ({}), {} unparseable",
                    cells, profile.name, filled.value, strategy, filled.coerced
                );
                if filled.coerced > 0 {
                    warn!(
                        "Replaced {} unparseable values in numeric column '{}'",
                        filled.coerced, profile.name
                    );
                }
                summary.cells_imputed += cells;
                summary.values_coerced += filled.coerced;
                summary.imputations.push(ImputationRecord {
                    column: profile.name.clone(),
                    strategy,
                    fill_value: filled.value,
                    cells,
                });
            }
            None => summary.skipped_columns.push(profile.name.clone()),
        }
    }

    info!(
        "Imputed {} cells across {} columns ({} skipped)",
        summary.cells_imputed,
        summary.imputations.len(),
        summary.skipped_columns.len()
    );
    Ok(())
}
