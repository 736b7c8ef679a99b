//! Text sanitization applied before duplicate detection.

use crate::error::Result;
use crate::utils::is_string_dtype;
use polars::prelude::*;
use tracing::debug;

/// Trim and collapse runs of whitespace to a single space.
pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize whitespace in every string column, returning the number of
/// cells that changed.
pub(super) fn normalize_whitespace(df: &mut DataFrame) -> Result<usize> {
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut changed = 0;
    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series();
        if !is_string_dtype(series.dtype()) {
            continue;
        }

        let mut column_changed = 0;
        let values: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|opt| {
                opt.map(|value| {
                    let normalized = collapse_whitespace(value);
                    if normalized != value {
                        column_changed += 1;
                    }
                    normalized
                })
            })
            .collect();

        if column_changed > 0 {
            debug!("Normalized {} values in '{}'", column_changed, col_name);
            df.replace(col_name, Series::new(col_name.as_str().into(), values))?;
            changed += column_changed;
        }
    }
    Ok(changed)
}
