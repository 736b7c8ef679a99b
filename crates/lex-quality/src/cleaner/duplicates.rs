use crate::analyzers::{first_occurrence_mask, row_signatures};
use crate::config::DuplicateStrategy;
use crate::error::Result;
use crate::types::{CleaningSummary, Report, Severity};
use polars::prelude::*;
use tracing::{debug, info};

use super::DUPLICATE_FLAG_COLUMN;

/// Resolve `auto` against the analysed duplicate severity.
pub(super) fn resolve_strategy(strategy: DuplicateStrategy, report: &Report) -> DuplicateStrategy {
    match strategy {
        DuplicateStrategy::Auto if report.duplicate_severity() == Severity::High => {
            DuplicateStrategy::Remove
        }
        DuplicateStrategy::Auto => DuplicateStrategy::Flag,
        other => other,
    }
}

pub(super) fn apply(
    mut df: DataFrame,
    strategy: DuplicateStrategy,
    summary: &mut CleaningSummary,
) -> Result<DataFrame> {
    summary.duplicate_strategy_applied = strategy;
    if strategy == DuplicateStrategy::Keep || df.height() == 0 {
        return Ok(df);
    }

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let columns: Vec<&str> = names.iter().map(String::as_str).collect();
    let keep = first_occurrence_mask(&row_signatures(&df, &columns)?);
    let duplicates = keep.iter().filter(|first| !**first).count();

    match strategy {
        DuplicateStrategy::Remove => {
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            df = df.filter(&mask)?;
            summary.duplicate_rows_removed = duplicates;
            info!("Removed {} duplicate rows", duplicates);
        }
        DuplicateStrategy::Flag => {
            let flags: Vec<bool> = keep.iter().map(|first| !first).collect();
            df.with_column(Series::new(DUPLICATE_FLAG_COLUMN.into(), flags))?;
            summary.rows_flagged_duplicate = duplicates;
            debug!("Flagged {} duplicate rows", duplicates);
        }
        DuplicateStrategy::Keep | DuplicateStrategy::Auto => {}
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "a" => [1i64, 2, 1, 3, 1],
            "b" => ["x", "y", "x", "z", "x"]
        )
        .unwrap()
    }

    #[test]
    fn test_remove_keeps_first_occurrence() {
        let mut summary = CleaningSummary::default();
        let df = apply(sample(), DuplicateStrategy::Remove, &mut summary).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(summary.duplicate_rows_removed, 2);
        let a: Vec<Option<i64>> = df.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_flag_marks_later_occurrences() {
        let mut summary = CleaningSummary::default();
        let df = apply(sample(), DuplicateStrategy::Flag, &mut summary).unwrap();
        assert_eq!(df.height(), 5);
        let flags: Vec<Option<bool>> = df
            .column(DUPLICATE_FLAG_COLUMN)
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            flags,
            vec![Some(false), Some(false), Some(true), Some(false), Some(true)]
        );
        assert_eq!(summary.rows_flagged_duplicate, 2);
        assert_eq!(summary.duplicate_strategy_applied, DuplicateStrategy::Flag);
    }

    #[test]
    fn test_keep_is_noop() {
        let mut summary = CleaningSummary::default();
        let df = apply(sample(), DuplicateStrategy::Keep, &mut summary).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.height(), 5);
    }
}
