//! Statistical helpers for column profiling.

use crate::types::{NumericStats, ValueCount};
use crate::utils::{mean, quantile_sorted, skewness, sorted_values, std_dev, value_counts};
use once_cell::sync::Lazy;
use regex::Regex;

static ID_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:id|uuid|guid|key|index|idx)$|(?i:[_\s.-])(?i:id|uuid|guid|key|index|idx|code|number|no)$|^(?i:id)[_\s.-]|[a-z](Id|ID)$",
    )
    .expect("Invalid regex: identifier name")
});

/// Whether a column name reads like an identifier ("id", "user_id", "customerID").
pub(crate) fn is_identifier_name(name: &str) -> bool {
    ID_NAME_PATTERN.is_match(name.trim())
}

/// Descriptive statistics over the non-missing values of a numeric column.
pub(crate) fn numeric_stats(values: &[f64]) -> Option<NumericStats> {
    let sorted = sorted_values(values);
    let (first, last) = (*sorted.first()?, *sorted.last()?);
    Some(NumericStats {
        min: first,
        max: last,
        mean: mean(&sorted)?,
        median: quantile_sorted(&sorted, 0.5),
        std: std_dev(&sorted, 1).unwrap_or(0.0),
        skewness: skewness(&sorted),
        zeros: sorted.iter().filter(|v| **v == 0.0).count(),
        negatives: sorted.iter().filter(|v| **v < 0.0).count(),
    })
}

/// The `k` most frequent non-missing values.
pub(crate) fn top_values(texts: &[Option<String>], k: usize) -> Vec<ValueCount> {
    value_counts(texts.iter().flatten().map(String::as_str))
        .into_iter()
        .take(k)
        .map(|(value, count)| ValueCount { value, count })
        .collect()
}
