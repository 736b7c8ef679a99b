//! Distribution drift between a reference table and the analysed table.
//!
//! Numeric columns use the two-sample Kolmogorov-Smirnov test plus the
//! Wasserstein-1 distance; categorical columns use the Population Stability
//! Index. Drift is reported alongside the findings and never feeds the score.

use crate::config::AnalysisConfig;
use crate::types::{ColumnDrift, ColumnProfile, DriftReport, DriftTest, InferredType};
use crate::utils::{numeric_values, round_to, sorted_values, text_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Proportion floor so empty categories do not blow up the log ratio.
const PSI_EPSILON: f64 = 1e-4;

/// Two-sample KS statistic over ascending-sorted samples.
pub(crate) fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Asymptotic p-value of the KS statistic (Kolmogorov distribution tail).
pub(crate) fn ks_p_value(d: f64, n: usize, m: usize) -> f64 {
    let effective = ((n * m) as f64 / (n + m) as f64).sqrt();
    let lambda = (effective + 0.12 + 0.11 / effective) * d;
    if lambda < 1e-3 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100 {
        let k = k as f64;
        let term = (-2.0 * k * k * lambda * lambda).exp();
        sum += if k as usize % 2 == 1 { term } else { -term };
        if term < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Wasserstein-1 distance: the area between the two empirical CDFs.
pub(crate) fn wasserstein(a: &[f64], b: &[f64]) -> f64 {
    let mut points: Vec<f64> = a.iter().chain(b).copied().collect();
    points.sort_by(|x, y| x.total_cmp(y));
    points.dedup();

    let cdf = |sorted: &[f64], x: f64| sorted.partition_point(|v| *v <= x) as f64 / sorted.len() as f64;
    points
        .windows(2)
        .map(|w| (cdf(a, w[0]) - cdf(b, w[0])).abs() * (w[1] - w[0]))
        .sum()
}

/// Population Stability Index over the union of observed categories.
pub(crate) fn psi(reference: &[String], current: &[String]) -> f64 {
    let mut counts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for value in reference {
        counts.entry(value).or_default().0 += 1.0;
    }
    for value in current {
        counts.entry(value).or_default().1 += 1.0;
    }
    let (n_ref, n_cur) = (reference.len().max(1) as f64, current.len().max(1) as f64);
    counts
        .values()
        .map(|(r, c)| {
            let p = (r / n_ref).max(PSI_EPSILON);
            let q = (c / n_cur).max(PSI_EPSILON);
            (q - p) * (q / p).ln()
        })
        .sum()
}

pub struct DriftAnalyzer;

impl DriftAnalyzer {
    /// Compare every column of `current` against the same-named column of `reference`.
    pub fn compare(
        reference: &DataFrame,
        current: &DataFrame,
        profiles: &[ColumnProfile],
        config: &AnalysisConfig,
    ) -> Result<DriftReport> {
        let reference_names: HashSet<&str> =
            reference.get_column_names().into_iter().map(|n| n.as_str()).collect();
        let current_names: HashSet<&str> =
            current.get_column_names().into_iter().map(|n| n.as_str()).collect();

        let mut columns = Vec::new();
        for profile in profiles {
            if !reference_names.contains(profile.name.as_str()) {
                continue;
            }
            let before = reference.column(&profile.name)?.as_materialized_series();
            let after = current.column(&profile.name)?.as_materialized_series();

            let result = match profile.inferred_type {
                InferredType::Numeric => Self::numeric_drift(before, after, config)?,
                InferredType::Categorical | InferredType::Boolean => {
                    Self::categorical_drift(before, after, config)?
                }
                _ => None,
            };
            if let Some((drifted, result)) = result {
                columns.push(ColumnDrift {
                    column: profile.name.clone(),
                    drifted,
                    result,
                });
            }
        }

        let mut unmatched_columns: Vec<String> = profiles
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| !reference_names.contains(name))
            .map(str::to_string)
            .collect();
        unmatched_columns.extend(
            reference
                .get_column_names()
                .into_iter()
                .map(|n| n.as_str())
                .filter(|name| !current_names.contains(name))
                .map(str::to_string),
        );

        let drifted_columns: Vec<String> = columns
            .iter()
            .filter(|c| c.drifted)
            .map(|c| c.column.clone())
            .collect();

        debug!(
            "Drift: {} of {} compared columns drifted",
            drifted_columns.len(),
            columns.len()
        );
        Ok(DriftReport {
            columns,
            drifted_columns,
            unmatched_columns,
        })
    }

    fn numeric_drift(
        before: &Series,
        after: &Series,
        config: &AnalysisConfig,
    ) -> Result<Option<(bool, DriftTest)>> {
        let a: Vec<f64> = numeric_values(before)?.into_iter().flatten().collect();
        let b: Vec<f64> = numeric_values(after)?.into_iter().flatten().collect();
        if a.len() < 2 || b.len() < 2 {
            return Ok(None);
        }
        let (a, b) = (sorted_values(&a), sorted_values(&b));
        let d = ks_statistic(&a, &b);
        let p_value = ks_p_value(d, a.len(), b.len());
        Ok(Some((
            p_value < config.significance_level,
            DriftTest::Numeric {
                ks_statistic: round_to(d, 6),
                p_value,
                wasserstein: round_to(wasserstein(&a, &b), 6),
            },
        )))
    }

    fn categorical_drift(
        before: &Series,
        after: &Series,
        config: &AnalysisConfig,
    ) -> Result<Option<(bool, DriftTest)>> {
        let a: Vec<String> = text_values(before)?.into_iter().flatten().collect();
        let b: Vec<String> = text_values(after)?.into_iter().flatten().collect();
        if a.is_empty() || b.is_empty() {
            return Ok(None);
        }
        let psi = psi(&a, &b);
        Ok(Some((
            psi > config.psi_threshold,
            DriftTest::Categorical {
                psi: round_to(psi, 6),
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_ks_statistic() {
        assert_eq!(ks_statistic(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(ks_statistic(&[1.0, 2.0], &[3.0, 4.0]), 1.0);
        assert!((ks_statistic(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ks_p_value_bounds() {
        assert_eq!(ks_p_value(0.0, 50, 50), 1.0);
        assert!(ks_p_value(1.0, 50, 50) < 1e-6);
    }

    #[test]
    fn test_wasserstein_shift() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0, 5.0];
        assert!((wasserstein(&a, &b) - 2.0).abs() < 1e-12);
        assert_eq!(wasserstein(&a, &a), 0.0);
    }

    #[test]
    fn test_psi() {
        let same = strings(&["a", "b", "a", "b"]);
        assert!(psi(&same, &same).abs() < 1e-12);
        let shifted = strings(&["c", "c", "c", "c"]);
        assert!(psi(&same, &shifted) > 0.2);
    }

    #[test]
    fn test_compare_tables() {
        let reference = df!(
            "amount" => (0..50).map(|i| i as f64).collect::<Vec<_>>(),
            "segment" => ["a", "b"].repeat(25),
            "legacy" => vec![1i64; 50]
        )
        .unwrap();
        let current = df!(
            "amount" => (0..50).map(|i| 100.0 + i as f64).collect::<Vec<_>>(),
            "segment" => ["a", "b"].repeat(25),
            "fresh" => vec![2i64; 50]
        )
        .unwrap();
        let config = AnalysisConfig::default();
        let profile = DataProfiler::profile_table(&current, &config).unwrap();
        let report = DriftAnalyzer::compare(&reference, &current, &profile.columns, &config).unwrap();

        assert_eq!(report.drifted_columns, vec!["amount".to_string()]);
        assert_eq!(report.columns.len(), 2);
        assert!(!report.columns[1].drifted);
        assert_eq!(
            report.unmatched_columns,
            vec!["fresh".to_string(), "legacy".to_string()]
        );
    }
}
