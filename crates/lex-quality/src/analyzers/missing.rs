//! Missing-value analysis: per-column bands, imputation suggestions and
//! co-missingness patterns.

use super::{AnalysisContext, Analyzer};
use crate::config::AnalysisConfig;
use crate::types::{
    AnalyzerKind, ColumnProfile, Finding, FindingPayload, ImputationSuggestion, InferredType,
    Severity,
};
use crate::utils::{null_mask, round_to};
use anyhow::Result;
use tracing::debug;

pub struct MissingValueAnalyzer;

impl Analyzer for MissingValueAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::MissingValues
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let rows = ctx.rows();
        let config = ctx.config;

        let mut masks: Vec<(String, Vec<bool>)> = Vec::with_capacity(ctx.df.width());
        for column in ctx.df.get_columns() {
            let series = column.as_materialized_series();
            masks.push((series.name().to_string(), null_mask(series)));
        }

        let missing_counts: Vec<usize> = masks
            .iter()
            .map(|(_, mask)| mask.iter().filter(|m| **m).count())
            .collect();
        let total_missing_cells: usize = missing_counts.iter().sum();
        let rows_with_any_missing = (0..rows)
            .filter(|&row| masks.iter().any(|(_, mask)| mask[row]))
            .count();

        let mut findings = vec![Finding::new(
            AnalyzerKind::MissingValues,
            Vec::new(),
            Severity::None,
            FindingPayload::MissingSummary {
                total_missing_cells,
                total_cells: rows * masks.len(),
                columns_with_missing: missing_counts.iter().filter(|c| **c > 0).count(),
                rows_with_any_missing,
                complete_rows: rows - rows_with_any_missing,
            },
        )];

        for ((name, _), &missing_count) in masks.iter().zip(&missing_counts) {
            if missing_count == 0 || rows == 0 {
                continue;
            }
            let pct = missing_count as f64 / rows as f64 * 100.0;
            let severity = missing_severity(pct, config);
            if severity == Severity::None {
                continue;
            }
            let suggestion = ctx
                .profiles
                .iter()
                .find(|p| &p.name == name)
                .map(|p| suggest_imputation(p, config))
                .unwrap_or(ImputationSuggestion::Unsuitable);

            findings.push(Finding::new(
                AnalyzerKind::MissingValues,
                vec![name.clone()],
                severity,
                FindingPayload::MissingValues {
                    missing_count,
                    missing_percentage: round_to(pct, 2),
                    suggested_imputation: suggestion,
                    drop_candidate: pct >= config.missing_drop_pct,
                },
            ));
        }

        // Only partially missing columns can carry a pattern
        let partial: Vec<&(String, Vec<bool>)> = masks
            .iter()
            .zip(&missing_counts)
            .filter(|(_, count)| **count > 0 && **count < rows)
            .map(|(mask, _)| mask)
            .collect();

        for (i, (left_name, left)) in partial.iter().enumerate() {
            for (right_name, right) in partial.iter().skip(i + 1) {
                let Some((phi, co_missing_rows)) = phi_coefficient(left, right) else {
                    continue;
                };
                if phi >= config.missingness_correlation_threshold {
                    findings.push(Finding::new(
                        AnalyzerKind::MissingValues,
                        vec![left_name.clone(), right_name.clone()],
                        Severity::Medium,
                        FindingPayload::MissingnessPattern {
                            co_missing_rows,
                            phi: round_to(phi, 4),
                        },
                    ));
                }
            }
        }

        debug!(
            "Missing values: {} cells, {} findings",
            total_missing_cells,
            findings.len()
        );
        Ok(findings)
    }
}

fn missing_severity(pct: f64, config: &AnalysisConfig) -> Severity {
    if pct >= config.missing_high_pct {
        Severity::High
    } else if pct >= config.missing_medium_pct {
        Severity::Medium
    } else if pct > config.missing_low_pct {
        Severity::Low
    } else {
        Severity::None
    }
}

/// Suggest how a column's gaps could be filled, from its profile alone.
pub(crate) fn suggest_imputation(
    profile: &ColumnProfile,
    config: &AnalysisConfig,
) -> ImputationSuggestion {
    if profile.identifier_like {
        return ImputationSuggestion::Unsuitable;
    }
    match profile.inferred_type {
        InferredType::Numeric => match &profile.numeric {
            Some(stats) if stats.skewness.abs() < config.symmetric_skew_limit => {
                ImputationSuggestion::Mean
            }
            _ => ImputationSuggestion::Median,
        },
        InferredType::Categorical | InferredType::Boolean => ImputationSuggestion::Mode,
        _ => ImputationSuggestion::Unsuitable,
    }
}

/// Phi coefficient of two missingness indicators, plus the co-missing row count.
///
/// `None` when either indicator is constant.
fn phi_coefficient(left: &[bool], right: &[bool]) -> Option<(f64, usize)> {
    let (mut both, mut only_left, mut only_right, mut neither) = (0f64, 0f64, 0f64, 0f64);
    for (&l, &r) in left.iter().zip(right) {
        match (l, r) {
            (true, true) => both += 1.0,
            (true, false) => only_left += 1.0,
            (false, true) => only_right += 1.0,
            (false, false) => neither += 1.0,
        }
    }
    let denominator = ((both + only_left)
        * (only_right + neither)
        * (both + only_right)
        * (only_left + neither))
        .sqrt();
    if denominator == 0.0 {
        return None;
    }
    let phi = (both * neither - only_left * only_right) / denominator;
    Some((phi, both as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use polars::prelude::*;

    fn run(df: &DataFrame) -> Vec<Finding> {
        let config = AnalysisConfig::default();
        let profile = DataProfiler::profile_table(df, &config).unwrap();
        let ctx = AnalysisContext::new(df, &profile.columns, &config);
        MissingValueAnalyzer.analyze(&ctx).unwrap()
    }

    #[test]
    fn test_summary_always_emitted() {
        let df = df!("a" => [1i64, 2, 3]).unwrap();
        let findings = run(&df);
        assert_eq!(findings.len(), 1);
        match &findings[0].payload {
            FindingPayload::MissingSummary {
                total_missing_cells,
                total_cells,
                complete_rows,
                ..
            } => {
                assert_eq!(*total_missing_cells, 0);
                assert_eq!(*total_cells, 3);
                assert_eq!(*complete_rows, 3);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_severity_bands() {
        let config = AnalysisConfig::default();
        assert_eq!(missing_severity(0.0, &config), Severity::None);
        assert_eq!(missing_severity(2.0, &config), Severity::Low);
        assert_eq!(missing_severity(5.0, &config), Severity::Medium);
        assert_eq!(missing_severity(20.0, &config), Severity::High);
    }

    #[test]
    fn test_column_finding_and_suggestion() {
        let df = df!(
            "amount" => [Some(1.0), Some(2.0), None, Some(3.0), Some(2.5)],
            "color" => [Some("red"), None, Some("red"), Some("blue"), Some("red")]
        )
        .unwrap();
        let findings = run(&df);
        let amount = findings
            .iter()
            .find(|f| f.columns == vec!["amount".to_string()])
            .unwrap();
        assert_eq!(amount.severity, Severity::High);
        match &amount.payload {
            FindingPayload::MissingValues {
                missing_count,
                missing_percentage,
                drop_candidate,
                ..
            } => {
                assert_eq!(*missing_count, 1);
                assert_eq!(*missing_percentage, 20.0);
                assert!(!drop_candidate);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        let color = findings
            .iter()
            .find(|f| f.columns == vec!["color".to_string()])
            .unwrap();
        assert!(matches!(
            color.payload,
            FindingPayload::MissingValues {
                suggested_imputation: ImputationSuggestion::Mode,
                ..
            }
        ));
    }

    #[test]
    fn test_missingness_pattern() {
        let df = df!(
            "a" => [None, Some(1i64), None, Some(4), Some(5), Some(6)],
            "b" => [None, Some("x"), None, Some("y"), Some("z"), Some("w")],
            "c" => [Some(1i64), Some(2), Some(3), None, Some(5), Some(6)]
        )
        .unwrap();
        let findings = run(&df);
        let patterns: Vec<&Finding> = findings
            .iter()
            .filter(|f| matches!(f.payload, FindingPayload::MissingnessPattern { .. }))
            .collect();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].columns, vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(
            patterns[0].payload,
            FindingPayload::MissingnessPattern { co_missing_rows: 2, .. }
        ));
    }

    #[test]
    fn test_phi_coefficient_constant_indicator() {
        assert!(phi_coefficient(&[false, false], &[true, false]).is_none());
        let (phi, both) = phi_coefficient(&[true, false], &[true, false]).unwrap();
        assert!((phi - 1.0).abs() < 1e-12);
        assert_eq!(both, 1);
    }
}
