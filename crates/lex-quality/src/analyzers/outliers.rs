//! Outlier detection.
//!
//! Two univariate methods (IQR fences and z-scores) run per column and a
//! multivariate isolation forest scores complete rows. The three verdicts
//! are reported side by side and never merged into one count.

use super::isolation_forest::IsolationForest;
use super::{AnalysisContext, Analyzer};
use crate::config::AnalysisConfig;
use crate::types::{AnalyzerKind, Finding, FindingPayload, IqrResult, Severity, ZScoreResult};
use crate::utils::{mean, numeric_values, quantile_sorted, sorted_values, std_dev};
use anyhow::Result;
use rand::prelude::*;
use tracing::debug;

const UNIVARIATE_METHOD: &str = "iqr_zscore";
const ENSEMBLE_METHOD: &str = "isolation_forest";

/// IQR fences over the present values of one column.
pub(crate) fn iqr_outliers(present: &[(usize, f64)], multiplier: f64, sample: usize) -> IqrResult {
    let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
    let sorted = sorted_values(&values);
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_bound = q1 - multiplier * iqr;
    let upper_bound = q3 + multiplier * iqr;
    let rows: Vec<usize> = present
        .iter()
        .filter(|(_, v)| *v < lower_bound || *v > upper_bound)
        .map(|(row, _)| *row)
        .collect();
    IqrResult {
        q1,
        q3,
        iqr,
        lower_bound,
        upper_bound,
        count: rows.len(),
        sample_rows: rows.into_iter().take(sample).collect(),
    }
}

/// Population z-scores; `None` when the column has no spread.
pub(crate) fn zscore_outliers(
    present: &[(usize, f64)],
    threshold: f64,
    sample: usize,
) -> Option<ZScoreResult> {
    let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
    let mean = mean(&values)?;
    let std = std_dev(&values, 0)?;
    if std == 0.0 {
        return None;
    }
    let rows: Vec<usize> = present
        .iter()
        .filter(|(_, v)| ((v - mean) / std).abs() > threshold)
        .map(|(row, _)| *row)
        .collect();
    Some(ZScoreResult {
        mean,
        std,
        threshold,
        count: rows.len(),
        sample_rows: rows.into_iter().take(sample).collect(),
    })
}

fn column_severity(candidates: usize, non_missing: usize, config: &AnalysisConfig) -> Severity {
    if candidates == 0 || non_missing == 0 {
        return Severity::None;
    }
    let fraction = candidates as f64 / non_missing as f64;
    if fraction > config.outlier_high_fraction {
        Severity::High
    } else if fraction > config.outlier_medium_fraction {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Column values eligible for outlier detection.
struct NumericColumn {
    name: String,
    values: Vec<Option<f64>>,
}

impl NumericColumn {
    fn present(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.map(|v| (row, v)))
            .collect()
    }
}

/// Row-level verdicts from the isolation forest.
struct EnsembleVerdict {
    flagged: Vec<bool>,
    finding: Finding,
}

fn ensemble_verdict(
    columns: &[&NumericColumn],
    rows: usize,
    config: &AnalysisConfig,
) -> EnsembleVerdict {
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let complete: Vec<(usize, Vec<f64>)> = (0..rows)
        .filter_map(|row| {
            columns
                .iter()
                .map(|c| c.values[row])
                .collect::<Option<Vec<f64>>>()
                .map(|point| (row, point))
        })
        .collect();

    if columns.is_empty() || complete.len() < config.forest_min_rows {
        let reason = format!(
            "{} complete rows, at least {} required",
            complete.len(),
            config.forest_min_rows
        );
        return EnsembleVerdict {
            flagged: vec![false; rows],
            finding: Finding::not_applicable(AnalyzerKind::Outliers, names, ENSEMBLE_METHOD, reason),
        };
    }

    let points: Vec<Vec<f64>> = complete.iter().map(|(_, p)| p.clone()).collect();
    let fit_points: Vec<Vec<f64>> = if points.len() > config.forest_max_fit_rows {
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let mut chosen: Vec<usize> = (0..points.len())
            .collect::<Vec<_>>()
            .choose_multiple(&mut rng, config.forest_max_fit_rows)
            .copied()
            .collect();
        chosen.sort_unstable();
        chosen.into_iter().map(|i| points[i].clone()).collect()
    } else {
        points.clone()
    };

    let forest = IsolationForest::fit(
        &fit_points,
        config.forest_trees,
        config.forest_subsample,
        config.random_seed,
    );

    let mut flagged = vec![false; rows];
    let mut flagged_rows = Vec::new();
    for ((row, _), point) in complete.iter().zip(&points) {
        if forest.score(point) > config.forest_score_threshold {
            flagged[*row] = true;
            flagged_rows.push(*row);
        }
    }

    let severity = column_severity(flagged_rows.len(), complete.len(), config);
    let finding = Finding::new(
        AnalyzerKind::Outliers,
        names,
        severity,
        FindingPayload::EnsembleOutliers {
            flagged_rows: flagged_rows.len(),
            rows_scored: complete.len(),
            fit_rows: fit_points.len(),
            trees: config.forest_trees,
            sample_rows: flagged_rows.into_iter().take(config.sample_size).collect(),
        },
    );
    EnsembleVerdict { flagged, finding }
}

pub struct OutlierAnalyzer;

impl Analyzer for OutlierAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Outliers
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let config = ctx.config;
        let rows = ctx.rows();

        let mut candidates = Vec::new();
        for profile in ctx.profiles.iter().filter(|p| p.is_numeric() && !p.identifier_like) {
            candidates.push(NumericColumn {
                name: profile.name.clone(),
                values: numeric_values(ctx.series(&profile.name)?)?,
            });
        }

        // Univariate checks decide which columns feed the forest
        let mut findings = Vec::new();
        let mut univariate: Vec<(&NumericColumn, usize, IqrResult, ZScoreResult)> = Vec::new();
        for column in &candidates {
            let present = column.present();
            let columns = vec![column.name.clone()];
            if present.len() < config.outlier_min_rows {
                findings.push(Finding::not_applicable(
                    AnalyzerKind::Outliers,
                    columns,
                    UNIVARIATE_METHOD,
                    format!(
                        "{} values, at least {} required",
                        present.len(),
                        config.outlier_min_rows
                    ),
                ));
                continue;
            }
            let Some(zscore) = zscore_outliers(&present, config.zscore_threshold, config.sample_size)
            else {
                findings.push(Finding::not_applicable(
                    AnalyzerKind::Outliers,
                    columns,
                    UNIVARIATE_METHOD,
                    "constant column",
                ));
                continue;
            };
            let iqr = iqr_outliers(&present, config.iqr_multiplier, config.sample_size);
            univariate.push((column, present.len(), iqr, zscore));
        }

        let analysed: Vec<&NumericColumn> = univariate.iter().map(|(c, ..)| *c).collect();
        let ensemble =
            (!analysed.is_empty()).then(|| ensemble_verdict(&analysed, rows, config));

        for (column, non_missing, iqr, zscore) in univariate {
            let ensemble_rows = ensemble
                .as_ref()
                .map(|verdict| {
                    column
                        .values
                        .iter()
                        .zip(&verdict.flagged)
                        .filter(|(v, flagged)| v.is_some() && **flagged)
                        .count()
                })
                .unwrap_or(0);
            let severity = column_severity(iqr.count.max(zscore.count), non_missing, config);
            findings.push(Finding::new(
                AnalyzerKind::Outliers,
                vec![column.name.clone()],
                severity,
                FindingPayload::Outliers {
                    non_missing,
                    iqr,
                    zscore,
                    ensemble_rows,
                },
            ));
        }

        if let Some(verdict) = ensemble {
            findings.push(verdict.finding);
        }

        debug!("Outliers: {} findings over {} numeric columns", findings.len(), candidates.len());
        Ok(findings)
    }
}
