//! Pairwise relationships: Pearson correlation between numeric columns and
//! chi-square / Cramér's V association between categorical columns.

use super::{AnalysisContext, Analyzer};
use crate::types::{AnalyzerKind, Finding, FindingPayload, InferredType, Severity};
use crate::utils::{mean, numeric_values, round_to, text_values};
use anyhow::Result;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::HashMap;
use tracing::debug;

const PEARSON_METHOD: &str = "pearson";
const CHI_SQUARE_METHOD: &str = "chi_square";

/// Pearson correlation of paired samples; `None` when either side has no spread.
pub(crate) fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Contingency table over rows where both values are present.
///
/// `None` unless both sides show at least two categories.
pub(crate) fn contingency_table(
    left: &[Option<String>],
    right: &[Option<String>],
) -> Option<Vec<Vec<usize>>> {
    let mut row_index: HashMap<&str, usize> = HashMap::new();
    let mut col_index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<Vec<usize>> = Vec::new();

    for (a, b) in left.iter().zip(right) {
        let (Some(a), Some(b)) = (a.as_deref(), b.as_deref()) else {
            continue;
        };
        let r = *row_index.entry(a).or_insert_with(|| {
            counts.push(vec![0; col_index.len()]);
            counts.len() - 1
        });
        let c = match col_index.get(b) {
            Some(&c) => c,
            None => {
                let c = col_index.len();
                col_index.insert(b, c);
                for row in &mut counts {
                    row.push(0);
                }
                c
            }
        };
        counts[r][c] += 1;
    }

    if counts.len() < 2 || col_index.len() < 2 {
        None
    } else {
        Some(counts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChiSquareResult {
    pub chi_square: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
    pub cramers_v: f64,
    pub observations: usize,
    pub min_expected: f64,
}

/// Chi-square test of independence with Cramér's V.
pub(crate) fn chi_square_test(table: &[Vec<usize>]) -> Option<ChiSquareResult> {
    let rows = table.len();
    let cols = table.first()?.len();
    let row_sums: Vec<f64> = table.iter().map(|r| r.iter().sum::<usize>() as f64).collect();
    let col_sums: Vec<f64> = (0..cols)
        .map(|c| table.iter().map(|r| r[c]).sum::<usize>() as f64)
        .collect();
    let n: f64 = row_sums.iter().sum();
    if n == 0.0 || rows < 2 || cols < 2 {
        return None;
    }

    let mut chi_square = 0.0;
    let mut min_expected = f64::INFINITY;
    for (r, row) in table.iter().enumerate() {
        for (c, &observed) in row.iter().enumerate() {
            let expected = row_sums[r] * col_sums[c] / n;
            min_expected = min_expected.min(expected);
            if expected > 0.0 {
                chi_square += (observed as f64 - expected).powi(2) / expected;
            }
        }
    }

    let degrees_of_freedom = (rows - 1) * (cols - 1);
    let p_value = ChiSquared::new(degrees_of_freedom as f64)
        .map(|dist| dist.sf(chi_square))
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);
    let k = rows.min(cols) as f64 - 1.0;
    let cramers_v = (chi_square / (n * k)).sqrt().clamp(0.0, 1.0);

    Some(ChiSquareResult {
        chi_square,
        p_value,
        degrees_of_freedom,
        cramers_v,
        observations: n as usize,
        min_expected,
    })
}

pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    fn numeric_pairs(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let config = ctx.config;
        let mut columns: Vec<(&str, Vec<Option<f64>>)> = Vec::new();
        for profile in ctx.profiles.iter().filter(|p| {
            p.is_numeric()
                && !p.identifier_like
                && p.numeric.as_ref().is_some_and(|stats| stats.std > 0.0)
        }) {
            columns.push((profile.name.as_str(), numeric_values(ctx.series(&profile.name)?)?));
        }

        let mut findings = Vec::new();
        for (i, (left_name, left)) in columns.iter().enumerate() {
            for (right_name, right) in columns.iter().skip(i + 1) {
                let (x, y): (Vec<f64>, Vec<f64>) = left
                    .iter()
                    .zip(right)
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .unzip();
                let pair = vec![left_name.to_string(), right_name.to_string()];
                if x.len() < 3 {
                    findings.push(Finding::not_applicable(
                        AnalyzerKind::Correlations,
                        pair,
                        PEARSON_METHOD,
                        format!("{} paired observations, at least 3 required", x.len()),
                    ));
                    continue;
                }
                let Some(r) = pearson(&x, &y) else {
                    findings.push(Finding::not_applicable(
                        AnalyzerKind::Correlations,
                        pair,
                        PEARSON_METHOD,
                        "no spread on paired rows",
                    ));
                    continue;
                };
                if r.abs() <= config.correlation_threshold {
                    continue;
                }
                let multicollinear = r.abs() > config.multicollinearity_threshold;
                findings.push(Finding::new(
                    AnalyzerKind::Correlations,
                    pair,
                    if multicollinear {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    FindingPayload::NumericCorrelation {
                        pearson_r: round_to(r, 4),
                        observations: x.len(),
                        multicollinear,
                    },
                ));
            }
        }
        Ok(findings)
    }

    fn categorical_pairs(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let config = ctx.config;
        let mut columns: Vec<(&str, Vec<Option<String>>)> = Vec::new();
        for profile in ctx
            .profiles
            .iter()
            .filter(|p| {
                matches!(p.inferred_type, InferredType::Categorical | InferredType::Boolean)
                    && (2..=config.max_categories).contains(&p.distinct_count)
            })
            .take(config.max_categorical_columns)
        {
            columns.push((profile.name.as_str(), text_values(ctx.series(&profile.name)?)?));
        }

        let mut findings = Vec::new();
        for (i, (left_name, left)) in columns.iter().enumerate() {
            for (right_name, right) in columns.iter().skip(i + 1) {
                let pair = vec![left_name.to_string(), right_name.to_string()];
                let result = contingency_table(left, right).and_then(|t| chi_square_test(&t));
                let Some(result) = result else {
                    findings.push(Finding::not_applicable(
                        AnalyzerKind::Correlations,
                        pair,
                        CHI_SQUARE_METHOD,
                        "fewer than two categories on paired rows",
                    ));
                    continue;
                };
                if result.min_expected < config.min_expected_count {
                    findings.push(Finding::not_applicable(
                        AnalyzerKind::Correlations,
                        pair,
                        CHI_SQUARE_METHOD,
                        format!(
                            "insufficient data: minimum expected count {:.2} below {}",
                            result.min_expected, config.min_expected_count
                        ),
                    ));
                    continue;
                }
                if result.cramers_v <= config.cramers_v_threshold
                    || result.p_value >= config.significance_level
                {
                    continue;
                }
                let severity = if result.cramers_v > config.strong_association_threshold {
                    Severity::High
                } else {
                    Severity::Medium
                };
                findings.push(Finding::new(
                    AnalyzerKind::Correlations,
                    pair,
                    severity,
                    FindingPayload::CategoricalAssociation {
                        chi_square: round_to(result.chi_square, 4),
                        p_value: result.p_value,
                        degrees_of_freedom: result.degrees_of_freedom,
                        cramers_v: round_to(result.cramers_v, 4),
                        observations: result.observations,
                    },
                ));
            }
        }
        Ok(findings)
    }
}

impl Analyzer for CorrelationAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Correlations
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = self.numeric_pairs(ctx)?;
        findings.extend(self.categorical_pairs(ctx)?);
        debug!("Correlations: {} findings", findings.len());
        Ok(findings)
    }
}
