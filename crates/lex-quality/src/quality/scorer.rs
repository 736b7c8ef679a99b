use crate::config::ScoreWeights;
use crate::error::{QualityError, Result};
use crate::types::{
    AnalyzerKind, Finding, FindingPayload, Grade, QualityScore, Severity, TableShape,
};
use crate::utils::round_to;
use std::collections::HashSet;

/// Dataset-level counts pulled from the summary findings.
struct Summaries {
    missing_cells: usize,
    total_cells: usize,
    duplicate_fraction: f64,
    inconsistent_cells: usize,
    checked_cells: usize,
}

fn expect_one<T>(found: Vec<T>, name: &str) -> Result<T> {
    let count = found.len();
    let mut found = found.into_iter();
    match (found.next(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(QualityError::InvariantViolation(format!(
            "expected exactly one {name} finding, found {count}"
        ))),
    }
}

impl Summaries {
    fn collect(findings: &[Finding]) -> Result<Self> {
        let mut missing = Vec::new();
        let mut duplicates = Vec::new();
        let mut inconsistencies = Vec::new();
        for finding in findings {
            match &finding.payload {
                FindingPayload::MissingSummary {
                    total_missing_cells,
                    total_cells,
                    ..
                } => missing.push((*total_missing_cells, *total_cells)),
                FindingPayload::DuplicateSummary {
                    duplicate_fraction, ..
                } => duplicates.push(*duplicate_fraction),
                FindingPayload::InconsistencySummary {
                    inconsistent_cells,
                    checked_cells,
                    ..
                } => inconsistencies.push((*inconsistent_cells, *checked_cells)),
                _ => {}
            }
        }
        let (missing_cells, total_cells) = expect_one(missing, "missing-value summary")?;
        let duplicate_fraction = expect_one(duplicates, "duplicate summary")?;
        let (inconsistent_cells, checked_cells) =
            expect_one(inconsistencies, "inconsistency summary")?;
        Ok(Self {
            missing_cells,
            total_cells,
            duplicate_fraction,
            inconsistent_cells,
            checked_cells,
        })
    }
}

/// `100 * (1 - bad / total)`, with an empty denominator scoring perfect.
fn ratio_score(bad: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 100.0;
    }
    round_to((100.0 * (1.0 - bad / total)).clamp(0.0, 100.0), 2)
}

/// Turns a finding set into the four sub-scores and a graded overall score.
pub struct QualityScorer;

impl QualityScorer {
    pub fn score(
        shape: TableShape,
        findings: &[Finding],
        weights: &ScoreWeights,
    ) -> Result<QualityScore> {
        let summaries = Summaries::collect(findings)?;

        let completeness = ratio_score(summaries.missing_cells as f64, summaries.total_cells as f64);
        let uniqueness = ratio_score(summaries.duplicate_fraction, 1.0);
        let consistency = ratio_score(
            summaries.inconsistent_cells as f64,
            summaries.checked_cells as f64,
        );

        let invalid_columns: HashSet<&str> = findings
            .iter()
            .filter(|f| match f.payload {
                FindingPayload::MixedType { .. } => f.analyzer == AnalyzerKind::TypeInference,
                FindingPayload::Outliers { .. } => f.severity == Severity::High,
                _ => false,
            })
            .flat_map(|f| f.columns.iter().map(String::as_str))
            .collect();
        let validity = ratio_score(invalid_columns.len() as f64, shape.columns as f64);

        let total_weight = weights.total();
        let weighted = if total_weight > 0.0 {
            (completeness * weights.completeness
                + uniqueness * weights.uniqueness
                + consistency * weights.consistency
                + validity * weights.validity)
                / total_weight
        } else {
            0.0
        };
        let overall = weighted.round().clamp(0.0, 100.0) as u8;

        Ok(QualityScore {
            overall,
            completeness,
            uniqueness,
            consistency,
            validity,
            grade: Grade::from_score(overall),
        })
    }
}
