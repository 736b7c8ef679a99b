//! Exact and identifier-insensitive duplicate detection.

use super::{AnalysisContext, Analyzer};
use crate::types::{AnalyzerKind, DuplicateKind, Finding, FindingPayload, Severity};
use crate::utils::{round_to, text_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const MISSING_SENTINEL: &str = "\u{0}";
const FIELD_SEPARATOR: char = '\u{1f}';

/// Render each row of the selected columns as a comparable signature.
///
/// Missing cells render as a sentinel so they never compare equal to an
/// empty string.
pub(crate) fn row_signatures(df: &DataFrame, columns: &[&str]) -> PolarsResult<Vec<String>> {
    let mut signatures = vec![String::new(); df.height()];
    for (position, name) in columns.iter().enumerate() {
        let texts = text_values(df.column(name)?.as_materialized_series())?;
        for (signature, text) in signatures.iter_mut().zip(texts) {
            if position > 0 {
                signature.push(FIELD_SEPARATOR);
            }
            signature.push_str(text.as_deref().unwrap_or(MISSING_SENTINEL));
        }
    }
    Ok(signatures)
}

/// Groups of row indices sharing a signature, for groups of two or more,
/// in order of first occurrence.
pub(crate) fn duplicate_groups(signatures: &[String]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, signature) in signatures.iter().enumerate() {
        match slots.get(signature.as_str()) {
            Some(&slot) => groups[slot].push(row),
            None => {
                slots.insert(signature.as_str(), groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups.retain(|group| group.len() > 1);
    groups
}

/// `true` for the first occurrence of every signature.
pub(crate) fn first_occurrence_mask(signatures: &[String]) -> Vec<bool> {
    let mut seen = HashSet::with_capacity(signatures.len());
    signatures
        .iter()
        .map(|signature| seen.insert(signature.as_str()))
        .collect()
}

fn redundant_rows(groups: &[Vec<usize>]) -> usize {
    groups.iter().map(|group| group.len() - 1).sum()
}

pub struct DuplicateAnalyzer;

impl Analyzer for DuplicateAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Duplicates
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let config = ctx.config;
        let rows = ctx.rows();
        let names: Vec<&str> = ctx.df.get_column_names().into_iter().map(|n| n.as_str()).collect();

        let signatures = row_signatures(ctx.df, &names)?;
        let exact_groups = duplicate_groups(&signatures);
        let duplicate_rows = redundant_rows(&exact_groups);
        let duplicate_fraction = if rows > 0 {
            duplicate_rows as f64 / rows as f64
        } else {
            0.0
        };
        let severity = Severity::from_fraction(
            duplicate_fraction,
            config.duplicate_low_fraction,
            config.duplicate_high_fraction,
        );

        let excluded: Vec<String> = ctx
            .profiles
            .iter()
            .filter(|p| p.identifier_like)
            .map(|p| p.name.clone())
            .collect();

        let mut subset_groups = Vec::new();
        if !excluded.is_empty() && excluded.len() < names.len() {
            let key: Vec<&str> = names
                .iter()
                .copied()
                .filter(|name| !excluded.iter().any(|e| e.as_str() == *name))
                .collect();
            let subset_signatures = row_signatures(ctx.df, &key)?;
            subset_groups = duplicate_groups(&subset_signatures)
                .into_iter()
                .filter(|group| {
                    let first = &signatures[group[0]];
                    group.iter().any(|&row| &signatures[row] != first)
                })
                .collect();
        }

        let mut findings = vec![Finding::new(
            AnalyzerKind::Duplicates,
            Vec::new(),
            severity,
            FindingPayload::DuplicateSummary {
                duplicate_rows,
                duplicate_fraction: round_to(duplicate_fraction, 6),
                group_count: exact_groups.len(),
                subset_duplicate_rows: redundant_rows(&subset_groups),
                excluded_columns: excluded.clone(),
            },
        )];

        let reported = exact_groups
            .iter()
            .map(|group| (DuplicateKind::Exact, group))
            .chain(subset_groups.iter().map(|group| (DuplicateKind::Subset, group)));
        let mut exact_reported = 0;
        let mut subset_reported = 0;
        for (kind, group) in reported {
            let counter = match kind {
                DuplicateKind::Exact => &mut exact_reported,
                DuplicateKind::Subset => &mut subset_reported,
            };
            if *counter >= config.max_duplicate_groups {
                continue;
            }
            *counter += 1;
            let columns = match kind {
                DuplicateKind::Exact => Vec::new(),
                DuplicateKind::Subset => excluded.clone(),
            };
            findings.push(Finding::new(
                AnalyzerKind::Duplicates,
                columns,
                Severity::Low,
                FindingPayload::DuplicateGroup {
                    duplicate_kind: kind,
                    group_size: group.len(),
                    row_indices: group.iter().copied().take(config.sample_size).collect(),
                },
            ));
        }

        debug!(
            "Duplicates: {} exact groups ({} redundant rows), {} subset groups",
            exact_groups.len(),
            duplicate_rows,
            subset_groups.len()
        );
        Ok(findings)
    }
}
