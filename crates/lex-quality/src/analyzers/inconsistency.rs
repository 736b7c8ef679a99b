//! Formatting irregularities in text columns.

use super::{AnalysisContext, Analyzer};
use crate::config::AnalysisConfig;
use crate::types::{
    AnalyzerKind, ColumnProfile, Finding, FindingPayload, InferredType, IrregularityClass,
    Severity,
};
use crate::utils::{is_string_dtype, round_to, text_values};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Per-row irregularities found in one column.
struct ColumnScan {
    /// Indexed like `IrregularityClass::ALL`
    affected: [Vec<usize>; 4],
    examples: [Vec<String>; 4],
    inconsistent_cells: usize,
    checked_cells: usize,
}

fn class_slot(class: IrregularityClass) -> usize {
    match class {
        IrregularityClass::CaseVariants => 0,
        IrregularityClass::Whitespace => 1,
        IrregularityClass::NonPrintable => 2,
        IrregularityClass::SpecialCharacters => 3,
    }
}

fn allowed_chars<'a>(profile: &ColumnProfile, config: &'a AnalysisConfig) -> &'a str {
    match profile.inferred_type {
        InferredType::Categorical => &config.categorical_allowed_chars,
        _ => &config.text_allowed_chars,
    }
}

fn has_special_characters(value: &str, allowed: &str) -> bool {
    value.chars().any(|c| {
        !(c.is_alphanumeric() || c.is_whitespace() || c.is_control() || allowed.contains(c))
    })
}

/// Rows holding a spelling that differs only by case from a more common one.
///
/// Within each lower-cased group the most frequent spelling is dominant;
/// ties go to the smallest spelling.
fn case_variant_rows(texts: &[Option<String>]) -> (Vec<usize>, Vec<String>) {
    let mut groups: HashMap<String, BTreeMap<&str, usize>> = HashMap::new();
    for text in texts.iter().flatten() {
        *groups
            .entry(text.to_lowercase())
            .or_default()
            .entry(text.as_str())
            .or_insert(0) += 1;
    }

    let mut dominant: HashMap<String, &str> = HashMap::new();
    let mut variants: Vec<String> = Vec::new();
    for (key, spellings) in &groups {
        if spellings.len() < 2 {
            continue;
        }
        let mut best: Option<(&str, usize)> = None;
        for (&spelling, &count) in spellings {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((spelling, count));
            }
        }
        if let Some((spelling, _)) = best {
            dominant.insert(key.clone(), spelling);
        }
        variants.extend(spellings.keys().map(|s| s.to_string()));
    }
    variants.sort();

    let rows = texts
        .iter()
        .enumerate()
        .filter_map(|(row, text)| {
            let text = text.as_deref()?;
            let winner = dominant.get(&text.to_lowercase())?;
            (*winner != text).then_some(row)
        })
        .collect();
    (rows, variants)
}

fn scan_column(texts: &[Option<String>], allowed: &str, sample_size: usize) -> ColumnScan {
    let (case_rows, case_examples) = case_variant_rows(texts);
    let mut scan = ColumnScan {
        affected: [case_rows, Vec::new(), Vec::new(), Vec::new()],
        examples: [
            case_examples.into_iter().take(sample_size).collect(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ],
        inconsistent_cells: 0,
        checked_cells: 0,
    };
    let mut case_flags = vec![false; texts.len()];
    for &row in &scan.affected[0] {
        case_flags[row] = true;
    }

    for (row, text) in texts.iter().enumerate() {
        let Some(value) = text.as_deref() else {
            continue;
        };
        scan.checked_cells += 1;
        let flags = [
            (IrregularityClass::Whitespace, value != value.trim()),
            (
                IrregularityClass::NonPrintable,
                value.chars().any(char::is_control),
            ),
            (
                IrregularityClass::SpecialCharacters,
                has_special_characters(value, allowed),
            ),
        ];
        let mut irregular = case_flags[row];
        for (class, hit) in flags {
            if !hit {
                continue;
            }
            irregular = true;
            let slot = class_slot(class);
            scan.affected[slot].push(row);
            if scan.examples[slot].len() < sample_size
                && !scan.examples[slot].iter().any(|e| e == value)
            {
                scan.examples[slot].push(value.to_string());
            }
        }
        if irregular {
            scan.inconsistent_cells += 1;
        }
    }
    scan
}

pub struct InconsistencyAnalyzer;

impl Analyzer for InconsistencyAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Inconsistencies
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let config = ctx.config;
        let mut findings = Vec::new();
        let (mut inconsistent_cells, mut checked_cells) = (0, 0);
        let (mut columns_checked, mut columns_flagged) = (0, 0);

        for profile in ctx.profiles.iter().filter(|p| p.inferred_type.is_textual()) {
            let series = ctx.series(&profile.name)?;
            if !is_string_dtype(series.dtype()) {
                continue;
            }
            let texts = text_values(series)?;
            let scan = scan_column(&texts, allowed_chars(profile, config), config.sample_size);

            columns_checked += 1;
            checked_cells += scan.checked_cells;
            inconsistent_cells += scan.inconsistent_cells;
            if scan.inconsistent_cells > 0 {
                columns_flagged += 1;
            }

            for class in IrregularityClass::ALL {
                let slot = class_slot(class);
                let affected_rows = scan.affected[slot].len();
                if affected_rows == 0 {
                    continue;
                }
                let fraction = affected_rows as f64 / scan.checked_cells.max(1) as f64;
                findings.push(Finding::new(
                    AnalyzerKind::Inconsistencies,
                    vec![profile.name.clone()],
                    Severity::from_fraction(
                        fraction,
                        config.inconsistency_medium_fraction,
                        config.inconsistency_high_fraction,
                    ),
                    FindingPayload::Inconsistency {
                        class,
                        affected_rows,
                        affected_fraction: round_to(fraction, 4),
                        examples: scan.examples[slot].clone(),
                    },
                ));
            }
        }

        findings.insert(
            0,
            Finding::new(
                AnalyzerKind::Inconsistencies,
                Vec::new(),
                Severity::None,
                FindingPayload::InconsistencySummary {
                    inconsistent_cells,
                    checked_cells,
                    columns_checked,
                    columns_flagged,
                },
            ),
        );

        debug!(
            "Inconsistencies: {} of {} cells in {} columns",
            inconsistent_cells, checked_cells, columns_checked
        );
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use polars::prelude::*;

    fn texts(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_case_variants_flag_non_dominant_spelling() {
        let (rows, examples) = case_variant_rows(&texts(&["Paris", "paris", "Paris", "Rome"]));
        assert_eq!(rows, vec![1]);
        assert_eq!(examples, vec!["Paris".to_string(), "paris".to_string()]);
    }

    #[test]
    fn test_case_variant_tie_prefers_smallest_spelling() {
        let (rows, _) = case_variant_rows(&texts(&["b", "B"]));
        // "B" < "b", so the lowercase spelling is the variant
        assert_eq!(rows, vec![0]);
    }

    #[test]
    fn test_special_character_policy() {
        assert!(!has_special_characters("O'Brien & Sons", "-_.,&/'()"));
        assert!(has_special_characters("50%", "-_.,&/'()"));
        assert!(!has_special_characters("50%", "-_.,&/'()@:#+%!?\""));
        assert!(!has_special_characters("café", ""));
    }

    #[test]
    fn test_cells_counted_once() {
        let scan = scan_column(&texts(&[" a$ ", "b", "c"]), "", 5);
        assert_eq!(scan.checked_cells, 3);
        assert_eq!(scan.inconsistent_cells, 1);
        assert_eq!(scan.affected[class_slot(IrregularityClass::Whitespace)], vec![0]);
        assert_eq!(scan.affected[class_slot(IrregularityClass::SpecialCharacters)], vec![0]);
    }

    #[test]
    fn test_analyzer_findings_and_summary() {
        let df = df!(
            "city" => ["Paris", "paris", "Paris", " Rome", "Rome", "Oslo\t"],
            "amount" => [1i64, 2, 3, 4, 5, 6]
        )
        .unwrap();
        let config = AnalysisConfig::default();
        let profile = DataProfiler::profile_table(&df, &config).unwrap();
        let ctx = AnalysisContext::new(&df, &profile.columns, &config);
        let findings = InconsistencyAnalyzer.analyze(&ctx).unwrap();

        assert!(matches!(
            findings[0].payload,
            FindingPayload::InconsistencySummary {
                inconsistent_cells: 3,
                checked_cells: 6,
                columns_checked: 1,
                columns_flagged: 1,
            }
        ));
        let classes: Vec<IrregularityClass> = findings[1..]
            .iter()
            .map(|f| match f.payload {
                FindingPayload::Inconsistency { class, .. } => class,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            classes,
            vec![
                IrregularityClass::CaseVariants,
                IrregularityClass::Whitespace,
                IrregularityClass::NonPrintable,
            ]
        );
    }
}
