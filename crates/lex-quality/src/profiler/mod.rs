//! Column profiling and type inference.
//!
//! Every analyzer works from the profiles produced here:
//! - Semantic type inference with a confidence value
//! - Distinct/missing counts, numeric statistics and top values
//! - Identifier and constant-column detection
//! - Type findings (mixed types, constant columns, conversion suggestions)

mod statistics;
mod type_inference;

use crate::config::AnalysisConfig;
use crate::types::{AnalyzerKind, ColumnProfile, Finding, FindingPayload, InferredType, Severity};
use crate::utils::{is_float_dtype, is_string_dtype, numeric_values, round_to, text_values};
use anyhow::Result;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

pub(crate) use statistics::is_identifier_name;
use type_inference::infer_type;

/// Profiles of every column plus the findings and warnings type inference raised.
#[derive(Debug, Clone, Default)]
pub struct TableProfile {
    pub columns: Vec<ColumnProfile>,
    pub findings: Vec<Finding>,
    pub warnings: Vec<String>,
}

/// Data profiler for per-column type inference and statistics.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile every column of a table, preserving column order.
    ///
    /// A table without columns yields an empty profile.
    pub fn profile_table(df: &DataFrame, config: &AnalysisConfig) -> Result<TableProfile> {
        let rows = df.height();
        let profiled: Vec<(ColumnProfile, Vec<Finding>)> = df
            .get_columns()
            .par_iter()
            .map(|column| Self::profile_column(column.as_materialized_series(), rows, config))
            .collect::<Result<_>>()?;

        let mut profile = TableProfile::default();
        for (column, findings) in profiled {
            profile.warnings.extend(Self::column_warnings(&column, config));
            profile.findings.extend(findings);
            profile.columns.push(column);
        }

        debug!(
            "Profiled {} columns ({} type findings)",
            profile.columns.len(),
            profile.findings.len()
        );
        Ok(profile)
    }

    fn profile_column(
        series: &Series,
        rows: usize,
        config: &AnalysisConfig,
    ) -> Result<(ColumnProfile, Vec<Finding>)> {
        let name = series.name().to_string();
        let texts = text_values(series)?;
        let missing_count = texts.iter().filter(|v| v.is_none()).count();
        let distinct: HashSet<&str> = texts.iter().flatten().map(String::as_str).collect();
        let distinct_count = distinct.len();

        let guess = infer_type(series, &texts, distinct_count, config);

        let numeric_cells: Vec<f64> = if guess.inferred_type == InferredType::Numeric {
            numeric_values(series)?.into_iter().flatten().collect()
        } else {
            Vec::new()
        };
        let numeric = statistics::numeric_stats(&numeric_cells);
        let integer_valued = is_float_dtype(series.dtype())
            && !numeric_cells.is_empty()
            && numeric_cells.iter().all(|v| v.fract() == 0.0);

        let top_values = if guess.inferred_type == InferredType::Numeric {
            Vec::new()
        } else {
            statistics::top_values(&texts, config.top_k)
        };

        let unique_ratio = if rows > 0 {
            distinct_count as f64 / rows as f64
        } else {
            0.0
        };
        let identifier_like = unique_ratio >= config.identifier_unique_ratio
            && (is_identifier_name(&name) || guess.inferred_type == InferredType::HighCardinality);

        let profile = ColumnProfile {
            name: name.clone(),
            dtype: series.dtype().to_string(),
            inferred_type: guess.inferred_type,
            confidence: round_to(guess.confidence, 4),
            distinct_count,
            missing_count,
            missing_percentage: if rows > 0 {
                round_to(missing_count as f64 / rows as f64 * 100.0, 2)
            } else {
                0.0
            },
            identifier_like,
            constant: distinct_count == 1,
            numeric,
            top_values,
            date_format: guess.date_format.clone(),
            integer_valued,
        };

        let mut findings = Vec::new();
        let columns = vec![name.clone()];

        if let Some(fractions) = guess.fractions
            && guess.inferred_type == InferredType::Mixed
        {
            findings.push(Finding::new(
                AnalyzerKind::TypeInference,
                columns.clone(),
                Severity::Medium,
                FindingPayload::MixedType {
                    numeric_fraction: round_to(fractions.numeric, 4),
                    date_fraction: round_to(fractions.date, 4),
                    boolean_fraction: round_to(fractions.boolean, 4),
                    text_fraction: round_to(fractions.text, 4),
                },
            ));
        }

        if profile.constant && rows > 1 {
            let value = distinct.iter().next().map(|v| v.to_string()).unwrap_or_default();
            findings.push(Finding::new(
                AnalyzerKind::TypeInference,
                columns.clone(),
                Severity::Low,
                FindingPayload::ConstantColumn { value },
            ));
        }

        if is_string_dtype(series.dtype())
            && matches!(
                guess.inferred_type,
                InferredType::Numeric | InferredType::Date | InferredType::Boolean
            )
        {
            findings.push(Finding::new(
                AnalyzerKind::TypeInference,
                columns.clone(),
                Severity::Low,
                FindingPayload::TypeSuggestion {
                    target: guess.inferred_type,
                    reason: format!("text column holds {} values", guess.inferred_type),
                },
            ));
        } else if integer_valued {
            findings.push(Finding::new(
                AnalyzerKind::TypeInference,
                columns,
                Severity::Low,
                FindingPayload::TypeSuggestion {
                    target: InferredType::Numeric,
                    reason: "float column holds only integral values".to_string(),
                },
            ));
        }

        Ok((profile, findings))
    }

    fn column_warnings(profile: &ColumnProfile, config: &AnalysisConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        if profile.constant {
            warnings.push(format!("Column '{}' has a single distinct value", profile.name));
        }
        if profile.identifier_like {
            warnings.push(format!("Column '{}' looks like an identifier", profile.name));
        }
        if profile.missing_percentage >= config.missing_drop_pct && profile.missing_count > 0 {
            warnings.push(format!(
                "Column '{}' is {:.1}% missing",
                profile.name, profile.missing_percentage
            ));
        }
        warnings
    }
}
