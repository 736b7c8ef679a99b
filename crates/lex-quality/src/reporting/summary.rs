//! Human-readable rendering of reports and cleaning summaries.

use crate::types::{
    CleaningSummary, DriftTest, DuplicateKind, Finding, FindingPayload, Report, Severity,
};
use std::fmt::Write;

/// One-line description of a finding.
pub fn describe_finding(finding: &Finding) -> String {
    let columns = finding.columns.join(", ");
    match &finding.payload {
        FindingPayload::MixedType {
            numeric_fraction,
            text_fraction,
            ..
        } => format!(
            "{columns}: mixed types ({:.0}% numeric, {:.0}% text)",
            numeric_fraction * 100.0,
            text_fraction * 100.0
        ),
        FindingPayload::ConstantColumn { value } => {
            format!("{columns}: constant column ('{value}')")
        }
        FindingPayload::TypeSuggestion { target, reason } => {
            format!("{columns}: could be {} ({reason})", target.as_str())
        }
        FindingPayload::MissingSummary {
            total_missing_cells,
            total_cells,
            columns_with_missing,
            ..
        } => format!(
            "{total_missing_cells} of {total_cells} cells missing across {columns_with_missing} columns"
        ),
        FindingPayload::MissingValues {
            missing_count,
            missing_percentage,
            drop_candidate,
            ..
        } => format!(
            "{columns}: {missing_count} missing ({missing_percentage:.1}%){}",
            if *drop_candidate { ", drop candidate" } else { "" }
        ),
        FindingPayload::MissingnessPattern {
            co_missing_rows,
            phi,
        } => format!("{columns}: missing together in {co_missing_rows} rows (phi {phi:.2})"),
        FindingPayload::DuplicateSummary {
            duplicate_rows,
            duplicate_fraction,
            group_count,
            ..
        } => format!(
            "{duplicate_rows} exact duplicate rows ({:.1}%) in {group_count} groups",
            duplicate_fraction * 100.0
        ),
        FindingPayload::DuplicateGroup {
            duplicate_kind,
            group_size,
            row_indices,
        } => {
            let kind = match duplicate_kind {
                DuplicateKind::Exact => "exact",
                DuplicateKind::Subset => "near",
            };
            format!("{kind} duplicate group of {group_size} rows {row_indices:?}")
        }
        FindingPayload::Outliers {
            iqr, zscore, ..
        } => format!(
            "{columns}: {} IQR outliers outside [{:.2}, {:.2}], {} beyond {} sd",
            iqr.count, iqr.lower_bound, iqr.upper_bound, zscore.count, zscore.threshold
        ),
        FindingPayload::EnsembleOutliers {
            flagged_rows,
            rows_scored,
            ..
        } => format!("{flagged_rows} of {rows_scored} rows isolated by the multivariate model"),
        FindingPayload::Inconsistency {
            class,
            affected_rows,
            examples,
            ..
        } => format!(
            "{columns}: {affected_rows} rows with {} {examples:?}",
            class.as_str()
        ),
        FindingPayload::InconsistencySummary {
            inconsistent_cells,
            checked_cells,
            ..
        } => format!("{inconsistent_cells} of {checked_cells} text cells irregular"),
        FindingPayload::NumericCorrelation {
            pearson_r,
            multicollinear,
            ..
        } => format!(
            "{columns}: r = {pearson_r:.3}{}",
            if *multicollinear { " (multicollinear)" } else { "" }
        ),
        FindingPayload::CategoricalAssociation {
            cramers_v, p_value, ..
        } => format!("{columns}: Cramér's V = {cramers_v:.3} (p = {p_value:.4})"),
        FindingPayload::NotApplicable { method, reason } => {
            format!("{columns}: {method} not applicable ({reason})")
        }
    }
}

/// Multi-line summary of a report: score, issues by analyzer, drift.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let score = &report.quality_score;

    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "DATA QUALITY REPORT");
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(
        out,
        "Shape: {} rows x {} columns (~{} bytes)",
        report.shape.rows, report.shape.columns, report.memory_bytes
    );
    let _ = writeln!(out, "Quality score: {} ({:?})", score.overall, score.grade);
    let _ = writeln!(
        out,
        "  completeness {:.1} | uniqueness {:.1} | consistency {:.1} | validity {:.1}",
        score.completeness, score.uniqueness, score.consistency, score.validity
    );

    for group in &report.findings {
        let issues: Vec<&Finding> = group
            .findings
            .iter()
            .filter(|f| f.severity > Severity::None)
            .collect();
        if issues.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({})", group.analyzer, issues.len());
        for finding in issues {
            let _ = writeln!(
                out,
                "  [{:?}] {}",
                finding.severity,
                describe_finding(finding)
            );
        }
    }

    if let Some(drift) = &report.drift {
        let _ = writeln!(out, "\nDrift: {} columns drifted", drift.drifted_columns.len());
        for column in drift.columns.iter().filter(|c| c.drifted) {
            let detail = match &column.result {
                DriftTest::Numeric { p_value, .. } => format!("KS p = {p_value:.4}"),
                DriftTest::Categorical { psi, .. } => format!("PSI = {psi:.3}"),
            };
            let _ = writeln!(out, "  {}: {}", column.column, detail);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &report.warnings {
            let _ = writeln!(out, "  ! {warning}");
        }
    }
    out
}

pub fn render_cleaning(summary: &CleaningSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nCleaning:");
    let _ = writeln!(
        out,
        "  Rows: {} -> {} ({} duplicates, {} outliers removed)",
        summary.rows_before,
        summary.rows_after,
        summary.duplicate_rows_removed,
        summary.outlier_rows_removed
    );
    let _ = writeln!(
        out,
        "  Duplicates: {} ({} flagged)",
        summary.duplicate_strategy_applied, summary.rows_flagged_duplicate
    );
    for record in &summary.imputations {
        let _ = writeln!(
            out,
            "  Imputed {} cells of '{}' with {} ({})",
            record.cells, record.column, record.fill_value, record.strategy
        );
    }
    if summary.values_coerced > 0 {
        let _ = writeln!(
            out,
            "  Replaced {} unparseable values in numeric columns",
            summary.values_coerced
        );
    }
    if !summary.skipped_columns.is_empty() {
        let _ = writeln!(out, "  Not imputed: {}", summary.skipped_columns.join(", "));
    }
    if summary.values_clipped + summary.values_flagged_outlier > 0 {
        let _ = writeln!(
            out,
            "  Outliers: {} clipped, {} flagged",
            summary.values_clipped, summary.values_flagged_outlier
        );
    }
    if summary.values_normalized > 0 {
        let _ = writeln!(out, "  Normalized {} text values", summary.values_normalized);
    }
    if !summary.columns_dropped.is_empty() {
        let _ = writeln!(out, "  Dropped: {}", summary.columns_dropped.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalyzerKind;

    #[test]
    fn test_describe_not_applicable() {
        let finding = Finding::not_applicable(
            AnalyzerKind::Outliers,
            vec!["age".to_string()],
            "iqr_zscore",
            "constant column",
        );
        assert_eq!(
            describe_finding(&finding),
            "age: iqr_zscore not applicable (constant column)"
        );
    }

    #[test]
    fn test_render_cleaning() {
        let summary = CleaningSummary {
            rows_before: 10,
            rows_after: 8,
            duplicate_rows_removed: 2,
            skipped_columns: vec!["notes".to_string()],
            ..CleaningSummary::default()
        };
        let text = render_cleaning(&summary);
        assert!(text.contains("Rows: 10 -> 8 (2 duplicates, 0 outliers removed)"));
        assert!(text.contains("Not imputed: notes"));
    }
}
