use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{DuplicateStrategy, ImputationStrategy};

// ============================================================================
// COLUMN PROFILES
// ============================================================================

/// Effective semantic type of a column, independent of its physical dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Numeric,
    Boolean,
    Date,
    Categorical,
    HighCardinality,
    Mixed,
    /// Every cell is missing
    Empty,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Categorical => "categorical",
            Self::HighCardinality => "high_cardinality",
            Self::Mixed => "mixed",
            Self::Empty => "empty",
        }
    }

    /// Whether values of this type are free text worth checking for formatting issues.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Categorical | Self::HighCardinality | Self::Mixed)
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub skewness: f64,
    pub zeros: usize,
    pub negatives: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Per-column profile produced by type inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Physical polars dtype, e.g. "i64" or "str"
    pub dtype: String,
    pub inferred_type: InferredType,
    /// Share of sampled values supporting the inferred type (0.0 - 1.0)
    pub confidence: f64,
    pub distinct_count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub identifier_like: bool,
    pub constant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericStats>,
    pub top_values: Vec<ValueCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// Float column whose values are all integral
    pub integer_valued: bool,
}

impl ColumnProfile {
    pub fn is_numeric(&self) -> bool {
        self.inferred_type == InferredType::Numeric
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

impl TableShape {
    pub fn cells(&self) -> usize {
        self.rows * self.columns
    }
}

// ============================================================================
// FINDINGS
// ============================================================================

/// Severity of a finding. `None` marks summaries and not-applicable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Grade a fraction against a medium and a high cutoff; any non-zero fraction is at least low.
    pub fn from_fraction(fraction: f64, medium: f64, high: f64) -> Self {
        if fraction <= 0.0 {
            Self::None
        } else if fraction >= high {
            Self::High
        } else if fraction >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// The analyzer that produced a finding. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    TypeInference,
    MissingValues,
    Duplicates,
    Outliers,
    Inconsistencies,
    Correlations,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeInference => "type_inference",
            Self::MissingValues => "missing_values",
            Self::Duplicates => "duplicates",
            Self::Outliers => "outliers",
            Self::Inconsistencies => "inconsistencies",
            Self::Correlations => "correlations",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationSuggestion {
    Mean,
    Median,
    Mode,
    /// Free text, identifiers, dates or mixed values
    Unsuitable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// Identical across every column
    Exact,
    /// Identical once identifier-like columns are ignored
    Subset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrregularityClass {
    CaseVariants,
    Whitespace,
    NonPrintable,
    SpecialCharacters,
}

impl IrregularityClass {
    pub const ALL: [IrregularityClass; 4] = [
        Self::CaseVariants,
        Self::Whitespace,
        Self::NonPrintable,
        Self::SpecialCharacters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseVariants => "case variants",
            Self::Whitespace => "stray whitespace",
            Self::NonPrintable => "non-printable characters",
            Self::SpecialCharacters => "special characters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IqrResult {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub sample_rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreResult {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub threshold: f64,
    pub count: usize,
    pub sample_rows: Vec<usize>,
}

/// Machine-readable body of a [`Finding`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingPayload {
    MixedType {
        numeric_fraction: f64,
        date_fraction: f64,
        boolean_fraction: f64,
        text_fraction: f64,
    },
    ConstantColumn {
        value: String,
    },
    TypeSuggestion {
        target: InferredType,
        reason: String,
    },
    MissingSummary {
        total_missing_cells: usize,
        total_cells: usize,
        columns_with_missing: usize,
        rows_with_any_missing: usize,
        complete_rows: usize,
    },
    MissingValues {
        missing_count: usize,
        missing_percentage: f64,
        suggested_imputation: ImputationSuggestion,
        drop_candidate: bool,
    },
    MissingnessPattern {
        co_missing_rows: usize,
        phi: f64,
    },
    DuplicateSummary {
        duplicate_rows: usize,
        duplicate_fraction: f64,
        group_count: usize,
        subset_duplicate_rows: usize,
        excluded_columns: Vec<String>,
    },
    DuplicateGroup {
        duplicate_kind: DuplicateKind,
        group_size: usize,
        row_indices: Vec<usize>,
    },
    Outliers {
        non_missing: usize,
        iqr: IqrResult,
        zscore: ZScoreResult,
        /// Rows flagged by the ensemble model that have a value in this column
        ensemble_rows: usize,
    },
    EnsembleOutliers {
        flagged_rows: usize,
        rows_scored: usize,
        fit_rows: usize,
        trees: usize,
        sample_rows: Vec<usize>,
    },
    Inconsistency {
        class: IrregularityClass,
        affected_rows: usize,
        affected_fraction: f64,
        examples: Vec<String>,
    },
    InconsistencySummary {
        inconsistent_cells: usize,
        checked_cells: usize,
        columns_checked: usize,
        columns_flagged: usize,
    },
    NumericCorrelation {
        pearson_r: f64,
        observations: usize,
        multicollinear: bool,
    },
    CategoricalAssociation {
        chi_square: f64,
        p_value: f64,
        degrees_of_freedom: usize,
        cramers_v: f64,
        observations: usize,
    },
    /// A method was skipped because its statistical preconditions failed
    NotApplicable {
        method: String,
        reason: String,
    },
}

/// One immutable observation emitted by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub analyzer: AnalyzerKind,
    pub columns: Vec<String>,
    pub severity: Severity,
    pub payload: FindingPayload,
}

impl Finding {
    pub fn new(
        analyzer: AnalyzerKind,
        columns: Vec<String>,
        severity: Severity,
        payload: FindingPayload,
    ) -> Self {
        Self {
            analyzer,
            columns,
            severity,
            payload,
        }
    }

    pub fn not_applicable(
        analyzer: AnalyzerKind,
        columns: Vec<String>,
        method: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            analyzer,
            columns,
            Severity::None,
            FindingPayload::NotApplicable {
                method: method.to_string(),
                reason: reason.into(),
            },
        )
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self.payload, FindingPayload::NotApplicable { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerFindings {
    pub analyzer: AnalyzerKind,
    pub findings: Vec<Finding>,
}

// ============================================================================
// SCORE & REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl Grade {
    pub fn from_score(overall: u8) -> Self {
        match overall {
            90..=u8::MAX => Self::Excellent,
            75..=89 => Self::Good,
            60..=74 => Self::Fair,
            40..=59 => Self::Poor,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall: u8,
    pub completeness: f64,
    pub uniqueness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum DriftTest {
    Numeric {
        ks_statistic: f64,
        p_value: f64,
        wasserstein: f64,
    },
    Categorical {
        psi: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub column: String,
    pub drifted: bool,
    pub result: DriftTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub columns: Vec<ColumnDrift>,
    pub drifted_columns: Vec<String>,
    /// Columns present in only one of the two tables
    pub unmatched_columns: Vec<String>,
}

/// The complete, read-only result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub shape: TableShape,
    pub memory_bytes: usize,
    pub columns: Vec<ColumnProfile>,
    pub findings: Vec<AnalyzerFindings>,
    pub quality_score: QualityScore,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftReport>,
}

impl Report {
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().flat_map(|group| group.findings.iter())
    }

    pub fn findings_for(&self, analyzer: AnalyzerKind) -> impl Iterator<Item = &Finding> {
        self.all_findings()
            .filter(move |finding| finding.analyzer == analyzer)
    }

    pub fn profile(&self, column: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|profile| profile.name == column)
    }

    /// Severity of the dataset-level duplicate summary.
    pub fn duplicate_severity(&self) -> Severity {
        self.findings_for(AnalyzerKind::Duplicates)
            .find_map(|finding| match finding.payload {
                FindingPayload::DuplicateSummary { .. } => Some(finding.severity),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Analysis-time IQR result for a column, when the method applied.
    pub fn iqr_result(&self, column: &str) -> Option<&IqrResult> {
        self.findings_for(AnalyzerKind::Outliers)
            .find_map(|finding| match &finding.payload {
                FindingPayload::Outliers { iqr, .. }
                    if finding.columns.first().map(String::as_str) == Some(column) =>
                {
                    Some(iqr)
                }
                _ => None,
            })
    }
}

// ============================================================================
// CLEANING SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub strategy: ImputationStrategy,
    pub fill_value: String,
    pub cells: usize,
}

/// What one cleaning run changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
    pub duplicate_rows_removed: usize,
    pub outlier_rows_removed: usize,
    pub duplicate_strategy_applied: DuplicateStrategy,
    pub rows_flagged_duplicate: usize,
    pub cells_imputed: usize,
    /// Present cells of numeric columns that did not parse and were filled
    pub values_coerced: usize,
    pub imputations: Vec<ImputationRecord>,
    /// Columns with missing cells left untouched (no suitable strategy)
    pub skipped_columns: Vec<String>,
    pub values_clipped: usize,
    pub values_flagged_outlier: usize,
    pub values_normalized: usize,
    pub columns_dropped: Vec<String>,
}
