//! Configuration types for analysis, cleaning and the job store.
//!
//! Every analyzer threshold lives here as a named field with a default, and
//! every cleaning strategy is a closed enum parsed once at the boundary.
//! Configurations are built through builders whose `build()` validates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Cleaning Strategies
// =============================================================================

/// How duplicate rows are treated during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    /// Leave duplicate rows untouched
    Keep,
    /// Add an `_is_duplicate` marker column
    Flag,
    /// Drop every occurrence after the first
    Remove,
    /// Remove when the analyzed duplicate severity is high, otherwise flag
    #[default]
    Auto,
}

/// How missing cells are filled during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Median of the non-missing values
    #[default]
    Median,
    /// Mean of the non-missing values
    Mean,
    /// Most frequent value
    Mode,
    /// Constant zero
    Zero,
}

impl ImputationStrategy {
    /// Whether the strategy needs a numeric column.
    pub fn requires_numeric(&self) -> bool {
        !matches!(self, Self::Mode)
    }
}

/// How IQR outliers are treated during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierStrategy {
    /// Clamp values to the analysis-time IQR bounds
    #[default]
    Clip,
    /// Add a `<column>_is_outlier` marker column
    Flag,
    /// Drop rows holding a value outside the bounds
    Remove,
}

macro_rules! strategy_names {
    ($ty:ty, $axis:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical lowercase name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ConfigValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(ConfigValidationError::UnknownStrategy {
                        axis: $axis.to_string(),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

strategy_names!(DuplicateStrategy, "duplicates", {
    Keep => "keep",
    Flag => "flag",
    Remove => "remove",
    Auto => "auto",
});

strategy_names!(ImputationStrategy, "imputation", {
    Median => "median",
    Mean => "mean",
    Mode => "mode",
    Zero => "zero",
});

strategy_names!(OutlierStrategy, "outliers", {
    Clip => "clip",
    Flag => "flag",
    Remove => "remove",
});

// =============================================================================
// Score Weights
// =============================================================================

/// Weights of the four sub-scores in the overall quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub completeness: f64,
    pub uniqueness: f64,
    pub consistency: f64,
    pub validity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            completeness: 0.25,
            uniqueness: 0.25,
            consistency: 0.25,
            validity: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.completeness + self.uniqueness + self.consistency + self.validity
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        let all = [
            self.completeness,
            self.uniqueness,
            self.consistency,
            self.validity,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || self.total() <= 0.0 {
            return Err(ConfigValidationError::InvalidWeights(format!(
                "weights must be non-negative with a positive sum, got {all:?}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

/// Thresholds and limits used by type inference, the analyzers and the scorer.
///
/// Fractions are in `0.0..=1.0`; fields ending in `_pct` are percentages.
/// Missing fields in JSON fall back to the defaults.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .zscore_threshold(2.5)
///     .duplicate_thresholds(0.02, 0.10)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Non-missing values sampled per column for type inference. Default: 1000
    pub type_sample_size: usize,
    /// Share of values that must parse as numbers. Default: 0.95
    pub numeric_parse_ratio: f64,
    /// Share of values a date pattern must match. Default: 0.8
    pub date_match_ratio: f64,
    /// Distinct/row ratio above which strings are high-cardinality. Default: 0.8
    pub high_cardinality_ratio: f64,
    /// Minimum distinct values for high-cardinality. Default: 20
    pub high_cardinality_min_distinct: usize,
    /// Minimum share of a value class to count towards a mixed type. Default: 0.1
    pub mixed_min_fraction: f64,
    /// Unique ratio above which a column may be identifier-like. Default: 0.95
    pub identifier_unique_ratio: f64,
    /// Number of most frequent values kept per profile. Default: 10
    pub top_k: usize,

    /// Missing percentage above which a finding is raised. Default: 0.0
    pub missing_low_pct: f64,
    /// Missing percentage for a warning. Default: 5.0
    pub missing_medium_pct: f64,
    /// Missing percentage for a severe finding. Default: 20.0
    pub missing_high_pct: f64,
    /// Missing percentage at which dropping the column is suggested. Default: 50.0
    pub missing_drop_pct: f64,
    /// Absolute skewness below which a distribution counts as symmetric. Default: 0.5
    pub symmetric_skew_limit: f64,
    /// Phi coefficient between null indicators for a pattern finding. Default: 0.7
    pub missingness_correlation_threshold: f64,

    /// Duplicate-row fraction separating low from medium. Default: 0.01
    pub duplicate_low_fraction: f64,
    /// Duplicate-row fraction for high severity. Default: 0.05
    pub duplicate_high_fraction: f64,
    /// Maximum duplicate groups reported per kind. Default: 50
    pub max_duplicate_groups: usize,

    /// Row indices or example values kept per finding. Default: 5
    pub sample_size: usize,

    /// IQR fence multiplier. Default: 1.5
    pub iqr_multiplier: f64,
    /// Absolute z-score above which a value is a candidate. Default: 3.0
    pub zscore_threshold: f64,
    /// Minimum non-missing values for IQR and z-score. Default: 4
    pub outlier_min_rows: usize,
    /// Candidate fraction for medium severity. Default: 0.05
    pub outlier_medium_fraction: f64,
    /// Candidate fraction for high severity. Default: 0.10
    pub outlier_high_fraction: f64,

    /// Trees in the isolation forest. Default: 100
    pub forest_trees: usize,
    /// Rows sampled per tree. Default: 256
    pub forest_subsample: usize,
    /// Maximum rows used to fit the forest. Default: 10000
    pub forest_max_fit_rows: usize,
    /// Minimum complete rows to fit the forest. Default: 10
    pub forest_min_rows: usize,
    /// Anomaly score above which a row is an outlier. Default: 0.5
    pub forest_score_threshold: f64,
    /// Seed for every randomized step. Default: 42
    pub random_seed: u64,

    /// Affected fraction for a medium inconsistency. Default: 0.05
    pub inconsistency_medium_fraction: f64,
    /// Affected fraction for a high inconsistency. Default: 0.20
    pub inconsistency_high_fraction: f64,
    /// Punctuation allowed in categorical values.
    pub categorical_allowed_chars: String,
    /// Punctuation allowed in free-text values.
    pub text_allowed_chars: String,

    /// Absolute Pearson r for a correlation finding. Default: 0.7
    pub correlation_threshold: f64,
    /// Absolute Pearson r flagged as multicollinearity. Default: 0.9
    pub multicollinearity_threshold: f64,
    /// Maximum distinct values for chi-square columns. Default: 50
    pub max_categories: usize,
    /// Maximum categorical columns paired. Default: 10
    pub max_categorical_columns: usize,
    /// Smallest expected contingency count for a valid test. Default: 5.0
    pub min_expected_count: f64,
    /// Cramér's V for an association finding. Default: 0.3
    pub cramers_v_threshold: f64,
    /// Cramér's V for a strong association. Default: 0.5
    pub strong_association_threshold: f64,
    /// p-value cutoff for the statistical tests. Default: 0.05
    pub significance_level: f64,

    /// PSI above which a categorical column has drifted. Default: 0.2
    pub psi_threshold: f64,

    /// Largest accepted table height. Default: 1_000_000
    pub max_rows: usize,
    /// Largest accepted table width. Default: 1000
    pub max_columns: usize,

    /// Sub-score weights for the overall score.
    pub score_weights: ScoreWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            type_sample_size: 1000,
            numeric_parse_ratio: 0.95,
            date_match_ratio: 0.8,
            high_cardinality_ratio: 0.8,
            high_cardinality_min_distinct: 20,
            mixed_min_fraction: 0.1,
            identifier_unique_ratio: 0.95,
            top_k: 10,
            missing_low_pct: 0.0,
            missing_medium_pct: 5.0,
            missing_high_pct: 20.0,
            missing_drop_pct: 50.0,
            symmetric_skew_limit: 0.5,
            missingness_correlation_threshold: 0.7,
            duplicate_low_fraction: 0.01,
            duplicate_high_fraction: 0.05,
            max_duplicate_groups: 50,
            sample_size: 5,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
            outlier_min_rows: 4,
            outlier_medium_fraction: 0.05,
            outlier_high_fraction: 0.10,
            forest_trees: 100,
            forest_subsample: 256,
            forest_max_fit_rows: 10_000,
            forest_min_rows: 10,
            forest_score_threshold: 0.5,
            random_seed: 42,
            inconsistency_medium_fraction: 0.05,
            inconsistency_high_fraction: 0.20,
            categorical_allowed_chars: "-_.,&/'()".to_string(),
            text_allowed_chars: "-_.,&/'()@:#+%!?\"".to_string(),
            correlation_threshold: 0.7,
            multicollinearity_threshold: 0.9,
            max_categories: 50,
            max_categorical_columns: 10,
            min_expected_count: 5.0,
            cramers_v_threshold: 0.3,
            strong_association_threshold: 0.5,
            significance_level: 0.05,
            psi_threshold: 0.2,
            max_rows: 1_000_000,
            max_columns: 1000,
            score_weights: ScoreWeights::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigValidationError> {
        let config: AnalysisConfig = serde_json::from_str(json)
            .map_err(|e| ConfigValidationError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let fractions = [
            ("numeric_parse_ratio", self.numeric_parse_ratio),
            ("date_match_ratio", self.date_match_ratio),
            ("high_cardinality_ratio", self.high_cardinality_ratio),
            ("mixed_min_fraction", self.mixed_min_fraction),
            ("identifier_unique_ratio", self.identifier_unique_ratio),
            (
                "missingness_correlation_threshold",
                self.missingness_correlation_threshold,
            ),
            ("duplicate_low_fraction", self.duplicate_low_fraction),
            ("duplicate_high_fraction", self.duplicate_high_fraction),
            ("outlier_medium_fraction", self.outlier_medium_fraction),
            ("outlier_high_fraction", self.outlier_high_fraction),
            ("forest_score_threshold", self.forest_score_threshold),
            (
                "inconsistency_medium_fraction",
                self.inconsistency_medium_fraction,
            ),
            ("inconsistency_high_fraction", self.inconsistency_high_fraction),
            ("correlation_threshold", self.correlation_threshold),
            ("multicollinearity_threshold", self.multicollinearity_threshold),
            ("cramers_v_threshold", self.cramers_v_threshold),
            (
                "strong_association_threshold",
                self.strong_association_threshold,
            ),
            ("significance_level", self.significance_level),
        ];
        for (field, value) in fractions {
            check_fraction(field, value)?;
        }

        for (field, value) in [
            ("missing_low_pct", self.missing_low_pct),
            ("missing_medium_pct", self.missing_medium_pct),
            ("missing_high_pct", self.missing_high_pct),
            ("missing_drop_pct", self.missing_drop_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigValidationError::InvalidPercentage {
                    field: field.to_string(),
                    value,
                });
            }
        }

        check_order(
            "missing_low_pct",
            self.missing_low_pct,
            "missing_medium_pct",
            self.missing_medium_pct,
        )?;
        check_order(
            "missing_medium_pct",
            self.missing_medium_pct,
            "missing_high_pct",
            self.missing_high_pct,
        )?;
        check_order(
            "duplicate_low_fraction",
            self.duplicate_low_fraction,
            "duplicate_high_fraction",
            self.duplicate_high_fraction,
        )?;
        check_order(
            "outlier_medium_fraction",
            self.outlier_medium_fraction,
            "outlier_high_fraction",
            self.outlier_high_fraction,
        )?;
        check_order(
            "inconsistency_medium_fraction",
            self.inconsistency_medium_fraction,
            "inconsistency_high_fraction",
            self.inconsistency_high_fraction,
        )?;
        check_order(
            "correlation_threshold",
            self.correlation_threshold,
            "multicollinearity_threshold",
            self.multicollinearity_threshold,
        )?;

        for (field, value) in [
            ("type_sample_size", self.type_sample_size),
            ("top_k", self.top_k),
            ("sample_size", self.sample_size),
            ("outlier_min_rows", self.outlier_min_rows),
            ("forest_trees", self.forest_trees),
            ("forest_subsample", self.forest_subsample),
            ("forest_max_fit_rows", self.forest_max_fit_rows),
            ("forest_min_rows", self.forest_min_rows),
            ("max_categories", self.max_categories),
            ("max_rows", self.max_rows),
            ("max_columns", self.max_columns),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::InvalidCount(field.to_string()));
            }
        }

        for (field, value) in [
            ("iqr_multiplier", self.iqr_multiplier),
            ("zscore_threshold", self.zscore_threshold),
            ("min_expected_count", self.min_expected_count),
            ("psi_threshold", self.psi_threshold),
            ("symmetric_skew_limit", self.symmetric_skew_limit),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigValidationError::NonPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        self.score_weights.validate()
    }
}

fn check_fraction(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigValidationError::InvalidThreshold {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_order(
    lower_field: &str,
    lower: f64,
    upper_field: &str,
    upper: f64,
) -> Result<(), ConfigValidationError> {
    if lower > upper {
        return Err(ConfigValidationError::InvalidOrdering {
            lower: lower_field.to_string(),
            upper: upper_field.to_string(),
        });
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid percentage for '{field}': {value} (must be between 0 and 100)")]
    InvalidPercentage { field: String, value: f64 },

    #[error("'{lower}' must not exceed '{upper}'")]
    InvalidOrdering { lower: String, upper: String },

    #[error("Invalid value for '{field}': {value} (must be positive)")]
    NonPositive { field: String, value: f64 },

    #[error("'{0}' must be at least 1")]
    InvalidCount(String),

    #[error("Invalid score weights: {0}")]
    InvalidWeights(String),

    #[error("Unknown {axis} strategy '{value}'")]
    UnknownStrategy { axis: String, value: String },

    #[error("Empty column name in per-column imputation")]
    EmptyColumnName,

    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// Builder for [`AnalysisConfig`] with fluent API.
///
/// Only the commonly tuned fields have setters; the rest keep their defaults
/// or come from [`AnalysisConfig::from_json`].
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    type_sample_size: Option<usize>,
    high_cardinality_ratio: Option<f64>,
    missing_bands: Option<(f64, f64, f64)>,
    duplicate_thresholds: Option<(f64, f64)>,
    iqr_multiplier: Option<f64>,
    zscore_threshold: Option<f64>,
    forest_trees: Option<usize>,
    forest_max_fit_rows: Option<usize>,
    random_seed: Option<u64>,
    correlation_threshold: Option<f64>,
    cramers_v_threshold: Option<f64>,
    min_expected_count: Option<f64>,
    max_rows: Option<usize>,
    max_columns: Option<usize>,
    score_weights: Option<ScoreWeights>,
}

impl AnalysisConfigBuilder {
    /// Set how many non-missing values type inference samples per column.
    pub fn type_sample_size(mut self, size: usize) -> Self {
        self.type_sample_size = Some(size);
        self
    }

    /// Set the distinct/row ratio above which strings are high-cardinality.
    pub fn high_cardinality_ratio(mut self, ratio: f64) -> Self {
        self.high_cardinality_ratio = Some(ratio);
        self
    }

    /// Set the low, medium and high missing-value percentages.
    pub fn missing_bands(mut self, low: f64, medium: f64, high: f64) -> Self {
        self.missing_bands = Some((low, medium, high));
        self
    }

    /// Set the duplicate-row fractions separating low/medium and medium/high.
    pub fn duplicate_thresholds(mut self, low: f64, high: f64) -> Self {
        self.duplicate_thresholds = Some((low, high));
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the absolute z-score threshold.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = Some(threshold);
        self
    }

    /// Set the number of isolation trees.
    pub fn forest_trees(mut self, trees: usize) -> Self {
        self.forest_trees = Some(trees);
        self
    }

    /// Cap the rows used to fit the isolation forest.
    pub fn forest_max_fit_rows(mut self, rows: usize) -> Self {
        self.forest_max_fit_rows = Some(rows);
        self
    }

    /// Set the seed used by sampling and the isolation forest.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the absolute Pearson correlation reported as a finding.
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = Some(threshold);
        self
    }

    /// Set the Cramér's V reported as an association.
    pub fn cramers_v_threshold(mut self, threshold: f64) -> Self {
        self.cramers_v_threshold = Some(threshold);
        self
    }

    /// Set the smallest expected contingency count for a valid chi-square test.
    pub fn min_expected_count(mut self, count: f64) -> Self {
        self.min_expected_count = Some(count);
        self
    }

    /// Set the largest accepted table height.
    pub fn max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }

    /// Set the largest accepted table width.
    pub fn max_columns(mut self, columns: usize) -> Self {
        self.max_columns = Some(columns);
        self
    }

    /// Set the sub-score weights.
    pub fn score_weights(mut self, weights: ScoreWeights) -> Self {
        self.score_weights = Some(weights);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let defaults = AnalysisConfig::default();
        let (missing_low_pct, missing_medium_pct, missing_high_pct) =
            self.missing_bands.unwrap_or((
                defaults.missing_low_pct,
                defaults.missing_medium_pct,
                defaults.missing_high_pct,
            ));
        let (duplicate_low_fraction, duplicate_high_fraction) =
            self.duplicate_thresholds.unwrap_or((
                defaults.duplicate_low_fraction,
                defaults.duplicate_high_fraction,
            ));

        let config = AnalysisConfig {
            type_sample_size: self.type_sample_size.unwrap_or(defaults.type_sample_size),
            high_cardinality_ratio: self
                .high_cardinality_ratio
                .unwrap_or(defaults.high_cardinality_ratio),
            missing_low_pct,
            missing_medium_pct,
            missing_high_pct,
            duplicate_low_fraction,
            duplicate_high_fraction,
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            zscore_threshold: self.zscore_threshold.unwrap_or(defaults.zscore_threshold),
            forest_trees: self.forest_trees.unwrap_or(defaults.forest_trees),
            forest_max_fit_rows: self
                .forest_max_fit_rows
                .unwrap_or(defaults.forest_max_fit_rows),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            correlation_threshold: self
                .correlation_threshold
                .unwrap_or(defaults.correlation_threshold),
            cramers_v_threshold: self
                .cramers_v_threshold
                .unwrap_or(defaults.cramers_v_threshold),
            min_expected_count: self
                .min_expected_count
                .unwrap_or(defaults.min_expected_count),
            max_rows: self.max_rows.unwrap_or(defaults.max_rows),
            max_columns: self.max_columns.unwrap_or(defaults.max_columns),
            score_weights: self.score_weights.unwrap_or_default(),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Cleaning Configuration
// =============================================================================

/// Remediation strategies requested for one cleaning run.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::config::*;
///
/// let config = CleaningConfig::builder()
///     .duplicates(DuplicateStrategy::Remove)
///     .imputation(ImputationStrategy::Median)
///     .column_imputation("city", ImputationStrategy::Mode)
///     .outliers(OutlierStrategy::Clip)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CleaningConfig {
    /// Duplicate handling. Default: Auto
    pub duplicates: DuplicateStrategy,
    /// Global imputation default for numeric columns. Default: Median
    pub imputation: ImputationStrategy,
    /// Per-column overrides, taking precedence over the global default.
    pub column_imputation: BTreeMap<String, ImputationStrategy>,
    /// Outlier treatment. Default: Clip
    pub outliers: OutlierStrategy,
    /// Trim and collapse whitespace in text columns. Default: false
    pub normalize_text: bool,
    /// Drop columns holding a single distinct value. Default: false
    pub drop_constant_columns: bool,
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Parse strategy names as received from a request layer.
    pub fn from_names(
        duplicates: &str,
        imputation: &str,
        outliers: &str,
    ) -> Result<Self, ConfigValidationError> {
        CleaningConfig::builder()
            .duplicates(duplicates.parse()?)
            .imputation(imputation.parse()?)
            .outliers(outliers.parse()?)
            .build()
    }

    /// The strategy that applies to `column`, if any was requested for it.
    pub fn override_for(&self, column: &str) -> Option<ImputationStrategy> {
        self.column_imputation.get(column).copied()
    }

    /// Validate the configuration and return errors if invalid.
    ///
    /// Column-level applicability is checked later against the report.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.column_imputation.keys().any(|name| name.is_empty()) {
            return Err(ConfigValidationError::EmptyColumnName);
        }
        Ok(())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    duplicates: Option<DuplicateStrategy>,
    imputation: Option<ImputationStrategy>,
    column_imputation: BTreeMap<String, ImputationStrategy>,
    outliers: Option<OutlierStrategy>,
    normalize_text: Option<bool>,
    drop_constant_columns: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Set the duplicate strategy.
    pub fn duplicates(mut self, strategy: DuplicateStrategy) -> Self {
        self.duplicates = Some(strategy);
        self
    }

    /// Set the global imputation default.
    pub fn imputation(mut self, strategy: ImputationStrategy) -> Self {
        self.imputation = Some(strategy);
        self
    }

    /// Override imputation for one column.
    pub fn column_imputation(mut self, column: impl Into<String>, strategy: ImputationStrategy) -> Self {
        self.column_imputation.insert(column.into(), strategy);
        self
    }

    /// Set the outlier strategy.
    pub fn outliers(mut self, strategy: OutlierStrategy) -> Self {
        self.outliers = Some(strategy);
        self
    }

    /// Enable or disable whitespace normalization of text columns.
    pub fn normalize_text(mut self, enable: bool) -> Self {
        self.normalize_text = Some(enable);
        self
    }

    /// Enable or disable removal of constant columns.
    pub fn drop_constant_columns(mut self, enable: bool) -> Self {
        self.drop_constant_columns = Some(enable);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            duplicates: self.duplicates.unwrap_or_default(),
            imputation: self.imputation.unwrap_or_default(),
            column_imputation: self.column_imputation,
            outliers: self.outliers.unwrap_or_default(),
            normalize_text: self.normalize_text.unwrap_or(false),
            drop_constant_columns: self.drop_constant_columns.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Job Store Configuration
// =============================================================================

/// Retention settings of the job store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStoreConfig {
    /// Seconds a job may go unaccessed before the reaper evicts it. Default: 3600
    pub ttl_secs: u64,
    /// Seconds between reaper sweeps. Default: 60
    pub reap_interval_secs: u64,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            reap_interval_secs: 60,
        }
    }
}

impl JobStoreConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.reap_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidCount(
                "reap_interval_secs".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analysis_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.random_seed, 42);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AnalysisConfig::builder()
            .zscore_threshold(2.5)
            .duplicate_thresholds(0.02, 0.10)
            .missing_bands(1.0, 10.0, 30.0)
            .random_seed(7)
            .build()
            .unwrap();

        assert_eq!(config.zscore_threshold, 2.5);
        assert_eq!(config.duplicate_low_fraction, 0.02);
        assert_eq!(config.duplicate_high_fraction, 0.10);
        assert_eq!(config.missing_high_pct, 30.0);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.forest_trees, 100);
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let result = AnalysisConfig::builder().cramers_v_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_bands() {
        let result = AnalysisConfig::builder()
            .duplicate_thresholds(0.2, 0.1)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidOrdering { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_zero_weights() {
        let result = AnalysisConfig::builder()
            .score_weights(ScoreWeights {
                completeness: 0.0,
                uniqueness: 0.0,
                consistency: 0.0,
                validity: 0.0,
            })
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidWeights(_)
        ));
    }

    #[test]
    fn test_analysis_config_from_partial_json() {
        let config = AnalysisConfig::from_json(r#"{"zscore_threshold": 2.0, "max_rows": 500}"#)
            .unwrap();
        assert_eq!(config.zscore_threshold, 2.0);
        assert_eq!(config.max_rows, 500);
        assert_eq!(config.correlation_threshold, 0.7);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("remove".parse::<DuplicateStrategy>().unwrap(), DuplicateStrategy::Remove);
        assert_eq!(" Median ".parse::<ImputationStrategy>().unwrap(), ImputationStrategy::Median);
        assert_eq!("clip".parse::<OutlierStrategy>().unwrap(), OutlierStrategy::Clip);
        assert!(matches!(
            "drop".parse::<ImputationStrategy>().unwrap_err(),
            ConfigValidationError::UnknownStrategy { .. }
        ));
    }

    #[test]
    fn test_cleaning_config_from_json() {
        let json = r#"{
            "duplicates": "flag",
            "imputation": "mean",
            "column_imputation": {"city": "mode"},
            "outliers": "remove"
        }"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.duplicates, DuplicateStrategy::Flag);
        assert_eq!(config.imputation, ImputationStrategy::Mean);
        assert_eq!(config.override_for("city"), Some(ImputationStrategy::Mode));
        assert_eq!(config.outliers, OutlierStrategy::Remove);
        assert!(!config.normalize_text);
    }

    #[test]
    fn test_cleaning_config_from_names() {
        let config = CleaningConfig::from_names("auto", "zero", "flag").unwrap();
        assert_eq!(config.duplicates, DuplicateStrategy::Auto);
        assert_eq!(config.imputation, ImputationStrategy::Zero);
        assert_eq!(config.outliers, OutlierStrategy::Flag);
        assert!(CleaningConfig::from_names("auto", "zero", "winsorize").is_err());
    }

    #[test]
    fn test_cleaning_config_rejects_empty_column_name() {
        let result = CleaningConfig::builder()
            .column_imputation("", ImputationStrategy::Mode)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyColumnName
        ));
    }

    #[test]
    fn test_job_store_config() {
        let config = JobStoreConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
        let bad = JobStoreConfig {
            reap_interval_secs: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
