//! Error types for the quality analysis pipeline and job lifecycle.
//!
//! All errors returned across the public API are [`QualityError`] values.
//! Errors serialize as `{code, message}` so a request layer can forward them
//! without knowing the variants.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for analysis, cleaning and job operations.
#[derive(Error, Debug)]
pub enum QualityError {
    /// The table handed to the core is malformed or exceeds configured bounds.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cleaning strategy does not apply to the column's inferred type.
    #[error("Strategy '{strategy}' cannot be applied to column '{column}' (inferred type: {inferred_type})")]
    UnsupportedStrategy {
        column: String,
        strategy: String,
        inferred_type: String,
    },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// No job is registered under this id.
    #[error("Job '{0}' not found")]
    JobNotFound(String),

    /// The job exists but cleaning has never produced a table for it.
    #[error("Job '{0}' has no cleaned table")]
    NoCleanedTable(String),

    /// The job is not in a state that allows the requested operation.
    #[error("Conflict on job '{job_id}': {reason}")]
    Conflict { job_id: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// The scorer received a report that violates the pipeline contract.
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    /// An analyzer or the profiler failed.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QualityError>,
    },
}

impl QualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn conflict(job_id: impl ToString, reason: impl Into<String>) -> Self {
        QualityError::Conflict {
            job_id: job_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnsupportedStrategy { .. } => "UNSUPPORTED_STRATEGY",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
            Self::NoCleanedTable(_) => "NO_CLEANED_TABLE",
            Self::Conflict { .. } => "CONFLICT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::AnalysisFailed(_) => "ANALYSIS_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True for errors that mean "nothing to return for this id".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::JobNotFound(_) | Self::NoCleanedTable(_) => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True for errors caused by the caller's table or configuration.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InvalidInput(_)
            | Self::UnsupportedStrategy { .. }
            | Self::ColumnNotFound(_)
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for QualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("QualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<anyhow::Error> for QualityError {
    fn from(err: anyhow::Error) -> Self {
        QualityError::AnalysisFailed(format!("{err:#}"))
    }
}

/// Result type alias for quality operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| QualityError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            QualityError::JobNotFound("abc".to_string()).error_code(),
            "JOB_NOT_FOUND"
        );
        assert_eq!(
            QualityError::conflict("abc", "analysis in progress").error_code(),
            "CONFLICT"
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(QualityError::JobNotFound("a".to_string()).is_not_found());
        assert!(QualityError::NoCleanedTable("a".to_string()).is_not_found());
        assert!(!QualityError::InvalidInput("bad".to_string()).is_not_found());
    }

    #[test]
    fn test_with_context_preserves_code() {
        let err = QualityError::ColumnNotFound("age".to_string()).with_context("Imputing");
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_input_error());
        assert!(err.to_string().starts_with("Imputing"));
    }

    #[test]
    fn test_error_serialization() {
        let err = QualityError::JobNotFound("job-1".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "JOB_NOT_FOUND");
        assert_eq!(json["message"], "Job 'job-1' not found");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: QualityError = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_code(), "ANALYSIS_FAILED");
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(QualityError::InvariantViolation("x".to_string()));
        let err = result.context("Scoring report").unwrap_err();
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
    }
}
