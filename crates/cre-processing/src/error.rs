//! Error types for the cleaning pipeline.
//!
//! Data-level problems (unparseable numbers, invalid dates) never surface here:
//! they become missing values. These variants cover structural failures such as
//! a missing input file, a lookup of a column that is not in the table, or a
//! polars operation failing inside a stage.
//!
//! Errors serialize as `{code, message}` so the CLI can emit them as JSON.

use crate::pipeline::CleaningStage;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage failed.
    #[error("{} failed: {reason}", stage.display_name())]
    StageFailed { stage: CleaningStage, reason: String },

    /// Building the merged master table failed.
    #[error("Failed to merge datasets: {0}")]
    MergeFailed(String),

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
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap a stage-internal failure.
    pub fn stage(stage: CleaningStage, reason: impl ToString) -> Self {
        CleaningError::StageFailed {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::MergeFailed(_) => "MERGE_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The stage that failed, if this error came from one.
    pub fn failed_stage(&self) -> Option<CleaningStage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            Self::WithContext { source, .. } => source.failed_stage(),
            _ => None,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

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
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            CleaningError::ColumnNotFound("market".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            CleaningError::InputNotFound(PathBuf::from("Leases.csv")).error_code(),
            "INPUT_NOT_FOUND"
        );
    }

    #[test]
    fn test_stage_failed_message() {
        let error = CleaningError::stage(CleaningStage::OutlierFilter, "bad quantile");
        assert!(error.to_string().contains("Filtering Outliers"));
        assert!(error.to_string().contains("bad quantile"));
        assert_eq!(error.failed_stage(), Some(CleaningStage::OutlierFilter));
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ColumnNotFound("occupancy_proportion".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("occupancy_proportion"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::ColumnNotFound("state".to_string()).with_context("While merging");
        assert!(error.to_string().contains("While merging"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_context_preserves_stage() {
        let error = CleaningError::stage(CleaningStage::GroupCleaning, "boom").with_context("leases");
        assert_eq!(error.failed_stage(), Some(CleaningStage::GroupCleaning));
    }
}
