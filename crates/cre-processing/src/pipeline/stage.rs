//! Pipeline stages.

use serde::{Deserialize, Serialize};

/// A stage of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Dropping exact duplicate rows
    Deduplication,
    /// Classifying and coercing columns
    ColumnTyping,
    /// Parsing dates and backfilling time fields
    DateNormalization,
    /// Deriving the year/quarter key
    YearQuarter,
    /// Per-group sparse dropping and imputation
    GroupCleaning,
    /// Whole-table imputation (minimal profile)
    Imputation,
    /// IQR row filtering
    OutlierFilter,
    /// Min-max scaling
    Normalization,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Deduplication => "Removing Duplicates",
            Self::ColumnTyping => "Typing Columns",
            Self::DateNormalization => "Normalizing Dates",
            Self::YearQuarter => "Deriving Year-Quarter",
            Self::GroupCleaning => "Cleaning Groups",
            Self::Imputation => "Imputing Values",
            Self::OutlierFilter => "Filtering Outliers",
            Self::Normalization => "Normalizing Values",
        }
    }
}
