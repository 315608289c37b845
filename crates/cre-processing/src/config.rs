//! Configuration types for the cleaning pipeline.
//!
//! Two presets cover the cleaning profiles:
//!
//! - [`CleaningMode::Dynamic`]: per-group adaptive dropping and imputation,
//!   followed by IQR outlier removal and min-max normalization.
//! - [`CleaningMode::Minimal`]: structure-preserving fill (median for numbers,
//!   a `"missing"` placeholder for text) with date backfill only.
//!
//! Every knob can still be overridden through [`PipelineConfigBuilder`].

use serde::{Deserialize, Serialize};

/// Cleaning profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CleaningMode {
    /// Group-wise dropping and imputation, outlier removal, normalization.
    #[default]
    Dynamic,
    /// Date backfill plus median/placeholder fill; no rows or columns dropped.
    Minimal,
}

impl CleaningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic",
            Self::Minimal => "minimal",
        }
    }
}

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumericImputation {
    /// Use the median of non-null values
    #[default]
    Median,
    /// Use the mean of non-null values
    Mean,
}

/// Strategy for imputing missing text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextImputation {
    /// Use the most frequent value, falling back to the placeholder
    #[default]
    Mode,
    /// Always use the placeholder
    Constant,
}

/// Fixed thresholds that replace the adaptive ones for groups of a given year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    pub year: i64,
    pub row_threshold: f64,
    pub column_threshold: f64,
}

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] for the dynamic preset or
/// [`PipelineConfig::for_mode`] to start from a specific profile.
///
/// # Example
///
/// ```rust,ignore
/// use cre_processing::config::{CleaningMode, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .mode(CleaningMode::Dynamic)
///     .iqr_multiplier(3.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cleaning profile this configuration was derived from.
    pub mode: CleaningMode,

    /// Whether to drop exact duplicate rows.
    /// Default: true
    pub remove_duplicates: bool,

    /// Case-insensitive substrings that mark a column as date-like.
    /// Default: ["date", "signed"]
    pub date_name_markers: Vec<String>,

    /// Share of non-empty values that must parse as numbers before a text
    /// column is coerced to numeric (0.0 - 1.0).
    /// Default: 0.9
    pub numeric_content_ratio: f64,

    /// Strip, lowercase and remove punctuation from text columns.
    /// Default: true (dynamic), false (minimal)
    pub normalize_text: bool,

    /// Integer time fields backfilled from dates and excluded from
    /// outlier filtering and normalization.
    /// Default: ["year", "quarter", "month"]
    pub time_columns: Vec<String>,

    /// Run the per-group sparse dropping and imputation.
    /// When false, the whole table is imputed at once without dropping.
    /// Default: true (dynamic), false (minimal)
    pub group_cleaning: bool,

    /// Lower bound for the adaptive row-completeness threshold.
    /// Default: 0.2
    pub row_threshold_floor: f64,

    /// Subtracted from the median row completeness.
    /// Default: 0.1
    pub row_threshold_offset: f64,

    /// Upper bound for the adaptive column-missingness threshold.
    /// Default: 0.9
    pub column_threshold_ceiling: f64,

    /// Added to the median column missingness.
    /// Default: 0.1
    pub column_threshold_offset: f64,

    /// Year-specific fixed thresholds.
    /// Default: 2018 -> rows 0.4, columns 0.6
    pub threshold_overrides: Vec<ThresholdOverride>,

    /// Strategy for numeric gaps.
    /// Default: Median
    pub numeric_imputation: NumericImputation,

    /// Strategy for text gaps.
    /// Default: Mode (dynamic), Constant (minimal)
    pub text_imputation: TextImputation,

    /// Fill value for text gaps when no mode exists or the strategy is constant.
    /// Default: "" (dynamic), "missing" (minimal)
    pub text_placeholder: String,

    /// Remove rows outside the IQR fences.
    /// Default: true (dynamic), false (minimal)
    pub remove_outliers: bool,

    /// IQR fence multiplier.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Treat a missing numeric value as outside the fences.
    /// Default: true
    pub drop_missing_in_outlier_filter: bool,

    /// Min-max scale numeric columns to [0, 1].
    /// Default: true (dynamic), false (minimal)
    pub normalize_numeric: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_mode(CleaningMode::Dynamic)
    }
}

impl PipelineConfig {
    /// Create a new configuration builder starting from the dynamic preset.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Preset for a cleaning profile.
    pub fn for_mode(mode: CleaningMode) -> Self {
        let dynamic = mode == CleaningMode::Dynamic;
        Self {
            mode,
            remove_duplicates: true,
            date_name_markers: vec!["date".to_string(), "signed".to_string()],
            numeric_content_ratio: 0.9,
            normalize_text: dynamic,
            time_columns: vec![
                "year".to_string(),
                "quarter".to_string(),
                "month".to_string(),
            ],
            group_cleaning: dynamic,
            row_threshold_floor: 0.2,
            row_threshold_offset: 0.1,
            column_threshold_ceiling: 0.9,
            column_threshold_offset: 0.1,
            threshold_overrides: vec![ThresholdOverride {
                year: 2018,
                row_threshold: 0.4,
                column_threshold: 0.6,
            }],
            numeric_imputation: NumericImputation::Median,
            text_imputation: if dynamic {
                TextImputation::Mode
            } else {
                TextImputation::Constant
            },
            text_placeholder: if dynamic {
                String::new()
            } else {
                "missing".to_string()
            },
            remove_outliers: dynamic,
            iqr_multiplier: 1.5,
            drop_missing_in_outlier_filter: true,
            normalize_numeric: dynamic,
        }
    }

    /// Parse a JSON configuration layered over a preset.
    ///
    /// Keys missing from the file take the preset of `mode` when given,
    /// otherwise of the file's own `"mode"`, otherwise the dynamic preset.
    pub fn from_json(json: &str, mode: Option<CleaningMode>) -> serde_json::Result<Self> {
        let mut file: serde_json::Value = serde_json::from_str(json)?;
        let file_mode = file
            .get("mode")
            .cloned()
            .map(serde_json::from_value::<CleaningMode>)
            .transpose()?;
        let mode = mode.or(file_mode).unwrap_or_default();

        let mut merged = serde_json::to_value(Self::for_mode(mode))?;
        if let (Some(base), Some(overrides)) = (merged.as_object_mut(), file.as_object_mut()) {
            overrides.remove("mode");
            base.extend(std::mem::take(overrides));
        }
        serde_json::from_value(merged)
    }

    /// Whether a column name is one of the integer time fields.
    pub fn is_time_column(&self, name: &str) -> bool {
        self.time_columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Override for a group's year, if any.
    pub fn threshold_override(&self, year: i64) -> Option<&ThresholdOverride> {
        self.threshold_overrides.iter().find(|o| o.year == year)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let unit_fields = [
            ("row_threshold_floor", self.row_threshold_floor),
            ("row_threshold_offset", self.row_threshold_offset),
            ("column_threshold_ceiling", self.column_threshold_ceiling),
            ("column_threshold_offset", self.column_threshold_offset),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for o in &self.threshold_overrides {
            for (field, value) in [
                ("threshold_overrides.row_threshold", o.row_threshold),
                ("threshold_overrides.column_threshold", o.column_threshold),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigValidationError::InvalidThreshold {
                        field: field.to_string(),
                        value,
                    });
                }
            }
        }

        if !(self.numeric_content_ratio > 0.0 && self.numeric_content_ratio <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "numeric_content_ratio".to_string(),
                value: self.numeric_content_ratio,
            });
        }

        if !(self.iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }

        if self.date_name_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigValidationError::NoDateMarkers);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid IQR multiplier: {0} (must be positive)")]
    InvalidIqrMultiplier(f64),

    #[error("At least one non-empty date name marker is required")]
    NoDateMarkers,
}

/// Builder for [`PipelineConfig`] with fluent API.
///
/// Unset fields take the value of the selected mode's preset.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    mode: Option<CleaningMode>,
    remove_duplicates: Option<bool>,
    date_name_markers: Option<Vec<String>>,
    numeric_content_ratio: Option<f64>,
    normalize_text: Option<bool>,
    time_columns: Option<Vec<String>>,
    group_cleaning: Option<bool>,
    row_threshold_floor: Option<f64>,
    column_threshold_ceiling: Option<f64>,
    threshold_overrides: Option<Vec<ThresholdOverride>>,
    numeric_imputation: Option<NumericImputation>,
    text_imputation: Option<TextImputation>,
    text_placeholder: Option<String>,
    remove_outliers: Option<bool>,
    iqr_multiplier: Option<f64>,
    drop_missing_in_outlier_filter: Option<bool>,
    normalize_numeric: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Select the preset the remaining fields default to.
    pub fn mode(mut self, mode: CleaningMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Replace the substrings that mark a column as date-like.
    pub fn date_name_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_name_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    pub fn numeric_content_ratio(mut self, ratio: f64) -> Self {
        self.numeric_content_ratio = Some(ratio);
        self
    }

    pub fn normalize_text(mut self, normalize: bool) -> Self {
        self.normalize_text = Some(normalize);
        self
    }

    pub fn time_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn group_cleaning(mut self, enable: bool) -> Self {
        self.group_cleaning = Some(enable);
        self
    }

    pub fn row_threshold_floor(mut self, floor: f64) -> Self {
        self.row_threshold_floor = Some(floor);
        self
    }

    pub fn column_threshold_ceiling(mut self, ceiling: f64) -> Self {
        self.column_threshold_ceiling = Some(ceiling);
        self
    }

    pub fn threshold_overrides(mut self, overrides: Vec<ThresholdOverride>) -> Self {
        self.threshold_overrides = Some(overrides);
        self
    }

    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    pub fn text_imputation(mut self, strategy: TextImputation) -> Self {
        self.text_imputation = Some(strategy);
        self
    }

    pub fn text_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.text_placeholder = Some(placeholder.into());
        self
    }

    pub fn remove_outliers(mut self, remove: bool) -> Self {
        self.remove_outliers = Some(remove);
        self
    }

    pub fn iqr_multiplier(mut self, k: f64) -> Self {
        self.iqr_multiplier = Some(k);
        self
    }

    pub fn drop_missing_in_outlier_filter(mut self, drop: bool) -> Self {
        self.drop_missing_in_outlier_filter = Some(drop);
        self
    }

    pub fn normalize_numeric(mut self, normalize: bool) -> Self {
        self.normalize_numeric = Some(normalize);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let base = PipelineConfig::for_mode(self.mode.unwrap_or_default());
        let config = PipelineConfig {
            mode: base.mode,
            remove_duplicates: self.remove_duplicates.unwrap_or(base.remove_duplicates),
            date_name_markers: self.date_name_markers.unwrap_or(base.date_name_markers),
            numeric_content_ratio: self
                .numeric_content_ratio
                .unwrap_or(base.numeric_content_ratio),
            normalize_text: self.normalize_text.unwrap_or(base.normalize_text),
            time_columns: self.time_columns.unwrap_or(base.time_columns),
            group_cleaning: self.group_cleaning.unwrap_or(base.group_cleaning),
            row_threshold_floor: self.row_threshold_floor.unwrap_or(base.row_threshold_floor),
            row_threshold_offset: base.row_threshold_offset,
            column_threshold_ceiling: self
                .column_threshold_ceiling
                .unwrap_or(base.column_threshold_ceiling),
            column_threshold_offset: base.column_threshold_offset,
            threshold_overrides: self.threshold_overrides.unwrap_or(base.threshold_overrides),
            numeric_imputation: self.numeric_imputation.unwrap_or(base.numeric_imputation),
            text_imputation: self.text_imputation.unwrap_or(base.text_imputation),
            text_placeholder: self.text_placeholder.unwrap_or(base.text_placeholder),
            remove_outliers: self.remove_outliers.unwrap_or(base.remove_outliers),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(base.iqr_multiplier),
            drop_missing_in_outlier_filter: self
                .drop_missing_in_outlier_filter
                .unwrap_or(base.drop_missing_in_outlier_filter),
            normalize_numeric: self.normalize_numeric.unwrap_or(base.normalize_numeric),
        };

        config.validate()?;
        Ok(config)
    }
}
