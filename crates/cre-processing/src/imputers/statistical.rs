//! Statistical imputation methods.
//!
//! Median/mean for numeric columns, mode or a placeholder for text, and
//! forward-then-backward fill for dates. The minimal profile leaves dates
//! that failed to parse missing.

use crate::config::{NumericImputation, PipelineConfig, TextImputation};
use crate::types::{ActionType, CleaningAction, ColumnKind, ColumnTyping};
use crate::utils::{
    DtypeCategory, column_names, fill_numeric_nulls, fill_string_nulls, get_dtype_category,
    string_mode,
};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill numeric nulls with the median or mean of the non-null values.
    ///
    /// Returns `None` when the column has no value to compute a statistic
    /// from; the column is then left untouched.
    pub fn fill_numeric(
        series: &Series,
        strategy: NumericImputation,
    ) -> Result<Option<(Series, f64)>> {
        let floats = series.cast(&DataType::Float64)?;
        let stat = match strategy {
            NumericImputation::Median => floats.median(),
            NumericImputation::Mean => floats.mean(),
        };
        match stat {
            Some(value) if value.is_finite() => {
                Ok(Some((fill_numeric_nulls(&floats, value)?, value)))
            }
            _ => Ok(None),
        }
    }

    /// Fill text nulls with the mode (ties resolve to the smallest value) or
    /// the placeholder.
    pub fn fill_text(
        series: &Series,
        strategy: TextImputation,
        placeholder: &str,
    ) -> Result<(Series, String)> {
        let fill_value = match strategy {
            TextImputation::Mode => string_mode(series).unwrap_or_else(|| placeholder.to_string()),
            TextImputation::Constant => placeholder.to_string(),
        };
        let filled = fill_string_nulls(series, &fill_value)?;
        Ok((filled, fill_value))
    }

    /// Forward fill, then backward fill for leading nulls.
    pub fn fill_dates(series: &Series) -> Result<Series> {
        let filled = series.fill_null(FillNullStrategy::Forward(None))?;
        let filled = filled.fill_null(FillNullStrategy::Backward(None))?;
        Ok(filled)
    }

    /// Impute every column of a frame according to its kind.
    ///
    /// Columns named in `exclude` are skipped. Columns missing from `typing`
    /// (such as derived keys) are treated by dtype.
    pub fn impute_frame(
        df: &mut DataFrame,
        typing: &ColumnTyping,
        config: &PipelineConfig,
        exclude: &[String],
    ) -> Result<Vec<CleaningAction>> {
        let mut actions = Vec::new();

        for name in column_names(df) {
            if exclude.iter().any(|e| e.eq_ignore_ascii_case(&name)) {
                continue;
            }
            let series = df.column(&name)?.as_materialized_series().clone();
            let nulls = series.null_count();
            if nulls == 0 {
                continue;
            }

            let description = match kind_for(&name, &series, typing) {
                ColumnKind::Numeric => {
                    match Self::fill_numeric(&series, config.numeric_imputation)? {
                        Some((filled, value)) => {
                            df.replace(&name, filled)?;
                            let method = match config.numeric_imputation {
                                NumericImputation::Median => "median",
                                NumericImputation::Mean => "mean",
                            };
                            format!("Filled {} missing values in '{}' with {} {:.4}", nulls, name, method, value)
                        }
                        None => {
                            debug!("'{}' has no values to impute from", name);
                            continue;
                        }
                    }
                }
                ColumnKind::Text => {
                    let (filled, value) = Self::fill_text(
                        &series,
                        config.text_imputation,
                        &config.text_placeholder,
                    )?;
                    df.replace(&name, filled)?;
                    format!("Filled {} missing values in '{}' with '{}'", nulls, name, value)
                }
                ColumnKind::Date if !config.group_cleaning => {
                    debug!("Leaving {} missing dates in '{}' unfilled", nulls, name);
                    continue;
                }
                ColumnKind::Date => {
                    let filled = Self::fill_dates(&series)?;
                    df.replace(&name, filled)?;
                    format!("Forward/backward filled {} missing dates in '{}'", nulls, name)
                }
            };

            debug!("{}", description);
            actions.push(CleaningAction::new(ActionType::ValuesImputed, &name, description));
        }

        Ok(actions)
    }
}

fn kind_for(name: &str, series: &Series, typing: &ColumnTyping) -> ColumnKind {
    typing
        .kind_of(name)
        .unwrap_or(match get_dtype_category(series.dtype()) {
            DtypeCategory::Numeric => ColumnKind::Numeric,
            DtypeCategory::Datetime => ColumnKind::Date,
            _ => ColumnKind::Text,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningMode;

    #[test]
    fn test_fill_numeric_median() {
        let series = Series::new("rent".into(), &[Some(1.0), None, Some(3.0), Some(10.0)]);
        let (filled, value) = StatisticalImputer::fill_numeric(&series, NumericImputation::Median)
            .unwrap()
            .unwrap();
        assert_eq!(value, 3.0);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.f64().unwrap().get(1), Some(3.0));
    }

    #[test]
    fn test_fill_numeric_mean_from_integers() {
        let series = Series::new("sf".into(), &[Some(2i64), None, Some(4)]);
        let (filled, value) = StatisticalImputer::fill_numeric(&series, NumericImputation::Mean)
            .unwrap()
            .unwrap();
        assert_eq!(value, 3.0);
        assert_eq!(filled.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_fill_numeric_all_null_is_skipped() {
        let series = Series::new("sf".into(), &[Option::<f64>::None, None]);
        let result = StatisticalImputer::fill_numeric(&series, NumericImputation::Median).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_fill_text_mode_and_fallback() {
        let series = Series::new("city".into(), &[Some("austin"), None, Some("austin"), Some("dallas")]);
        let (filled, value) = StatisticalImputer::fill_text(&series, TextImputation::Mode, "").unwrap();
        assert_eq!(value, "austin");
        assert_eq!(filled.str().unwrap().get(1), Some("austin"));

        let empty = Series::new("city".into(), &[Option::<&str>::None, None]);
        let (filled, value) = StatisticalImputer::fill_text(&empty, TextImputation::Mode, "").unwrap();
        assert_eq!(value, "");
        assert_eq!(filled.str().unwrap().get(0), Some(""));
    }

    #[test]
    fn test_fill_text_constant() {
        let series = Series::new("city".into(), &[Some("austin"), None]);
        let (filled, _) =
            StatisticalImputer::fill_text(&series, TextImputation::Constant, "missing").unwrap();
        assert_eq!(filled.str().unwrap().get(1), Some("missing"));
    }

    #[test]
    fn test_fill_dates_forward_then_backward() {
        let series = Series::new("d".into(), &[None, Some(10i32), None, Some(20)])
            .cast(&DataType::Date)
            .unwrap();
        let filled = StatisticalImputer::fill_dates(&series).unwrap();
        let days: Vec<Option<i32>> = filled
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(days, vec![Some(10), Some(10), Some(10), Some(20)]);
    }

    #[test]
    fn test_impute_frame_respects_exclusions() {
        let mut df = df![
            "year" => [Some(2019.0), None, Some(2021.0)],
            "rent" => [Some(10.0), None, Some(30.0)],
            "city" => [Some("austin"), None, Some("boston")],
        ]
        .unwrap();
        let mut typing = ColumnTyping::default();
        typing.insert("year", ColumnKind::Numeric);
        typing.insert("rent", ColumnKind::Numeric);
        typing.insert("city", ColumnKind::Text);

        let config = PipelineConfig::for_mode(CleaningMode::Minimal);
        let actions =
            StatisticalImputer::impute_frame(&mut df, &typing, &config, &config.time_columns).unwrap();

        assert_eq!(df.column("year").unwrap().null_count(), 1);
        assert_eq!(df.column("rent").unwrap().f64().unwrap().get(1), Some(20.0));
        assert_eq!(df.column("city").unwrap().str().unwrap().get(1), Some("missing"));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_dates_filled_only_when_cleaning_groups() {
        let frame = || {
            let dates = Series::new("lease_date".into(), &[Some(17901i32), None, None])
                .cast(&DataType::Date)
                .unwrap();
            DataFrame::new(vec![dates.into()]).unwrap()
        };
        let mut typing = ColumnTyping::default();
        typing.insert("lease_date", ColumnKind::Date);

        let mut minimal = frame();
        let config = PipelineConfig::for_mode(CleaningMode::Minimal);
        let actions = StatisticalImputer::impute_frame(&mut minimal, &typing, &config, &[]).unwrap();
        assert!(actions.is_empty());
        assert_eq!(minimal.column("lease_date").unwrap().null_count(), 2);

        let mut dynamic = frame();
        let config = PipelineConfig::for_mode(CleaningMode::Dynamic);
        StatisticalImputer::impute_frame(&mut dynamic, &typing, &config, &[]).unwrap();
        assert_eq!(dynamic.column("lease_date").unwrap().null_count(), 0);
    }
}
