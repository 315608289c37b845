//! Outlier filtering module.
//!
//! Removes rows outside the IQR fences of each numeric column. Columns are
//! processed one after another on the already filtered table, so the fences
//! of a later column are computed from the rows that survived the earlier
//! ones.

use crate::config::PipelineConfig;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{column_names, is_numeric_dtype, numeric_values, quantile_sorted};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Fences of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Fences for the non-null values of a column, `None` if it has none.
    pub fn from_values(values: &[Option<f64>], k: f64) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Sequential IQR row filter.
pub struct OutlierFilter;

impl OutlierFilter {
    /// Numeric columns subject to filtering: everything numeric except the
    /// integer time fields.
    pub fn target_columns(df: &DataFrame, config: &PipelineConfig) -> Vec<String> {
        column_names(df)
            .into_iter()
            .zip(df.get_columns())
            .filter(|(name, column)| is_numeric_dtype(column.dtype()) && !config.is_time_column(name))
            .map(|(name, _)| name)
            .collect()
    }

    /// Remove rows containing outliers. Returns the number of rows removed.
    pub fn remove_outliers(
        df: &mut DataFrame,
        config: &PipelineConfig,
        actions: &mut Vec<CleaningAction>,
    ) -> Result<usize> {
        let original_rows = df.height();

        for name in Self::target_columns(df, config) {
            let series = df.column(&name)?.as_materialized_series();
            let values = numeric_values(series)?;
            let Some(bounds) = IqrBounds::from_values(&values, config.iqr_multiplier) else {
                debug!("Skipping '{}': no values", name);
                continue;
            };

            let mask_values: Vec<bool> = values
                .iter()
                .map(|opt| match opt {
                    Some(v) => bounds.contains(*v),
                    None => !config.drop_missing_in_outlier_filter,
                })
                .collect();

            let before = df.height();
            let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
            *df = df.filter(&mask)?;
            let removed = before - df.height();

            if removed > 0 {
                debug!(
                    "Removed {} rows outside [{:.4}, {:.4}] in '{}'",
                    removed, bounds.lower, bounds.upper, name
                );
                actions.push(CleaningAction::new(
                    ActionType::OutliersRemoved,
                    &name,
                    format!(
                        "Removed {} rows outside [{:.4}, {:.4}] in '{}'",
                        removed, bounds.lower, bounds.upper, name
                    ),
                ));
            }
        }

        Ok(original_rows - df.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_linear_interpolation() {
        let values: Vec<Option<f64>> = (1..=10).map(|x| Some(x as f64)).collect();
        let bounds = IqrBounds::from_values(&values, 1.5).unwrap();
        assert_eq!(bounds.q1, 3.25);
        assert_eq!(bounds.q3, 7.75);
        assert_eq!(bounds.lower, 3.25 - 1.5 * 4.5);
        assert_eq!(bounds.upper, 7.75 + 1.5 * 4.5);
    }

    #[test]
    fn test_bounds_all_null() {
        assert!(IqrBounds::from_values(&[None, None], 1.5).is_none());
    }

    #[test]
    fn test_remove_single_outlier() {
        let mut df = df![
            "value" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
        ]
        .unwrap();
        let mut actions = vec![];

        let removed =
            OutlierFilter::remove_outliers(&mut df, &PipelineConfig::default(), &mut actions).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(df.height(), 9);
        assert_eq!(df.column("value").unwrap().f64().unwrap().max(), Some(9.0));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_sequential_filtering_compounds() {
        // "a" removes the row with 100; without it, "b" then sees 50 as an
        // outlier among 1..=8.
        let mut df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
            "b" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 50.0, 9.0],
        ]
        .unwrap();
        let mut actions = vec![];

        let removed =
            OutlierFilter::remove_outliers(&mut df, &PipelineConfig::default(), &mut actions).unwrap();

        assert_eq!(removed, 2);
        let b: Vec<Option<f64>> = df.column("b").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(b, (1..=8).map(|x| Some(x as f64)).collect::<Vec<_>>());
    }

    #[test]
    fn test_time_columns_are_not_filtered() {
        let mut df = df![
            "year" => [2000i64, 2019, 2019, 2019, 2019, 2019, 2019, 2019],
            "value" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        ]
        .unwrap();
        let mut actions = vec![];

        let removed =
            OutlierFilter::remove_outliers(&mut df, &PipelineConfig::default(), &mut actions).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(df.height(), 8);
    }

    #[test]
    fn test_missing_values_follow_config() {
        let make = || {
            df![
                "value" => [Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)],
            ]
            .unwrap()
        };

        let mut df = make();
        OutlierFilter::remove_outliers(&mut df, &PipelineConfig::default(), &mut vec![]).unwrap();
        assert_eq!(df.height(), 4);

        let keep = PipelineConfig::builder()
            .drop_missing_in_outlier_filter(false)
            .build()
            .unwrap();
        let mut df = make();
        OutlierFilter::remove_outliers(&mut df, &keep, &mut vec![]).unwrap();
        assert_eq!(df.height(), 5);
    }

    #[test]
    fn test_text_columns_ignored() {
        let mut df = df!["market" => ["a", "b", "c"]].unwrap();
        let removed =
            OutlierFilter::remove_outliers(&mut df, &PipelineConfig::default(), &mut vec![]).unwrap();
        assert_eq!(removed, 0);
    }
}
