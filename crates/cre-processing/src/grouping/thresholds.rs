//! Adaptive drop thresholds computed from a group's own missingness.

use crate::config::PipelineConfig;
use crate::dates::find_column;
use crate::types::GroupThresholds;
use crate::utils::{column_names, median_of};
use anyhow::Result;
use polars::prelude::*;

/// Share of non-null cells in each row.
pub fn row_completeness(df: &DataFrame) -> Vec<f64> {
    let width = df.width();
    if width == 0 {
        return vec![0.0; df.height()];
    }

    let mut non_null = vec![0usize; df.height()];
    for column in df.get_columns() {
        let mask = column.as_materialized_series().is_not_null();
        for (count, present) in non_null.iter_mut().zip(mask.into_iter()) {
            if present.unwrap_or(false) {
                *count += 1;
            }
        }
    }
    non_null
        .into_iter()
        .map(|n| n as f64 / width as f64)
        .collect()
}

/// Share of null cells in each column, in column order.
pub fn column_missingness(df: &DataFrame) -> Vec<(String, f64)> {
    let height = df.height();
    column_names(df)
        .into_iter()
        .zip(df.get_columns())
        .map(|(name, column)| {
            let ratio = if height == 0 {
                0.0
            } else {
                column.null_count() as f64 / height as f64
            };
            (name, ratio)
        })
        .collect()
}

/// Year of the group's first row, if the frame has a usable `year` column.
fn first_row_year(df: &DataFrame) -> Result<Option<i64>> {
    let Some(name) = find_column(df, "year") else {
        return Ok(None);
    };
    if df.height() == 0 {
        return Ok(None);
    }
    let floats = df.column(&name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(floats.f64()?.get(0).filter(|v| v.is_finite()).map(|v| v.round() as i64))
}

/// Thresholds for one group:
///
/// - rows: `max(floor, median(r) - offset)`
/// - columns: `min(ceiling, median(m) + offset)`
///
/// A configured override for the first row's year replaces both.
pub fn compute_thresholds(df: &DataFrame, config: &PipelineConfig) -> Result<GroupThresholds> {
    if let Some(year) = first_row_year(df)?
        && let Some(o) = config.threshold_override(year)
    {
        return Ok(GroupThresholds {
            row_threshold: o.row_threshold,
            column_threshold: o.column_threshold,
            overridden: true,
        });
    }

    let r = row_completeness(df);
    let m: Vec<f64> = column_missingness(df).into_iter().map(|(_, v)| v).collect();

    let row_threshold = config
        .row_threshold_floor
        .max(median_of(&r).unwrap_or(1.0) - config.row_threshold_offset);
    let column_threshold = config
        .column_threshold_ceiling
        .min(median_of(&m).unwrap_or(0.0) + config.column_threshold_offset);

    Ok(GroupThresholds {
        row_threshold,
        column_threshold,
        overridden: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_row_completeness_and_column_missingness() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), None],
            "b" => [Some("x"), Some("y"), None, None],
        ]
        .unwrap();

        assert_eq!(row_completeness(&df), vec![1.0, 0.5, 0.5, 0.0]);
        assert_eq!(
            column_missingness(&df),
            vec![("a".to_string(), 0.5), ("b".to_string(), 0.5)]
        );
    }

    #[test]
    fn test_adaptive_thresholds() {
        // r = [1, 1, 2/3, 1/3] -> median 5/6; m = [0, 0.25, 0.5] -> median 0.25
        let df = df![
            "a" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            "b" => [Some(1.0), Some(2.0), Some(3.0), None],
            "c" => [Some(1.0), Some(2.0), None, None],
        ]
        .unwrap();
        let t = compute_thresholds(&df, &PipelineConfig::default()).unwrap();

        assert!(approx(t.row_threshold, 5.0 / 6.0 - 0.1));
        assert!(approx(t.column_threshold, 0.35));
        assert!(!t.overridden);
    }

    #[test]
    fn test_thresholds_are_clamped() {
        // Mostly empty rows: median(r) - 0.1 drops below the 0.2 floor.
        // Mostly empty columns: median(m) + 0.1 exceeds the 0.9 ceiling.
        let df = df![
            "a" => [Some(1.0), None, None],
            "b" => [Option::<f64>::None, None, None],
            "c" => [Option::<f64>::None, None, None],
        ]
        .unwrap();
        let t = compute_thresholds(&df, &PipelineConfig::default()).unwrap();
        assert!(approx(t.row_threshold, 0.2));
        assert!(approx(t.column_threshold, 0.9));
    }

    #[test]
    fn test_2018_override_uses_first_row() {
        let df = df![
            "year" => [2018i64, 2019],
            "rent" => [1.0, 2.0],
        ]
        .unwrap();
        let t = compute_thresholds(&df, &PipelineConfig::default()).unwrap();
        assert_eq!(t.row_threshold, 0.4);
        assert_eq!(t.column_threshold, 0.6);
        assert!(t.overridden);

        let df = df![
            "year" => [2019i64, 2018],
            "rent" => [1.0, 2.0],
        ]
        .unwrap();
        assert!(!compute_thresholds(&df, &PipelineConfig::default()).unwrap().overridden);
    }
}
