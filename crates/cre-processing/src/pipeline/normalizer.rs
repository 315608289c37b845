//! Min-max scaling of numeric columns.

use super::outliers::OutlierFilter;
use crate::config::PipelineConfig;
use crate::types::{ActionType, CleaningAction};
use crate::utils::numeric_values;
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Scales numeric, non-time columns to [0, 1].
pub struct MinMaxNormalizer;

impl MinMaxNormalizer {
    /// `(x - min) / (max - min)` per column. A constant column becomes 0.0
    /// everywhere; an all-null column is left as is.
    pub fn normalize(
        df: &mut DataFrame,
        config: &PipelineConfig,
        actions: &mut Vec<CleaningAction>,
    ) -> Result<usize> {
        let mut normalized = 0;

        for name in OutlierFilter::target_columns(df, config) {
            let values = numeric_values(df.column(&name)?.as_materialized_series())?;
            let present = values.iter().flatten();
            let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
            if min > max {
                debug!("Skipping '{}': no values", name);
                continue;
            }

            let range = max - min;
            let scaled: Vec<Option<f64>> = if range > 0.0 {
                values
                    .iter()
                    .map(|opt| opt.map(|v| (v - min) / range))
                    .collect()
            } else {
                values.iter().map(|opt| opt.map(|_| 0.0)).collect()
            };

            df.replace(&name, Series::new(name.as_str().into(), scaled))?;
            normalized += 1;
            actions.push(CleaningAction::new(
                ActionType::Normalized,
                &name,
                format!("Scaled '{}' from [{}, {}] to [0, 1]", name, min, max),
            ));
        }

        debug!("Normalized {} columns", normalized);
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_min_max_scaling() {
        let mut df = df![
            "rent" => [Some(10.0), Some(20.0), None, Some(30.0)],
            "year" => [2019i64, 2020, 2021, 2022],
            "market" => ["a", "b", "c", "d"],
        ]
        .unwrap();
        let mut actions = vec![];

        let count = MinMaxNormalizer::normalize(&mut df, &PipelineConfig::default(), &mut actions).unwrap();

        assert_eq!(count, 1);
        assert_eq!(floats(&df, "rent"), vec![Some(0.0), Some(0.5), None, Some(1.0)]);
        // Time fields keep their integer values.
        let years: Vec<Option<i64>> = df.column("year").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2019), Some(2020), Some(2021), Some(2022)]);
    }

    #[test]
    fn test_constant_column_becomes_zero() {
        let mut df = df!["sf" => [5.0, 5.0, 5.0]].unwrap();
        MinMaxNormalizer::normalize(&mut df, &PipelineConfig::default(), &mut vec![]).unwrap();
        assert_eq!(floats(&df, "sf"), vec![Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_all_null_column_untouched() {
        let mut df = df!["sf" => [Option::<f64>::None, None]].unwrap();
        let count = MinMaxNormalizer::normalize(&mut df, &PipelineConfig::default(), &mut vec![]).unwrap();
        assert_eq!(count, 0);
        assert_eq!(df.column("sf").unwrap().null_count(), 2);
    }
}
