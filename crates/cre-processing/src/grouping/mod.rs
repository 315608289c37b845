//! Group cleaner.
//!
//! Partitions rows by the dataset's categorical keys and cleans each group on
//! its own: sparse rows and columns are dropped against thresholds derived
//! from the group's missingness, then the remaining gaps are imputed. Groups
//! are concatenated back in key order.

mod keys;
mod thresholds;

pub use keys::{GroupKey, GroupingPlan, KeyValue, partition};
pub use thresholds::{column_missingness, compute_thresholds, row_completeness};

use crate::config::PipelineConfig;
use crate::imputers::StatisticalImputer;
use crate::types::{ActionType, CleaningAction, ColumnTyping, GroupReport};
use crate::utils::{column_names, is_datetime_dtype, is_numeric_dtype};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Result of cleaning all groups.
#[derive(Debug)]
pub struct GroupCleaningResult {
    pub data: DataFrame,
    pub keys: Vec<String>,
    pub reports: Vec<GroupReport>,
    pub actions: Vec<CleaningAction>,
    pub rows_dropped: usize,
}

/// Per-group sparse dropping and imputation.
pub struct GroupCleaner<'a> {
    config: &'a PipelineConfig,
    typing: &'a ColumnTyping,
}

impl<'a> GroupCleaner<'a> {
    pub fn new(config: &'a PipelineConfig, typing: &'a ColumnTyping) -> Self {
        Self { config, typing }
    }

    pub fn clean(&self, df: DataFrame, plan: &GroupingPlan) -> Result<GroupCleaningResult> {
        let keys = plan.resolve(&df);
        if keys.is_empty() {
            warn!("No grouping key found; cleaning the whole table as one group");
        } else {
            info!("Grouping by {:?}", keys);
        }

        let groups = partition(&df, &keys)?;
        debug!("{} groups", groups.len());

        let mut pieces = Vec::with_capacity(groups.len());
        let mut reports = Vec::with_capacity(groups.len());
        let mut actions = Vec::new();

        let grouped: usize = groups.values().map(Vec::len).sum();
        let mut rows_dropped = df.height() - grouped;
        if rows_dropped > 0 {
            info!("Dropped {} rows with a missing group key", rows_dropped);
            actions.push(CleaningAction::new(
                ActionType::SparseRowsDropped,
                keys.join(", "),
                format!("Dropped {} rows with a missing value in {:?}", rows_dropped, keys),
            ));
        }

        for (key, rows) in groups {
            let idx = IdxCa::from_vec("idx".into(), rows);
            let group = df.take(&idx)?;
            let (cleaned, report, group_actions) = self.clean_group(group, &key)?;

            rows_dropped += report.rows_before - report.rows_after;
            actions.extend(group_actions);
            reports.push(report);
            if cleaned.height() > 0 {
                pieces.push(cleaned);
            }
        }

        let data = reassemble(&df, pieces)?;
        Ok(GroupCleaningResult {
            data,
            keys,
            reports,
            actions,
            rows_dropped,
        })
    }

    fn clean_group(
        &self,
        group: DataFrame,
        key: &GroupKey,
    ) -> Result<(DataFrame, GroupReport, Vec<CleaningAction>)> {
        let rows_before = group.height();
        let thresholds = compute_thresholds(&group, self.config)?;

        // Both decisions use the statistics of the untouched group.
        let completeness = row_completeness(&group);
        let dropped_columns: Vec<String> = column_missingness(&group)
            .into_iter()
            .filter(|(_, m)| *m >= thresholds.column_threshold)
            .map(|(name, _)| name)
            .collect();

        let mask_values: Vec<bool> = completeness
            .iter()
            .map(|r| *r >= thresholds.row_threshold)
            .collect();
        let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
        let mut cleaned = group.filter(&mask)?;

        if !dropped_columns.is_empty() {
            let cols: Vec<PlSmallStr> = dropped_columns.iter().map(|c| c.as_str().into()).collect();
            cleaned = cleaned.drop_many(cols);
        }

        let rows_after = cleaned.height();
        let mut actions = Vec::new();
        let label = key.to_string();

        if rows_after < rows_before {
            actions.push(CleaningAction::new(
                ActionType::SparseRowsDropped,
                &label,
                format!(
                    "Dropped {} rows below {:.3} completeness in group '{}'",
                    rows_before - rows_after,
                    thresholds.row_threshold,
                    label
                ),
            ));
        }
        if !dropped_columns.is_empty() {
            actions.push(CleaningAction::new(
                ActionType::SparseColumnsDropped,
                &label,
                format!(
                    "Dropped columns {:?} at or above {:.3} missingness in group '{}'",
                    dropped_columns, thresholds.column_threshold, label
                ),
            ));
        }

        if rows_after > 0 {
            actions.extend(StatisticalImputer::impute_frame(
                &mut cleaned,
                self.typing,
                self.config,
                &self.config.time_columns,
            )?);
        }

        debug!(
            "Group '{}': {} -> {} rows, thresholds {:.3}/{:.3}{}",
            label,
            rows_before,
            rows_after,
            thresholds.row_threshold,
            thresholds.column_threshold,
            if thresholds.overridden { " (override)" } else { "" }
        );

        let report = GroupReport {
            key: label,
            rows_before,
            rows_after,
            thresholds,
            dropped_columns,
        };
        Ok((cleaned, report, actions))
    }
}

/// Output dtype of a column once groups are stacked together.
fn unified_dtype(dtype: &DataType) -> DataType {
    if is_numeric_dtype(dtype) {
        DataType::Float64
    } else if is_datetime_dtype(dtype) {
        dtype.clone()
    } else {
        DataType::String
    }
}

/// Concatenate cleaned groups over the original column order. The output
/// keeps the columns at least one group kept; a column that only some groups
/// dropped is null for those groups' rows. With no surviving group the
/// original columns are returned empty.
fn reassemble(original: &DataFrame, pieces: Vec<DataFrame>) -> Result<DataFrame> {
    let schema: Vec<(String, DataType)> = column_names(original)
        .into_iter()
        .zip(original.get_columns())
        .filter(|(name, _)| {
            pieces.is_empty() || pieces.iter().any(|piece| piece.column(name).is_ok())
        })
        .map(|(name, column)| (name, unified_dtype(column.dtype())))
        .collect();

    let conform = |piece: &DataFrame| -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(schema.len());
        for (name, dtype) in &schema {
            let series = match piece.column(name) {
                Ok(column) => column.as_materialized_series().cast(dtype)?,
                Err(_) => Series::full_null(name.as_str().into(), piece.height(), dtype),
            };
            columns.push(series.into());
        }
        Ok(DataFrame::new(columns)?)
    };

    let mut result: Option<DataFrame> = None;
    for piece in &pieces {
        let conformed = conform(piece)?;
        match result.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&conformed)?;
            }
            None => result = Some(conformed),
        }
    }

    match result {
        Some(df) => Ok(df),
        None => {
            let columns: Vec<Column> = schema
                .iter()
                .map(|(name, dtype)| Series::new_empty(name.as_str().into(), dtype).into())
                .collect();
            Ok(DataFrame::new(columns)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;
    use pretty_assertions::assert_eq;

    fn typing_for(df: &DataFrame) -> ColumnTyping {
        let mut typing = ColumnTyping::default();
        for column in df.get_columns() {
            let kind = if is_numeric_dtype(column.dtype()) {
                ColumnKind::Numeric
            } else {
                ColumnKind::Text
            };
            typing.insert(column.name().to_string(), kind);
        }
        typing
    }

    #[test]
    fn test_groups_imputed_with_their_own_median() {
        // Every group has r = [2/3, 2/3, 1], so no row or column is dropped.
        let df = df![
            "market" => ["b", "a", "b", "a", "b", "a"],
            "rent" => [Some(10.0), Some(1.0), None, None, Some(30.0), Some(3.0)],
            "sf" => [None, None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.keys, vec!["market".to_string()]);
        assert_eq!(result.rows_dropped, 0);
        let markets: Vec<Option<&str>> =
            result.data.column("market").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(
            markets,
            vec![Some("a"), Some("a"), Some("a"), Some("b"), Some("b"), Some("b")]
        );

        let rent: Vec<Option<f64>> =
            result.data.column("rent").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(
            rent,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(10.0), Some(20.0), Some(30.0)]
        );
        let sf: Vec<Option<f64>> =
            result.data.column("sf").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(
            sf,
            vec![Some(5.0), Some(4.0), Some(6.0), Some(4.0), Some(3.0), Some(5.0)]
        );
    }

    #[test]
    fn test_sparse_rows_dropped_per_group() {
        // Group "a": r = [1, 1, 1, 1/3] -> median 1 -> row threshold 0.9.
        let df = df![
            "market" => ["a", "a", "a", "a"],
            "rent" => [Some(1.0), Some(2.0), Some(3.0), None],
            "sf" => [Some(1.0), Some(2.0), Some(3.0), None],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.data.height(), 3);
        assert_eq!(result.rows_dropped, 1);
        assert_eq!(result.reports[0].rows_before, 4);
        assert_eq!(result.reports[0].rows_after, 3);
    }

    #[test]
    fn test_column_dropped_in_one_group_is_null_there() {
        // In group "a", "note" is fully missing and gets dropped; group "b"
        // keeps it.
        let df = df![
            "market" => ["a", "a", "a", "b", "b", "b"],
            "rent" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "sf" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "note" => [None, None, None, Some("x"), Some("y"), Some("x")],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.data.height(), 6);
        assert_eq!(column_names(&result.data), vec!["market", "rent", "sf", "note"]);
        let notes: Vec<Option<&str>> =
            result.data.column("note").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(notes, vec![None, None, None, Some("x"), Some("y"), Some("x")]);
        assert_eq!(result.reports[0].dropped_columns, vec!["note".to_string()]);
        assert!(result.reports[1].dropped_columns.is_empty());
    }

    #[test]
    fn test_no_keys_single_group() {
        // r = 2/3 everywhere, so every row and column survives.
        let df = df![
            "rent" => [None, Some(2.0), Some(3.0)],
            "sf" => [Some(1.0), None, Some(3.0)],
            "occ" => [Some(1.0), Some(2.0), None],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert!(result.keys.is_empty());
        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].key, "<all rows>");
        assert_eq!(result.data.height(), 3);
        assert_eq!(f64_column(&result.data, "rent")[0], Some(2.5));
        assert_eq!(f64_column(&result.data, "occ")[2], Some(1.5));
    }

    #[test]
    fn test_column_dropped_in_every_group_is_removed() {
        // "vacancy" is fully missing in both groups.
        let df = df![
            "market" => ["a", "a", "a", "b", "b", "b"],
            "rent" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "vacancy" => [Option::<f64>::None, None, None, None, None, None],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.data.height(), 6);
        assert_eq!(column_names(&result.data), vec!["market", "rent"]);
    }

    #[test]
    fn test_rows_with_missing_key_are_dropped() {
        let df = df![
            "market" => [Some("a"), Some("a"), None],
            "rent" => [1.0, 2.0, 3.0],
            "sf" => [10.0, 20.0, 30.0],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.data.height(), 2);
        assert_eq!(result.rows_dropped, 1);
        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.data.column("market").unwrap().null_count(), 0);
        assert_eq!(f64_column(&result.data, "rent"), vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_time_fields_not_imputed_in_groups() {
        // 2018 groups use the fixed override thresholds, so nothing is dropped.
        let df = df![
            "market" => ["a", "a", "a", "a"],
            "year" => [Some(2018i64), Some(2019), None, Some(2019)],
            "rent" => [1.0, 2.0, 3.0, 4.0],
            "sf" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();
        let typing = typing_for(&df);
        let config = PipelineConfig::default();

        let result = GroupCleaner::new(&config, &typing)
            .clean(df, &GroupingPlan::default())
            .unwrap();

        assert_eq!(result.data.height(), 4);
        assert_eq!(result.data.column("year").unwrap().null_count(), 1);
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }
}
