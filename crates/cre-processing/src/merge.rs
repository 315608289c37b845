//! Master table: leases enriched with market, price and labour context.
//!
//! Each right-hand table is reduced to one row per join key (mean of its
//! value columns) before the left join, so the lease row count is preserved.

use crate::error::{CleaningError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const ROW_INDEX: &str = "__lease_row";

/// Join keys and value columns taken from one right-hand table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl JoinSpec {
    pub fn new<K, V>(keys: K, values: V) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// How each table joins onto leases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePlan {
    pub occupancy: JoinSpec,
    pub price: JoinSpec,
    pub unemployment: JoinSpec,
}

impl Default for MergePlan {
    fn default() -> Self {
        Self {
            occupancy: JoinSpec::new(["market", "year", "quarter"], ["occupancy_proportion"]),
            price: JoinSpec::new(["market", "year", "quarter"], ["overall_rent"]),
            unemployment: JoinSpec::new(["state", "year"], ["unemployment_rate"]),
        }
    }
}

pub struct MasterTable;

impl MasterTable {
    /// Left-join occupancy, price and unemployment onto leases.
    pub fn build(
        leases: &DataFrame,
        occupancy: &DataFrame,
        price: &DataFrame,
        unemployment: &DataFrame,
        plan: &MergePlan,
    ) -> Result<DataFrame> {
        let mut master = leases.clone();
        for (name, right, spec) in [
            ("occupancy", occupancy, &plan.occupancy),
            ("price", price, &plan.price),
            ("unemployment", unemployment, &plan.unemployment),
        ] {
            master = Self::join_one(&master, right, spec)
                .map_err(|e| e.with_context(format!("Joining {}", name)))?;
            debug!("After {} join: {} columns", name, master.width());
        }

        info!(
            "Master table built: {} rows x {} columns",
            master.height(),
            master.width()
        );
        Ok(master)
    }

    fn join_one(left: &DataFrame, right: &DataFrame, spec: &JoinSpec) -> Result<DataFrame> {
        for key in &spec.keys {
            require_column(left, key)?;
            require_column(right, key)?;
        }
        for value in &spec.values {
            require_column(right, value)?;
        }

        // Right keys take the left dtype so an Int64 year meets an Int64 year.
        let mut key_casts = Vec::with_capacity(spec.keys.len());
        for key in &spec.keys {
            let dtype = left.column(key)?.dtype().clone();
            key_casts.push(col(key.as_str()).cast(dtype));
        }
        let keys: Vec<Expr> = spec.keys.iter().map(|k| col(k.as_str())).collect();
        let means: Vec<Expr> = spec.values.iter().map(|v| col(v.as_str()).mean()).collect();

        let reduced = right
            .clone()
            .lazy()
            .with_columns(key_casts)
            .group_by_stable(keys.clone())
            .agg(means);

        let joined = left
            .clone()
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .join(reduced, keys.clone(), keys, JoinArgs::new(JoinType::Left))
            .sort([ROW_INDEX], SortMultipleOptions::default())
            .collect()
            .map_err(|e| CleaningError::MergeFailed(e.to_string()))?;
        Ok(joined.drop(ROW_INDEX)?)
    }
}

fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.get_column_index(name).is_none() {
        return Err(CleaningError::ColumnNotFound(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leases() -> DataFrame {
        df![
            "market" => ["Austin", "Austin", "Dallas"],
            "state" => ["TX", "TX", "TX"],
            "year" => [2019i64, 2019, 2020],
            "quarter" => [1i64, 1, 2],
            "leasedSF" => [100.0, 200.0, 300.0],
        ]
        .unwrap()
    }

    fn occupancy() -> DataFrame {
        df![
            "market" => ["Austin", "Austin", "Dallas"],
            "year" => [2019i64, 2019, 2020],
            "quarter" => [1i64, 1, 2],
            "occupancy_proportion" => [0.8, 0.9, 0.7],
        ]
        .unwrap()
    }

    fn price() -> DataFrame {
        df![
            "market" => ["Austin"],
            "year" => [2019.0f64],
            "quarter" => [1.0f64],
            "overall_rent" => [40.0],
        ]
        .unwrap()
    }

    fn unemployment() -> DataFrame {
        df![
            "state" => ["TX", "TX"],
            "year" => [2019i64, 2020],
            "unemployment_rate" => [3.5, 7.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_build_keeps_lease_rows_and_averages() {
        let master =
            MasterTable::build(&leases(), &occupancy(), &price(), &unemployment(), &MergePlan::default())
                .unwrap();

        assert_eq!(master.height(), 3);
        let occ = master.column("occupancy_proportion").unwrap().f64().unwrap();
        assert!((occ.get(0).unwrap() - 0.85).abs() < 1e-9);
        assert!((occ.get(2).unwrap() - 0.7).abs() < 1e-9);

        let rent = master.column("overall_rent").unwrap().f64().unwrap();
        assert_eq!(rent.get(0), Some(40.0));
        assert_eq!(rent.get(2), None);

        let rate = master.column("unemployment_rate").unwrap().f64().unwrap();
        assert_eq!(rate.get(2), Some(7.0));
    }

    #[test]
    fn test_missing_value_column() {
        let occupancy = occupancy().drop("occupancy_proportion").unwrap();
        let err =
            MasterTable::build(&leases(), &occupancy, &price(), &unemployment(), &MergePlan::default())
                .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.to_string().contains("occupancy_proportion"));
    }

    #[test]
    fn test_missing_key_on_leases() {
        let leases = leases().drop("state").unwrap();
        let err =
            MasterTable::build(&leases, &occupancy(), &price(), &unemployment(), &MergePlan::default())
                .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
