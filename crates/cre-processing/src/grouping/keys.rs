//! Group key discovery and row partitioning.

use crate::dates::{YEAR_QUARTER, find_column};
use crate::utils::is_numeric_dtype;
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// How the grouping keys of a dataset are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingPlan {
    /// Every candidate present in the frame; the fallback keys when none is.
    Discover {
        candidates: Vec<String>,
        fallback: Vec<String>,
    },
    /// The preferred keys when all of them exist, else the fallback keys
    /// that exist.
    Fixed {
        preferred: Vec<String>,
        fallback: Vec<String>,
    },
}

impl Default for GroupingPlan {
    fn default() -> Self {
        Self::Discover {
            candidates: [
                "state",
                "city",
                "market",
                "region",
                "building_classification",
                YEAR_QUARTER,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback: vec!["market".to_string(), YEAR_QUARTER.to_string()],
        }
    }
}

impl GroupingPlan {
    /// `[state, year]`, or `[year]` when there is no state column.
    pub fn state_year() -> Self {
        Self::Fixed {
            preferred: vec!["state".to_string(), "year".to_string()],
            fallback: vec!["year".to_string()],
        }
    }

    /// Resolve the plan against a frame. Returned names are the frame's own
    /// spelling of each key. Empty when no key is usable.
    pub fn resolve(&self, df: &DataFrame) -> Vec<String> {
        let present = |names: &[String]| -> Vec<String> {
            names.iter().filter_map(|n| find_column(df, n)).collect()
        };

        match self {
            Self::Discover {
                candidates,
                fallback,
            } => {
                let keys = present(candidates);
                if keys.is_empty() { present(fallback) } else { keys }
            }
            Self::Fixed {
                preferred,
                fallback,
            } => {
                let keys = present(preferred);
                if !preferred.is_empty() && keys.len() == preferred.len() {
                    keys
                } else {
                    present(fallback)
                }
            }
        }
    }
}

/// One component of a group key.
///
/// Orders numbers numerically, then text lexicographically, then missing.
#[derive(Debug, Clone)]
pub enum KeyValue {
    Number(f64),
    Text(String),
    Missing,
}

impl KeyValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Text(_) => 1,
            Self::Missing => 2,
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) if v.fract() == 0.0 => write!(f, "{}", *v as i64),
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

/// Ordered tuple of key values identifying a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey(pub Vec<KeyValue>);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<all rows>");
        }
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

fn key_values(series: &Series) -> Result<Vec<KeyValue>> {
    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|opt| match opt {
                Some(v) if !v.is_nan() => KeyValue::Number(v),
                _ => KeyValue::Missing,
            })
            .collect());
    }

    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|opt| match opt {
            Some(s) => KeyValue::Text(s.to_string()),
            None => KeyValue::Missing,
        })
        .collect())
}

/// Partition row indices by key, in key order. Row order inside a group is
/// preserved. Rows with a missing key value belong to no group. With no keys
/// every row lands in one group.
pub fn partition(df: &DataFrame, keys: &[String]) -> Result<BTreeMap<GroupKey, Vec<IdxSize>>> {
    let mut columns = Vec::with_capacity(keys.len());
    for key in keys {
        columns.push(key_values(df.column(key)?.as_materialized_series())?);
    }

    let mut groups: BTreeMap<GroupKey, Vec<IdxSize>> = BTreeMap::new();
    for row in 0..df.height() {
        let key = GroupKey(columns.iter().map(|col| col[row].clone()).collect());
        if key.0.iter().any(|v| matches!(v, KeyValue::Missing)) {
            continue;
        }
        groups.entry(key).or_default().push(row as IdxSize);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_uses_present_candidates() {
        let df = df![
            "market" => ["austin"],
            "State" => ["tx"],
            "rent" => [1.0],
        ]
        .unwrap();
        let keys = GroupingPlan::default().resolve(&df);
        assert_eq!(keys, vec!["State".to_string(), "market".to_string()]);
    }

    #[test]
    fn test_discover_without_candidates_is_empty() {
        let df = df!["rent" => [1.0]].unwrap();
        assert!(GroupingPlan::default().resolve(&df).is_empty());
    }

    #[test]
    fn test_state_year_falls_back_to_year() {
        let both = df!["state" => ["ny"], "year" => [2019i64]].unwrap();
        let year_only = df!["year" => [2019i64], "rate" => [4.0]].unwrap();

        let plan = GroupingPlan::state_year();
        assert_eq!(plan.resolve(&both), vec!["state".to_string(), "year".to_string()]);
        assert_eq!(plan.resolve(&year_only), vec!["year".to_string()]);
    }

    #[test]
    fn test_key_ordering() {
        let mut values = vec![
            KeyValue::Missing,
            KeyValue::Text("b".to_string()),
            KeyValue::Number(10.0),
            KeyValue::Text("a".to_string()),
            KeyValue::Number(9.0),
        ];
        values.sort();
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["9", "10", "a", "b", "<missing>"]);
    }

    #[test]
    fn test_partition_orders_groups_and_skips_missing() {
        let df = df![
            "market" => [Some("dallas"), None, Some("austin"), Some("dallas"), Some("austin")],
            "year" => [Some(2019i64), Some(2019), Some(2019), Some(2019), None],
        ]
        .unwrap();
        let groups = partition(&df, &["market".to_string(), "year".to_string()]).unwrap();
        let ordered: Vec<(String, Vec<IdxSize>)> = groups
            .into_iter()
            .map(|(k, rows)| (k.to_string(), rows))
            .collect();

        assert_eq!(
            ordered,
            vec![
                ("austin | 2019".to_string(), vec![2]),
                ("dallas | 2019".to_string(), vec![0, 3]),
            ]
        );
    }

    #[test]
    fn test_partition_without_keys_is_single_group() {
        let df = df!["rent" => [1.0, 2.0]].unwrap();
        let groups = partition(&df, &[]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.values().next().unwrap(), &vec![0, 1]);
    }
}
