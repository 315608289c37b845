use chrono::Local;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a column is treated by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Date,
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Numeric => "numeric",
            Self::Text => "text",
        }
    }
}

/// Column classification produced by the typer, in column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnTyping {
    pub columns: Vec<(String, ColumnKind)>,
}

impl ColumnTyping {
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| *k)
    }

    pub fn names_of(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, kind: ColumnKind) {
        let name = name.into();
        if let Some(entry) = self.columns.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = kind;
        } else {
            self.columns.push((name, kind));
        }
    }

    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, kind) in &self.columns {
            *counts.entry(kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Drop thresholds in effect for one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupThresholds {
    /// Rows with completeness below this are dropped.
    pub row_threshold: f64,
    /// Columns with missingness at or above this are dropped.
    pub column_threshold: f64,
    /// True when a year override replaced the adaptive values.
    pub overridden: bool,
}

/// What happened to one group during group cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub key: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub thresholds: GroupThresholds,
    pub dropped_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DuplicatesRemoved,
    TypeCoerced,
    TextNormalized,
    DatesParsed,
    TimeFieldsBackfilled,
    YearQuarterDerived,
    SparseRowsDropped,
    SparseColumnsDropped,
    ValuesImputed,
    OutliersRemoved,
    Normalized,
}

/// One recorded pipeline action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    pub target: String,
    pub description: String,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Serializable record of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub dataset: String,
    pub mode: String,
    /// Local time the run started, RFC 3339.
    pub generated_at: String,
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub duplicates_removed: usize,
    pub sparse_rows_dropped: usize,
    pub outlier_rows_removed: usize,
    pub column_kinds: ColumnTyping,
    pub group_keys: Vec<String>,
    pub groups: Vec<GroupReport>,
    pub actions: Vec<CleaningAction>,
    pub remaining_numeric_nulls: usize,
}

impl CleaningSummary {
    pub fn new(dataset: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            mode: mode.into(),
            generated_at: Local::now().to_rfc3339(),
            duration_ms: 0,
            rows_before: 0,
            rows_after: 0,
            columns_before: 0,
            columns_after: 0,
            duplicates_removed: 0,
            sparse_rows_dropped: 0,
            outlier_rows_removed: 0,
            column_kinds: ColumnTyping::default(),
            group_keys: Vec::new(),
            groups: Vec::new(),
            actions: Vec::new(),
            remaining_numeric_nulls: 0,
        }
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn columns_removed(&self) -> usize {
        self.columns_before.saturating_sub(self.columns_after)
    }
}

/// Thresholds a group would be cleaned with, computed without dropping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPreview {
    pub key: String,
    pub rows: usize,
    pub thresholds: GroupThresholds,
}

/// What a run would do, without doing the lossy stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningPreview {
    pub dataset: String,
    pub mode: String,
    pub rows: usize,
    pub columns: usize,
    pub duplicate_rows: usize,
    pub column_kinds: ColumnTyping,
    pub group_keys: Vec<String>,
    pub groups: Vec<GroupPreview>,
}

/// Cleaned table plus the summary of how it was produced.
#[derive(Debug, Clone)]
pub struct CleaningOutput {
    pub data: DataFrame,
    pub summary: CleaningSummary,
}
