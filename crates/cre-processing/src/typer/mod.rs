//! Column typer.
//!
//! Classifies every column as date-like, numeric, or textual and coerces it:
//!
//! - numeric-by-content string columns become Float64, with unparseable
//!   values turned into nulls;
//! - text columns are optionally stripped, lowercased and stripped of
//!   punctuation;
//! - date-like columns are only classified here and parsed by
//!   [`crate::dates::DateNormalizer`].

mod classify;
mod coerce;

pub use classify::{classify_column, is_date_like_name};

use crate::config::PipelineConfig;
use crate::types::{ActionType, CleaningAction, ColumnKind, ColumnTyping};
use crate::utils::column_names;
use anyhow::Result;
use coerce::{normalize_text_series, string_to_float};
use polars::prelude::*;
use tracing::{debug, warn};

/// Classifies and coerces columns.
pub struct ColumnTyper<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ColumnTyper<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Classify all columns without touching the data.
    pub fn classify(&self, df: &DataFrame) -> Result<ColumnTyping> {
        let mut typing = ColumnTyping::default();
        for name in column_names(df) {
            let series = df.column(&name)?.as_materialized_series();
            typing.insert(name.clone(), classify_column(&name, series, self.config));
        }
        Ok(typing)
    }

    /// Classify and coerce every column.
    pub fn apply(
        &self,
        mut df: DataFrame,
    ) -> Result<(DataFrame, ColumnTyping, Vec<CleaningAction>)> {
        let typing = self.classify(&df)?;
        let mut actions = Vec::new();

        for (name, kind) in &typing.columns {
            let series = df.column(name)?.as_materialized_series().clone();
            match kind {
                ColumnKind::Numeric if series.dtype() == &DataType::String => {
                    let before_nulls = series.null_count();
                    match string_to_float(&series) {
                        Ok(converted) => {
                            let coerced_to_null = converted.null_count() - before_nulls;
                            df.replace(name, converted)?;
                            debug!(
                                "Coerced '{}' to numeric ({} invalid values became null)",
                                name, coerced_to_null
                            );
                            actions.push(CleaningAction::new(
                                ActionType::TypeCoerced,
                                name,
                                format!(
                                    "Converted '{}' from text to numeric; {} invalid values set to missing",
                                    name, coerced_to_null
                                ),
                            ));
                        }
                        Err(e) => {
                            warn!("Failed to coerce '{}' to numeric: {}", name, e);
                        }
                    }
                }
                ColumnKind::Text if self.config.normalize_text => {
                    let (normalized, changed) = normalize_text_series(&series)?;
                    df.replace(name, normalized)?;
                    if changed > 0 {
                        actions.push(CleaningAction::new(
                            ActionType::TextNormalized,
                            name,
                            format!("Normalized {} text values in '{}'", changed, name),
                        ));
                    }
                }
                _ => {}
            }
        }

        debug!("Column kinds: {:?}", typing.counts());
        Ok((df, typing, actions))
    }
}
