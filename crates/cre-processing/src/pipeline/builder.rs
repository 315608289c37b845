//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the cleaning workflow.

use crate::config::PipelineConfig;
use crate::datasets::DatasetKind;
use crate::dates::{DateNormalizer, derive_year_quarter};
use crate::error::{CleaningError, Result};
use crate::grouping::{GroupCleaner, compute_thresholds, partition};
use crate::imputers::StatisticalImputer;
use crate::pipeline::{CleaningStage, MinMaxNormalizer, OutlierFilter};
use crate::typer::ColumnTyper;
use crate::types::{
    ActionType, CleaningAction, CleaningOutput, CleaningPreview, CleaningSummary, ColumnKind,
    GroupPreview,
};
use crate::utils::numeric_null_count;
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, error, info};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use cre_processing::{CleaningMode, DatasetKind, Pipeline, PipelineConfig};
///
/// let output = Pipeline::builder()
///     .config(PipelineConfig::for_mode(CleaningMode::Minimal))
///     .dataset(DatasetKind::Leases)
///     .build()?
///     .process(dataframe)?;
///
/// println!("{} rows left", output.summary.rows_after);
/// ```
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    dataset: DatasetKind,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset(&self) -> DatasetKind {
        self.dataset
    }

    /// Clean a DataFrame.
    ///
    /// Returns the cleaned table together with a summary of every action
    /// taken.
    pub fn process(&self, df: DataFrame) -> Result<CleaningOutput> {
        match self.process_internal(df) {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Pipeline error for {}: {}", self.dataset, e);
                Err(e)
            }
        }
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningOutput> {
        let start_time = Instant::now();
        let config = &self.config;

        info!(
            "Cleaning {} ({} rows x {} columns, {} profile)",
            self.dataset,
            df.height(),
            df.width(),
            config.mode.as_str()
        );

        let mut summary = CleaningSummary::new(self.dataset.as_str(), config.mode.as_str());
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        // Step 1: Remove duplicates
        let df = if config.remove_duplicates {
            info!("Step 1: Removing duplicate rows...");
            let (df, removed) = deduplicate(df)
                .map_err(|e| CleaningError::stage(CleaningStage::Deduplication, e))?;
            summary.duplicates_removed = removed;
            if removed > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::DuplicatesRemoved,
                    "dataset",
                    format!("Removed {} duplicate rows", removed),
                ));
            }
            df
        } else {
            info!("Step 1: Skipping duplicate removal (disabled)");
            df
        };

        // Step 2: Classify and coerce columns
        info!("Step 2: Typing columns...");
        let (df, typing, actions) = ColumnTyper::new(config)
            .apply(df)
            .map_err(|e| CleaningError::stage(CleaningStage::ColumnTyping, e))?;
        for (name, kind) in &typing.columns {
            debug!("  {}: {}", name, kind.as_str());
        }
        summary.actions.extend(actions);
        summary.column_kinds = typing.clone();

        // Step 3: Dates and time fields
        info!("Step 3: Normalizing dates...");
        let date_columns = typing.names_of(ColumnKind::Date);
        let normalizer = DateNormalizer::new(&config.time_columns);
        let (mut df, actions) = normalizer
            .apply(df, &date_columns)
            .map_err(|e| CleaningError::stage(CleaningStage::DateNormalization, e))?;
        summary.actions.extend(actions);

        // Step 4: Year/quarter key, only used for grouping
        if config.group_cleaning && self.dataset.derives_year_quarter() {
            let derived = derive_year_quarter(&mut df)
                .map_err(|e| CleaningError::stage(CleaningStage::YearQuarter, e))?;
            if derived {
                info!("Step 4: Derived year_quarter");
                summary.add_action(CleaningAction::new(
                    ActionType::YearQuarterDerived,
                    "year_quarter",
                    "Derived 'year_quarter' from 'year' and 'quarter'",
                ));
            }
        }

        // Step 5: Group cleaning or whole-table imputation
        let mut df = if config.group_cleaning {
            info!("Step 5: Cleaning groups...");
            let result = GroupCleaner::new(config, &typing)
                .clean(df, &self.dataset.grouping_plan())
                .map_err(|e| CleaningError::stage(CleaningStage::GroupCleaning, e))?;

            summary.group_keys = result.keys;
            summary.sparse_rows_dropped = result.rows_dropped;
            summary.groups = result.reports;
            summary.actions.extend(result.actions);

            // Stacking groups widens integers to floats.
            normalizer
                .coerce_time_fields(result.data)
                .map_err(|e| CleaningError::stage(CleaningStage::GroupCleaning, e))?
        } else {
            info!("Step 5: Imputing missing values...");
            let actions =
                StatisticalImputer::impute_frame(&mut df, &typing, config, &config.time_columns)
                    .map_err(|e| CleaningError::stage(CleaningStage::Imputation, e))?;
            summary.actions.extend(actions);
            df
        };

        // Step 6: Outliers
        if config.remove_outliers {
            info!("Step 6: Filtering outliers...");
            summary.outlier_rows_removed =
                OutlierFilter::remove_outliers(&mut df, config, &mut summary.actions)
                    .map_err(|e| CleaningError::stage(CleaningStage::OutlierFilter, e))?;
        } else {
            info!("Step 6: Skipping outlier filtering (disabled)");
        }

        // Step 7: Min-max scaling
        if config.normalize_numeric {
            info!("Step 7: Normalizing numeric columns...");
            MinMaxNormalizer::normalize(&mut df, config, &mut summary.actions)
                .map_err(|e| CleaningError::stage(CleaningStage::Normalization, e))?;
        } else {
            info!("Step 7: Skipping normalization (disabled)");
        }

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.remaining_numeric_nulls = numeric_null_count(&df);
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Finished {}: {} -> {} rows, {} -> {} columns in {}ms",
            self.dataset,
            summary.rows_before,
            summary.rows_after,
            summary.columns_before,
            summary.columns_after,
            summary.duration_ms
        );

        Ok(CleaningOutput { data: df, summary })
    }

    /// Preview a run: column kinds, group keys and the thresholds each group
    /// would get. Nothing is dropped.
    pub fn preview(&self, df: DataFrame) -> Result<CleaningPreview> {
        let config = &self.config;
        let rows = df.height();
        let columns = df.width();

        let (df, duplicate_rows) = if config.remove_duplicates {
            deduplicate(df).map_err(|e| CleaningError::stage(CleaningStage::Deduplication, e))?
        } else {
            (df, 0)
        };
        let (df, typing, _) = ColumnTyper::new(config)
            .apply(df)
            .map_err(|e| CleaningError::stage(CleaningStage::ColumnTyping, e))?;
        let (mut df, _) = DateNormalizer::new(&config.time_columns)
            .apply(df, &typing.names_of(ColumnKind::Date))
            .map_err(|e| CleaningError::stage(CleaningStage::DateNormalization, e))?;
        if config.group_cleaning && self.dataset.derives_year_quarter() {
            derive_year_quarter(&mut df)
                .map_err(|e| CleaningError::stage(CleaningStage::YearQuarter, e))?;
        }

        let (group_keys, groups) = if config.group_cleaning {
            preview_groups(&df, self)
                .map_err(|e| CleaningError::stage(CleaningStage::GroupCleaning, e))?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(CleaningPreview {
            dataset: self.dataset.as_str().to_string(),
            mode: config.mode.as_str().to_string(),
            rows,
            columns,
            duplicate_rows,
            column_kinds: typing,
            group_keys,
            groups,
        })
    }
}

fn deduplicate(df: DataFrame) -> anyhow::Result<(DataFrame, usize)> {
    let before = df.height();
    let df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - df.height();
    debug!("Removed {} duplicate rows", removed);
    Ok((df, removed))
}

fn preview_groups(
    df: &DataFrame,
    pipeline: &Pipeline,
) -> anyhow::Result<(Vec<String>, Vec<GroupPreview>)> {
    let keys = pipeline.dataset.grouping_plan().resolve(df);
    let mut previews = Vec::new();
    for (key, rows) in partition(df, &keys)? {
        let count = rows.len();
        let group = df.take(&IdxCa::from_vec("idx".into(), rows))?;
        previews.push(GroupPreview {
            key: key.to_string(),
            rows: count,
            thresholds: compute_thresholds(&group, &pipeline.config)?,
        });
    }
    Ok((keys, previews))
}

/// Builder for creating a [`Pipeline`] with custom configuration.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    dataset: Option<DatasetKind>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the dataset being cleaned. Defaults to [`DatasetKind::Generic`].
    pub fn dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;

        Ok(Pipeline {
            config,
            dataset: self.dataset.unwrap_or(DatasetKind::Generic),
        })
    }
}
