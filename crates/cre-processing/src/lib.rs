//! Commercial Real-Estate Data Cleaning Library
//!
//! Cleans the lease, occupancy, price/availability and unemployment CSV
//! datasets with Polars, and joins the cleaned tables into a master table.
//!
//! # Overview
//!
//! A run is a strict sequence of stages:
//!
//! - **Deduplication**: exact duplicate rows dropped, first occurrence kept
//! - **Column Typing**: date-like, numeric or text by name and content
//! - **Date Normalization**: parse dates, backfill `year`/`quarter`/`month`
//! - **Year-Quarter**: derive the `year_quarter` grouping key
//! - **Group Cleaning** (dynamic): adaptive sparse dropping and imputation per group
//! - **Imputation** (minimal): column median and a `"missing"` placeholder
//! - **Outliers** (dynamic): 1.5×IQR row filter, column by column
//! - **Normalization** (dynamic): min-max scaling to `[0, 1]`
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cre_processing::{CleaningMode, DatasetKind, Pipeline, PipelineConfig};
//! use cre_processing::io::{load_csv, write_csv};
//! use std::path::Path;
//!
//! let df = load_csv(Path::new("data/Leases.csv"))?;
//!
//! let mut output = Pipeline::builder()
//!     .config(PipelineConfig::for_mode(CleaningMode::Dynamic))
//!     .dataset(DatasetKind::Leases)
//!     .build()?
//!     .process(df)?;
//!
//! write_csv(&mut output.data, Path::new("out/cleaned_leases_full_dynamic.csv"))?;
//! println!("Grouped by {:?}", output.summary.group_keys);
//! ```
//!
//! # Batch runs
//!
//! [`BatchRunner`] cleans all four datasets from one directory into another
//! and reports each dataset separately:
//!
//! ```rust,ignore
//! use cre_processing::{BatchRunner, CleaningMode, PipelineConfig};
//!
//! let report = BatchRunner::new("data", "out", PipelineConfig::for_mode(CleaningMode::Minimal))
//!     .force(true)
//!     .run()?;
//! println!("{} cleaned, {} failed", report.succeeded(), report.failed());
//! ```
//!
//! # Configuration
//!
//! Both profiles are presets of [`PipelineConfig`]; every stage can be tuned
//! through the builder:
//!
//! ```rust,ignore
//! use cre_processing::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .mode(CleaningMode::Dynamic)
//!     .row_threshold_floor(0.5)
//!     .iqr_multiplier(3.0)
//!     .normalize_numeric(false)
//!     .build()?;
//! ```

pub mod batch;
pub mod config;
pub mod datasets;
pub mod dates;
pub mod error;
pub mod grouping;
pub mod imputers;
pub mod io;
pub mod merge;
pub mod pipeline;
pub mod typer;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use batch::{BatchReport, BatchRunner, DatasetResult, clean_single};
pub use config::{
    CleaningMode, ConfigValidationError, NumericImputation, PipelineConfig, PipelineConfigBuilder,
    TextImputation, ThresholdOverride,
};
pub use datasets::DatasetKind;
pub use dates::{DateNormalizer, parse_date};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use grouping::{GroupCleaner, GroupKey, GroupingPlan};
pub use imputers::StatisticalImputer;
pub use merge::{JoinSpec, MasterTable, MergePlan};
pub use pipeline::{CleaningStage, IqrBounds, MinMaxNormalizer, OutlierFilter, Pipeline, PipelineBuilder};
pub use typer::ColumnTyper;
pub use types::{
    ActionType, CleaningAction, CleaningOutput, CleaningPreview, CleaningSummary, ColumnKind,
    ColumnTyping, GroupPreview, GroupReport, GroupThresholds,
};
