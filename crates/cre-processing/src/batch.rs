//! Batch cleaning of the four fixed datasets.

use crate::config::PipelineConfig;
use crate::datasets::DatasetKind;
use crate::error::{CleaningError, Result, ResultExt};
use crate::io::{load_csv, write_csv};
use crate::pipeline::Pipeline;
use crate::types::CleaningSummary;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome of one dataset in a batch run.
#[derive(Debug, Serialize)]
pub struct DatasetResult {
    pub dataset: DatasetKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: Option<CleaningSummary>,
    pub error_code: Option<String>,
    pub error: Option<String>,
}

impl DatasetResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub mode: String,
    /// True when every output already existed and nothing was run.
    pub skipped: bool,
    pub results: Vec<DatasetResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Cleans every known dataset from an input directory into an output
/// directory.
#[derive(Debug)]
pub struct BatchRunner {
    input_dir: PathBuf,
    output_dir: PathBuf,
    config: PipelineConfig,
    force: bool,
}

impl BatchRunner {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            config,
            force: false,
        }
    }

    /// Re-run even when all outputs already exist.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn input_path(&self, kind: DatasetKind) -> Option<PathBuf> {
        kind.input_file_name().map(|name| self.input_dir.join(name))
    }

    pub fn output_path(&self, kind: DatasetKind) -> Option<PathBuf> {
        kind.output_file_name(self.config.mode)
            .map(|name| self.output_dir.join(name))
    }

    pub fn all_outputs_exist(&self) -> bool {
        DatasetKind::ALL
            .iter()
            .all(|kind| self.output_path(*kind).is_some_and(|p| p.exists()))
    }

    /// Clean all datasets. A failing dataset is reported and does not stop
    /// the others.
    pub fn run(&self) -> Result<BatchReport> {
        let mode = self.config.mode.as_str().to_string();

        if !self.force && self.all_outputs_exist() {
            info!(
                "All {} outputs already exist in {}; skipping",
                mode,
                self.output_dir.display()
            );
            return Ok(BatchReport {
                mode,
                skipped: true,
                results: Vec::new(),
            });
        }

        let mut results = Vec::with_capacity(DatasetKind::ALL.len());
        for kind in DatasetKind::ALL {
            let (Some(input), Some(output)) = (self.input_path(kind), self.output_path(kind)) else {
                continue;
            };

            let result = match self.clean_file(kind, &input, &output) {
                Ok(summary) => DatasetResult {
                    dataset: kind,
                    input,
                    output,
                    summary: Some(summary),
                    error_code: None,
                    error: None,
                },
                Err(e) => {
                    error!("Failed to clean {}: {}", kind, e);
                    DatasetResult {
                        dataset: kind,
                        input,
                        output,
                        summary: None,
                        error_code: Some(e.error_code().to_string()),
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let report = BatchReport {
            mode,
            skipped: false,
            results,
        };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Load, clean and save one file.
    pub fn clean_file(
        &self,
        kind: DatasetKind,
        input: &Path,
        output: &Path,
    ) -> Result<CleaningSummary> {
        let df = load_csv(input)?;
        let pipeline = Pipeline::builder()
            .config(self.config.clone())
            .dataset(kind)
            .build()?;
        let mut cleaned = pipeline.process(df).context(kind.as_str())?;
        write_csv(&mut cleaned.data, output)?;
        Ok(cleaned.summary)
    }
}

/// Clean a single file outside a batch.
pub fn clean_single(
    input: &Path,
    output: &Path,
    kind: DatasetKind,
    config: PipelineConfig,
) -> Result<CleaningSummary> {
    if input == output {
        return Err(CleaningError::InvalidConfig(
            "output path must differ from the input path".to_string(),
        ));
    }
    BatchRunner::new(".", ".", config).clean_file(kind, input, output)
}
