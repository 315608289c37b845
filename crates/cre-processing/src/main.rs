//! CLI entry point for the real-estate data cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use cre_processing::io::{load_csv, write_csv};
use cre_processing::{
    BatchReport, BatchRunner, CleaningMode, CleaningPreview, CleaningSummary, DatasetKind,
    MasterTable, MergePlan, Pipeline, PipelineConfig,
};
use dotenv::dotenv;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible cleaning profile enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Per-group adaptive cleaning, outlier removal and normalization
    Dynamic,
    /// Median and placeholder fill only, nothing dropped
    Minimal,
}

impl From<CliMode> for CleaningMode {
    fn from(cli: CliMode) -> Self {
        match cli {
            CliMode::Dynamic => CleaningMode::Dynamic,
            CliMode::Minimal => CleaningMode::Minimal,
        }
    }
}

/// CLI-compatible dataset kind enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliKind {
    Leases,
    Occupancy,
    PriceAvailability,
    Unemployment,
    /// Any other CSV
    Generic,
}

impl From<CliKind> for DatasetKind {
    fn from(cli: CliKind) -> Self {
        match cli {
            CliKind::Leases => DatasetKind::Leases,
            CliKind::Occupancy => DatasetKind::Occupancy,
            CliKind::PriceAvailability => DatasetKind::PriceAvailability,
            CliKind::Unemployment => DatasetKind::Unemployment,
            CliKind::Generic => DatasetKind::Generic,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cleaning pipeline for commercial real-estate datasets",
    long_about = "Cleans the lease, occupancy, price/availability and unemployment CSV datasets \
                  and joins them into a master table.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG    Log filter; wins over --log-level (also read from .env)\n\n\
                  EXAMPLES:\n  \
                  # Clean all four datasets with the dynamic profile\n  \
                  cre-processing clean --input-dir data --output-dir outputs\n\n  \
                  # Minimal profile, re-running even if outputs exist\n  \
                  cre-processing clean --mode minimal --force\n\n  \
                  # Preview grouping and thresholds for one file\n  \
                  cre-processing file -i data/Leases.csv --dry-run\n\n  \
                  # Build the master table from cleaned outputs\n  \
                  cre-processing merge --dir outputs"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings, errors and the final result
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    #[arg(long, global = true)]
    json: bool,

    /// JSON file with a pipeline configuration
    ///
    /// Keys left out take the preset of the selected mode.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the four datasets in a directory
    Clean {
        /// Directory holding the raw CSV files
        #[arg(long, default_value = "data")]
        input_dir: PathBuf,

        /// Directory for cleaned outputs
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,

        /// Cleaning profile
        #[arg(long, value_enum)]
        mode: Option<CliMode>,

        /// Re-run even when every output already exists
        #[arg(long)]
        force: bool,
    },

    /// Clean a single CSV file
    File {
        /// Path to the CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path
        ///
        /// Defaults to a name derived from the dataset and mode, next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dataset kind; detected from the file name when omitted
        #[arg(long, value_enum)]
        kind: Option<CliKind>,

        /// Cleaning profile
        #[arg(long, value_enum)]
        mode: Option<CliMode>,

        /// Show column typing, group keys and per-group thresholds without cleaning
        #[arg(long)]
        dry_run: bool,
    },

    /// Join cleaned outputs into a master table keyed on leases
    Merge {
        /// Directory holding the cleaned outputs
        #[arg(long, default_value = "outputs")]
        dir: PathBuf,

        /// Profile whose outputs are merged
        #[arg(long, value_enum, default_value = "dynamic")]
        mode: CliMode,

        /// Output CSV path (default: <dir>/master_table_<mode>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env may set RUST_LOG, so load it before the subscriber reads the filter
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let result = match &args.command {
        Command::Clean {
            input_dir,
            output_dir,
            mode,
            force,
        } => run_clean(&args, input_dir, output_dir, *mode, *force),
        Command::File {
            input,
            output,
            kind,
            mode,
            dry_run,
        } => run_file(&args, input, output.as_deref(), *kind, *mode, *dry_run),
        Command::Merge { dir, mode, output } => run_merge(&args, dir, *mode, output.as_deref()),
    };

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}

/// Load `--config` if given, with `--mode` taking precedence over the file.
fn load_config(path: Option<&Path>, mode: Option<CliMode>) -> Result<PipelineConfig> {
    let mode = mode.map(CleaningMode::from);
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PipelineConfig::from_json(&json, mode)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PipelineConfig::for_mode(mode.unwrap_or_default()),
    };
    config.validate()?;
    Ok(config)
}

fn run_clean(
    args: &Args,
    input_dir: &Path,
    output_dir: &Path,
    mode: Option<CliMode>,
    force: bool,
) -> Result<()> {
    let config = load_config(args.config.as_deref(), mode)?;
    info!(
        "Cleaning datasets in {} ({} profile)",
        input_dir.display(),
        config.mode.as_str()
    );

    let report = BatchRunner::new(input_dir, output_dir, config)
        .force(force)
        .run()?;

    if args.json {
        print_json(&report)?;
    } else {
        print_batch_report(&report);
    }

    if report.failed() > 0 {
        return Err(anyhow!(
            "{} of {} datasets failed",
            report.failed(),
            report.results.len()
        ));
    }
    Ok(())
}

fn run_file(
    args: &Args,
    input: &Path,
    output: Option<&Path>,
    kind: Option<CliKind>,
    mode: Option<CliMode>,
    dry_run: bool,
) -> Result<()> {
    let config = load_config(args.config.as_deref(), mode)?;
    let kind = kind
        .map(DatasetKind::from)
        .unwrap_or_else(|| DatasetKind::from_file_name(input));
    info!("Treating {} as {}", input.display(), kind);

    let df = load_csv(input)?;
    let pipeline = Pipeline::builder().config(config).dataset(kind).build()?;

    if dry_run {
        let preview = pipeline.preview(df)?;
        if args.json {
            print_json(&preview)?;
        } else {
            print_preview(input, &preview);
        }
        return Ok(());
    }

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, kind, pipeline.config().mode),
    };
    if output == input {
        return Err(anyhow!("Output path must differ from the input path"));
    }

    let mut cleaned = pipeline.process(df)?;
    write_csv(&mut cleaned.data, &output)?;

    if args.json {
        print_json(&cleaned.summary)?;
    } else {
        print_summary(&output, &cleaned.summary);
    }
    Ok(())
}

fn default_output_path(input: &Path, kind: DatasetKind, mode: CleaningMode) -> PathBuf {
    let name = kind
        .output_file_name(mode)
        .map(str::to_string)
        .unwrap_or_else(|| DatasetKind::generic_output_name(input, mode));
    input.with_file_name(name)
}

#[derive(Serialize)]
struct MergeReport {
    output: PathBuf,
    rows: usize,
    columns: usize,
}

fn run_merge(args: &Args, dir: &Path, mode: CliMode, output: Option<&Path>) -> Result<()> {
    let mode = CleaningMode::from(mode);
    let load = |kind: DatasetKind| -> Result<_> {
        let name = kind
            .output_file_name(mode)
            .ok_or_else(|| anyhow!("No cleaned output name for {}", kind))?;
        load_csv(&dir.join(name)).with_context(|| format!("Loading cleaned {}", kind))
    };

    let leases = load(DatasetKind::Leases)?;
    let occupancy = load(DatasetKind::Occupancy)?;
    let price = load(DatasetKind::PriceAvailability)?;
    let unemployment = load(DatasetKind::Unemployment)?;

    let mut master =
        MasterTable::build(&leases, &occupancy, &price, &unemployment, &MergePlan::default())?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(format!("master_table_{}.csv", mode.as_str())));
    write_csv(&mut master, &output)?;

    let report = MergeReport {
        output,
        rows: master.height(),
        columns: master.width(),
    };
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "Master table: {} ({} rows x {} columns)",
            report.output.display(),
            report.rows,
            report.columns
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the outcome of a batch run.
///
/// Uses `println!` on purpose: this is the command's result, not a log line.
fn print_batch_report(report: &BatchReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE ({} profile)", report.mode);
    println!("{}", "=".repeat(80));

    if report.skipped {
        println!("All outputs already exist. Use --force to re-run.");
        println!("{}", "=".repeat(80));
        return;
    }

    for result in &report.results {
        match (&result.summary, &result.error) {
            (Some(summary), _) => println!(
                "  [ok]     {:<20} {} -> {} rows, {} -> {} columns  => {}",
                result.dataset.as_str(),
                summary.rows_before,
                summary.rows_after,
                summary.columns_before,
                summary.columns_after,
                result.output.display()
            ),
            (None, Some(error)) => {
                println!("  [failed] {:<20} {}", result.dataset.as_str(), error)
            }
            (None, None) => {}
        }
    }
    println!();
    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    println!("{}", "=".repeat(80));
}

/// Print a human-readable summary of a single-file run.
fn print_summary(output: &Path, summary: &CleaningSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Dataset: {} ({} profile)", summary.dataset, summary.mode);
    println!("Output:  {}", output.display());
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed()
    );
    println!(
        "  Columns: {} -> {} ({} removed)",
        summary.columns_before,
        summary.columns_after,
        summary.columns_removed()
    );
    println!("  Duplicates removed: {}", summary.duplicates_removed);
    println!("  Sparse rows dropped: {}", summary.sparse_rows_dropped);
    println!("  Outlier rows removed: {}", summary.outlier_rows_removed);
    if !summary.group_keys.is_empty() {
        println!(
            "  Grouped by: {} ({} groups)",
            summary.group_keys.join(", "),
            summary.groups.len()
        );
    }
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in summary.actions.iter().take(10) {
            println!("  - {}: {}", action.target, action.description);
        }
        if summary.actions.len() > 10 {
            println!("  ... and {} more", summary.actions.len() - 10);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

/// Print the dry-run preview.
fn print_preview(input: &Path, preview: &CleaningPreview) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaning ({} profile)", preview.mode);
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input.display());
    println!("  Kind: {}", preview.dataset);
    println!("  Rows: {}", preview.rows);
    println!("  Columns: {}", preview.columns);
    println!("  Duplicate rows: {}", preview.duplicate_rows);
    println!();

    println!("COLUMN TYPING");
    println!("{}", "-".repeat(40));
    println!("{:<30} {:<10}", "Column", "Kind");
    for (name, kind) in preview.column_kinds.columns.iter() {
        println!("{:<30} {:<10}", truncate_str(name, 29), kind.as_str());
    }
    println!();

    println!("GROUPS");
    println!("{}", "-".repeat(40));
    if preview.group_keys.is_empty() {
        println!("  No grouping keys found; the table is one group");
    } else {
        println!("  Keys: {}", preview.group_keys.join(", "));
    }
    println!(
        "  {:<40} {:>6} {:>10} {:>10}",
        "Group", "Rows", "Row thr.", "Col thr."
    );
    for group in &preview.groups {
        println!(
            "  {:<40} {:>6} {:>10.2} {:>10.2}",
            truncate_str(&group.key, 39),
            group.rows,
            group.thresholds.row_threshold,
            group.thresholds.column_threshold
        );
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this cleaning, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
