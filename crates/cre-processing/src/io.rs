//! CSV loading and saving.

use crate::error::{CleaningError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows sampled for schema inference on the first attempt.
const SAMPLE_INFER_ROWS: usize = 1000;

fn read_with_schema_length(path: &Path, infer_schema_length: Option<usize>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_schema_length)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
}

/// Load a CSV file, retrying with more forgiving schema inference.
///
/// 1. infer the schema from the first rows;
/// 2. infer it from the whole file (a late value may not fit the sampled
///    dtype);
/// 3. read every column as text and let the column typer coerce it.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(CleaningError::InputNotFound(path.to_path_buf()));
    }

    match read_with_schema_length(path, Some(SAMPLE_INFER_ROWS)) {
        Ok(df) => return Ok(loaded(path, df)),
        Err(e) => debug!("Sampled schema inference failed for {}: {}", path.display(), e),
    }

    match read_with_schema_length(path, None) {
        Ok(df) => return Ok(loaded(path, df)),
        Err(e) => debug!("Full schema inference failed for {}: {}", path.display(), e),
    }

    warn!("Reading {} with every column as text", path.display());
    let df = read_with_schema_length(path, Some(0))
        .context(format!("Failed to read {}", path.display()))?;
    Ok(loaded(path, df))
}

fn loaded(path: &Path, df: DataFrame) -> DataFrame {
    info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    df
}

/// Write a DataFrame as CSV with a header, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;

    info!("Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file() {
        let err = load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
    }

    #[test]
    fn test_load_infers_types_and_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Leases.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "market,year,rent").unwrap();
        writeln!(file, "Austin,2019,45.5").unwrap();
        writeln!(file, "\"Dallas, TX\",2020,").unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("year").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("rent").unwrap().null_count(), 1);
        assert_eq!(df.column("market").unwrap().str().unwrap().get(1), Some("Dallas, TX"));
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let mut df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();

        write_csv(&mut df, &path).unwrap();
        let back = load_csv(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
    }
}
