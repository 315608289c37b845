//! Value coercions applied by the column typer.

use crate::utils::{normalize_text, parse_numeric_string};
use anyhow::Result;
use polars::prelude::*;

/// Convert a string Series to Float64. Values that do not parse become null.
pub(crate) fn string_to_float(series: &Series) -> Result<Series> {
    let str_series = series.str()?;
    let values: Vec<Option<f64>> = str_series
        .into_iter()
        .map(|opt| opt.and_then(parse_numeric_string))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Normalize every value of a text Series, returning the new Series and the
/// number of values that changed.
pub(crate) fn normalize_text_series(series: &Series) -> Result<(Series, usize)> {
    let str_series = series.cast(&DataType::String)?;
    let mut changed = 0;
    let values: Vec<Option<String>> = str_series
        .str()?
        .into_iter()
        .map(|opt| {
            opt.map(|val| {
                let normalized = normalize_text(val);
                if normalized != val {
                    changed += 1;
                }
                normalized
            })
        })
        .collect();
    Ok((Series::new(series.name().clone(), values), changed))
}
