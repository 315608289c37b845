//! Date normalizer.
//!
//! Parses date-like columns into polars `Date` columns, backfills the integer
//! time fields (`year`, `quarter`, `month`) from the first valid date of each
//! row, and derives the `year_quarter` grouping key.

mod formats;

pub use formats::parse_date;

use crate::types::{ActionType, CleaningAction};
use crate::utils::{column_names, parse_numeric_string};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::{debug, info};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Column name of the derived year/quarter key.
pub const YEAR_QUARTER: &str = "year_quarter";

/// Actual name of a time field in the frame, matched case-insensitively.
pub fn find_column(df: &DataFrame, name: &str) -> Option<String> {
    column_names(df)
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(name))
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

/// Convert any series to a polars `Date` series. Invalid values become null.
pub fn to_date_series(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Date => return Ok(series.clone()),
        DataType::Datetime(_, _) => return Ok(series.cast(&DataType::Date)?),
        _ => {}
    }

    let str_series = series.cast(&DataType::String)?;
    let days: Vec<Option<i32>> = str_series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(parse_date).map(date_to_days))
        .collect();
    Ok(Series::new(series.name().clone(), days).cast(&DataType::Date)?)
}

/// Values of a `Date` series as calendar dates.
pub fn date_values(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
    let days = series.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|opt| opt.and_then(days_to_date))
        .collect())
}

/// Integer values of a time field. Accepts numeric columns and text such as
/// `"2019"` or `"Q3"`.
fn time_field_values(series: &Series) -> Result<Vec<Option<i64>>> {
    if series.dtype() == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|opt| {
                opt.and_then(|val| {
                    let trimmed = val.trim().trim_start_matches(['Q', 'q']);
                    parse_numeric_string(trimmed)
                })
                .map(|v| v.round() as i64)
            })
            .collect());
    }

    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|opt| opt.filter(|v| v.is_finite()).map(|v| v.round() as i64))
        .collect())
}

fn year_of(date: NaiveDate) -> i64 {
    date.year() as i64
}

fn quarter_of(date: NaiveDate) -> i64 {
    (date.month0() / 3 + 1) as i64
}

fn month_of(date: NaiveDate) -> i64 {
    date.month() as i64
}

/// Parses date columns and maintains the integer time fields.
pub struct DateNormalizer<'a> {
    time_columns: &'a [String],
}

impl<'a> DateNormalizer<'a> {
    pub fn new(time_columns: &'a [String]) -> Self {
        Self { time_columns }
    }

    /// Run the whole stage: parse, backfill when dates exist, coerce.
    pub fn apply(
        &self,
        df: DataFrame,
        date_columns: &[String],
    ) -> Result<(DataFrame, Vec<CleaningAction>)> {
        let (df, mut actions) = self.parse_columns(df, date_columns)?;
        let (df, backfill_actions) = self.backfill_time_fields(df, date_columns)?;
        actions.extend(backfill_actions);
        let df = self.coerce_time_fields(df)?;
        Ok((df, actions))
    }

    /// Turn every date-like column into a `Date` column.
    pub fn parse_columns(
        &self,
        mut df: DataFrame,
        date_columns: &[String],
    ) -> Result<(DataFrame, Vec<CleaningAction>)> {
        let mut actions = Vec::new();

        for name in date_columns {
            let series = df.column(name)?.as_materialized_series().clone();
            let non_null_before = series.len() - series.null_count();
            let parsed = to_date_series(&series)?;
            let invalid = non_null_before.saturating_sub(parsed.len() - parsed.null_count());
            df.replace(name, parsed)?;

            debug!("Parsed '{}' as dates ({} invalid)", name, invalid);
            actions.push(CleaningAction::new(
                ActionType::DatesParsed,
                name,
                format!(
                    "Parsed '{}' as dates; {} unparseable values set to missing",
                    name, invalid
                ),
            ));
        }

        Ok((df, actions))
    }

    /// Fill missing `year`/`quarter`/`month` from the first non-null date of
    /// each row. Does nothing when there are no date columns. Time fields still
    /// missing afterwards become 0.
    pub fn backfill_time_fields(
        &self,
        mut df: DataFrame,
        date_columns: &[String],
    ) -> Result<(DataFrame, Vec<CleaningAction>)> {
        if date_columns.is_empty() {
            return Ok((df, Vec::new()));
        }

        let extractors: [(&str, fn(NaiveDate) -> i64); 3] =
            [("year", year_of), ("quarter", quarter_of), ("month", month_of)];
        let fields: Vec<(String, fn(NaiveDate) -> i64)> = extractors
            .into_iter()
            .filter_map(|(field, extract)| find_column(&df, field).map(|name| (name, extract)))
            .collect();

        if fields.is_empty() {
            return Ok((df, Vec::new()));
        }

        let mut dates_by_column = Vec::with_capacity(date_columns.len());
        for name in date_columns {
            let series = df.column(name)?.as_materialized_series();
            dates_by_column.push(date_values(series)?);
        }
        let first_dates: Vec<Option<NaiveDate>> = (0..df.height())
            .map(|row| dates_by_column.iter().find_map(|col| col[row]))
            .collect();

        let mut actions = Vec::new();
        for (name, extract) in fields {
            let series = df.column(&name)?.as_materialized_series().clone();
            let mut values = time_field_values(&series)?;

            let mut backfilled = 0;
            let mut zeroed = 0;
            for (value, date) in values.iter_mut().zip(&first_dates) {
                if value.is_none() {
                    match date {
                        Some(d) => {
                            *value = Some(extract(*d));
                            backfilled += 1;
                        }
                        None => {
                            *value = Some(0);
                            zeroed += 1;
                        }
                    }
                }
            }

            df.replace(&name, Series::new(name.as_str().into(), values))?;
            if backfilled + zeroed > 0 {
                info!(
                    "Backfilled {} values of '{}' from dates ({} set to 0)",
                    backfilled, name, zeroed
                );
                actions.push(CleaningAction::new(
                    ActionType::TimeFieldsBackfilled,
                    &name,
                    format!(
                        "Filled {} missing '{}' values from dates and {} with 0",
                        backfilled, name, zeroed
                    ),
                ));
            }
        }

        Ok((df, actions))
    }

    /// Cast every configured time field present in the frame to `Int64`.
    pub fn coerce_time_fields(&self, mut df: DataFrame) -> Result<DataFrame> {
        for name in column_names(&df) {
            if !self.time_columns.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
                continue;
            }
            let series = df.column(&name)?.as_materialized_series().clone();
            if series.dtype() == &DataType::Int64 {
                continue;
            }
            let values = time_field_values(&series)?;
            df.replace(&name, Series::new(name.as_str().into(), values))?;
        }
        Ok(df)
    }
}

/// Add `year_quarter` as `"{year}Q{quarter}"` when both fields exist.
///
/// Returns whether the column was added. Rows missing either part get null.
pub fn derive_year_quarter(df: &mut DataFrame) -> Result<bool> {
    let (Some(year_col), Some(quarter_col)) = (find_column(df, "year"), find_column(df, "quarter"))
    else {
        return Ok(false);
    };

    let years = time_field_values(df.column(&year_col)?.as_materialized_series())?;
    let quarters = time_field_values(df.column(&quarter_col)?.as_materialized_series())?;
    let keys: Vec<Option<String>> = years
        .iter()
        .zip(&quarters)
        .map(|(y, q)| match (y, q) {
            (Some(y), Some(q)) => Some(format!("{}Q{}", y, q)),
            _ => None,
        })
        .collect();

    df.with_column(Series::new(YEAR_QUARTER.into(), keys))?;
    debug!("Derived '{}' from '{}' and '{}'", YEAR_QUARTER, year_col, quarter_col);
    Ok(true)
}
