//! Date string parsing.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Full-date formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    // Two-digit years first: `%Y` would happily read "19" as year 19.
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%Y%m%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Month-year formats. The value is prefixed with `01 ` before parsing so
/// they resolve to the first day of the month.
const MONTH_YEAR_FORMATS: &[&str] = &["%d %Y-%m", "%d %m/%Y", "%d %b %Y", "%d %B %Y", "%d %Y%m"];

/// Four-digit years only. `%b %d %Y` reads "Jun 2021" as June 20 of year 21.
fn plausible(date: &NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

/// Parse a date string in any of the supported formats.
///
/// Returns `None` for empty input, error markers and anything unparseable.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Integer-valued floats rendered from numeric columns ("20180105.0").
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt)
            && plausible(&date)
        {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt)
            && plausible(&dt.date())
        {
            return Some(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed)
        && plausible(&dt.date_naive())
    {
        return Some(dt.date_naive());
    }

    let prefixed = format!("01 {}", trimmed);
    for fmt in MONTH_YEAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&prefixed, fmt)
            && plausible(&date)
        {
            return Some(date);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_common_formats() {
        assert_eq!(parse_date("2019-03-15"), ymd(2019, 3, 15));
        assert_eq!(parse_date("03/15/2019"), ymd(2019, 3, 15));
        assert_eq!(parse_date("3/5/19"), ymd(2019, 3, 5));
        assert_eq!(parse_date("2019/03/15"), ymd(2019, 3, 15));
        assert_eq!(parse_date("Mar 15, 2019"), ymd(2019, 3, 15));
        assert_eq!(parse_date("15 March 2019"), ymd(2019, 3, 15));
    }

    #[test]
    fn test_parse_compact_and_numeric_rendering() {
        assert_eq!(parse_date("20180105"), ymd(2018, 1, 5));
        assert_eq!(parse_date("20180105.0"), ymd(2018, 1, 5));
    }

    #[test]
    fn test_parse_datetimes() {
        assert_eq!(parse_date("2020-07-01 12:30:00"), ymd(2020, 7, 1));
        assert_eq!(parse_date("2020-07-01T12:30:00"), ymd(2020, 7, 1));
        assert_eq!(parse_date("2020-07-01T12:30:00+02:00"), ymd(2020, 7, 1));
    }

    #[test]
    fn test_month_year_resolves_to_first_day() {
        assert_eq!(parse_date("2021-06"), ymd(2021, 6, 1));
        assert_eq!(parse_date("Jun 2021"), ymd(2021, 6, 1));
        assert_eq!(parse_date("June 2021"), ymd(2021, 6, 1));
        assert_eq!(parse_date("06/2021"), ymd(2021, 6, 1));
    }

    #[test]
    fn test_abbreviated_month_and_year_is_not_a_day() {
        assert_eq!(parse_date("Jun 2021"), ymd(2021, 6, 1));
        assert_eq!(parse_date("Dec 1999"), ymd(1999, 12, 1));
        assert_eq!(parse_date("Jun 20 2021"), ymd(2021, 6, 20));
        assert_eq!(parse_date("0021-06-20"), None);
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2019-02-30"), None);
        assert_eq!(parse_date("n/a"), None);
    }
}
