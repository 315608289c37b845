//! Column classification by name and content.

use crate::config::PipelineConfig;
use crate::types::ColumnKind;
use crate::utils::{DtypeCategory, get_dtype_category, numeric_ratio};
use polars::prelude::*;

/// Whether a column name marks the column as date-like.
///
/// Case-insensitive substring match against the configured markers, so
/// `lease_date`, `MonthSigned` and `DateSigned` all qualify.
pub fn is_date_like_name(name: &str, markers: &[String]) -> bool {
    let lower = name.to_lowercase();
    markers
        .iter()
        .filter(|m| !m.trim().is_empty())
        .any(|m| lower.contains(&m.to_lowercase()))
}

/// Classify a column as date-like, numeric, or textual.
///
/// The name rule wins over content: a numeric column called `date_code` is
/// still parsed as dates.
pub fn classify_column(name: &str, series: &Series, config: &PipelineConfig) -> ColumnKind {
    if is_date_like_name(name, &config.date_name_markers) {
        return ColumnKind::Date;
    }

    match get_dtype_category(series.dtype()) {
        DtypeCategory::Numeric => ColumnKind::Numeric,
        DtypeCategory::Datetime => ColumnKind::Date,
        DtypeCategory::String => match numeric_ratio(series) {
            Some(ratio) if ratio >= config.numeric_content_ratio => ColumnKind::Numeric,
            _ => ColumnKind::Text,
        },
        DtypeCategory::Boolean | DtypeCategory::Other => ColumnKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["date".to_string(), "signed".to_string()]
    }

    #[test]
    fn test_date_like_names() {
        assert!(is_date_like_name("lease_date", &markers()));
        assert!(is_date_like_name("MonthSigned", &markers()));
        assert!(is_date_like_name("DATE", &markers()));
        assert!(!is_date_like_name("market", &markers()));
        assert!(!is_date_like_name("year", &markers()));
    }

    #[test]
    fn test_empty_markers_never_match() {
        let markers = vec![String::new(), "  ".to_string()];
        assert!(!is_date_like_name("anything", &markers));
    }

    #[test]
    fn test_classify_by_dtype() {
        let config = PipelineConfig::default();
        let rent = Series::new("rent".into(), &[1.0, 2.0]);
        let market = Series::new("market".into(), &["austin", "boston"]);
        let flag = Series::new("flag".into(), &[true, false]);

        assert_eq!(classify_column("rent", &rent, &config), ColumnKind::Numeric);
        assert_eq!(classify_column("market", &market, &config), ColumnKind::Text);
        assert_eq!(classify_column("flag", &flag, &config), ColumnKind::Text);
    }

    #[test]
    fn test_name_rule_beats_numeric_dtype() {
        let config = PipelineConfig::default();
        let series = Series::new("monthsigned".into(), &[201801i64, 201802]);
        assert_eq!(classify_column("monthsigned", &series, &config), ColumnKind::Date);
    }

    #[test]
    fn test_numeric_content_in_text_column() {
        let config = PipelineConfig::default();
        let mostly = Series::new(
            "leasedSF".into(),
            &["1,200", "3,400", "$5,000", "900", "1000", "1", "2", "3", "4", "n/a"],
        );
        // 9 of 10 parse -> exactly at the 0.9 ratio
        assert_eq!(classify_column("leasedSF", &mostly, &config), ColumnKind::Numeric);

        let mixed = Series::new("zip".into(), &["10001", "unknown", "n/a", "02110"]);
        assert_eq!(classify_column("zip", &mixed, &config), ColumnKind::Text);
    }
}
