//! Column type inference.
//!
//! A column is Datetime when at least `threshold` of its values parse as
//! dates, otherwise Numeric when at least `threshold` parse as numbers,
//! otherwise Categorical. The fraction is taken over the present values
//! of the column, and the datetime check always runs first.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CellValue, ColumnType};

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4})([ T].*)?$")
        .expect("date shape pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

// Month-first before day-first, so 03/04/2024 is March 4th.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if !DATE_SHAPE.is_match(s) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parses a finite decimal number. NaN and infinities count as unparseable.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn datetime_of(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Timestamp(ts) => Some(*ts),
        CellValue::Text(s) => parse_datetime(s),
        CellValue::Number(_) | CellValue::Missing => None,
    }
}

fn number_of(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => parse_number(s),
        CellValue::Timestamp(_) | CellValue::Missing => None,
    }
}

fn category_of(value: &CellValue) -> Option<String> {
    let text = match value {
        CellValue::Text(s) => s.trim().to_lowercase(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        CellValue::Missing => return None,
    };
    if text.is_empty() || text == "nan" {
        None
    } else {
        Some(text)
    }
}

fn meets_threshold(successes: usize, total: usize, threshold: f64) -> bool {
    total > 0 && successes as f64 / total as f64 >= threshold
}

/// The parse fraction is taken over present values only, so gaps never
/// demote a column. An all-missing column is Categorical.
pub fn classify(values: &[CellValue], threshold: f64) -> ColumnType {
    let total = values.iter().filter(|v| !v.is_missing()).count();

    let dates = values.iter().filter(|v| datetime_of(v).is_some()).count();
    if meets_threshold(dates, total, threshold) {
        return ColumnType::Datetime;
    }

    let numbers = values.iter().filter(|v| number_of(v).is_some()).count();
    if meets_threshold(numbers, total, threshold) {
        return ColumnType::Numeric;
    }

    ColumnType::Categorical
}

/// A column converted to its canonical representation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValues {
    pub kind: ColumnType,
    pub values: Vec<CellValue>,
    /// Non-missing inputs that failed to parse and became missing.
    pub unparsed: usize,
}

/// Converts every value to the canonical form for `kind`.
pub fn coerce(values: &[CellValue], kind: ColumnType) -> TypedValues {
    let mut unparsed = 0;
    let converted = values
        .iter()
        .map(|value| {
            let canonical = match kind {
                ColumnType::Datetime => datetime_of(value).map(CellValue::Timestamp),
                ColumnType::Numeric => number_of(value).map(CellValue::Number),
                ColumnType::Categorical => category_of(value).map(CellValue::Text),
            };
            match canonical {
                Some(v) => v,
                None => {
                    if !value.is_missing() && kind != ColumnType::Categorical {
                        unparsed += 1;
                    }
                    CellValue::Missing
                }
            }
        })
        .collect();

    TypedValues {
        kind,
        values: converted,
        unparsed,
    }
}

pub fn infer_column(values: &[CellValue], threshold: f64) -> TypedValues {
    coerce(values, classify(values, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(raw: &[&str]) -> Vec<CellValue> {
        raw.iter()
            .map(|s| if s.is_empty() { CellValue::Missing } else { CellValue::from(*s) })
            .collect()
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-04"), Some(expected));
        assert_eq!(parse_datetime("03/04/2024"), Some(expected));
        assert_eq!(parse_datetime("2024/03/04"), Some(expected));
        assert_eq!(parse_datetime("25/12/2024").map(|d| d.date().to_string()), Some("2024-12-25".to_string()));
        assert_eq!(
            parse_datetime("2024-03-04T10:30:00Z").map(|d| d.to_string()),
            Some("2024-03-04 10:30:00".to_string())
        );
        assert!(parse_datetime("2024-03-04 10:30:15.250").is_some());
    }

    #[test]
    fn test_numbers_are_not_dates() {
        assert_eq!(parse_datetime("2024"), None);
        assert_eq!(parse_datetime("12.5"), None);
        assert_eq!(parse_datetime("1.5.2"), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("-1.5e3"), Some(-1500.0));
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_classify_datetime_before_numeric() {
        let values = texts(&["2024-01-01", "2024-01-02", "2024-01-03", "oops"]);
        assert_eq!(classify(&values, 0.7), ColumnType::Datetime);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 7 of 10 present values parse: exactly 70%
        let values = texts(&["1", "2", "3", "4", "5", "6", "7", "a", "b", "c", ""]);
        assert_eq!(classify(&values, 0.7), ColumnType::Numeric);

        // 6 of 10 present values parse
        let values = texts(&["1", "2", "3", "4", "5", "6", "x", "a", "b", "c", ""]);
        assert_eq!(classify(&values, 0.7), ColumnType::Categorical);
    }

    #[test]
    fn test_sparse_numeric_column_stays_numeric() {
        let values = texts(&["10", "", "30", "", "50"]);
        let typed = infer_column(&values, 0.7);
        assert_eq!(typed.kind, ColumnType::Numeric);
        assert_eq!(
            typed.values,
            vec![
                CellValue::Number(10.0),
                CellValue::Missing,
                CellValue::Number(30.0),
                CellValue::Missing,
                CellValue::Number(50.0),
            ]
        );
        assert_eq!(typed.unparsed, 0);
    }

    #[test]
    fn test_numeric_coercion_counts_failures() {
        let values = texts(&["1", "2", "3", "4", "5", "6", "7", "8", "n/a", ""]);
        let typed = infer_column(&values, 0.7);
        assert_eq!(typed.kind, ColumnType::Numeric);
        assert_eq!(typed.unparsed, 1);
        assert_eq!(typed.values[8], CellValue::Missing);
        assert_eq!(typed.values[9], CellValue::Missing);
        assert_eq!(typed.values[0], CellValue::Number(1.0));
    }

    #[test]
    fn test_categorical_normalization() {
        let values = texts(&["  Red ", "BLUE", "NaN", "", "green"]);
        let typed = infer_column(&values, 0.7);
        assert_eq!(typed.kind, ColumnType::Categorical);
        assert_eq!(
            typed.values,
            vec![
                CellValue::from("red"),
                CellValue::from("blue"),
                CellValue::Missing,
                CellValue::Missing,
                CellValue::from("green"),
            ]
        );
    }

    #[test]
    fn test_all_missing_is_categorical() {
        let values = vec![CellValue::Missing; 4];
        let typed = infer_column(&values, 0.7);
        assert_eq!(typed.kind, ColumnType::Categorical);
        assert!(typed.values.iter().all(CellValue::is_missing));
    }

    #[test]
    fn test_canonical_values_are_stable() {
        let values = vec![CellValue::Number(1.0), CellValue::Number(2.5)];
        assert_eq!(infer_column(&values, 0.7).values, values);
    }
}
