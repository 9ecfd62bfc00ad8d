use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::AnalysisOptions;
use crate::models::{CellKey, CellValue, Column, ColumnType, Table};
use crate::services::inference;
use crate::services::statistics::MissingProfile;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCleaning {
    pub name: String,
    pub kind: ColumnType,
    /// Gaps after coercion and before imputation.
    pub missing: usize,
    /// Missing values replaced by the column mean or mode.
    pub imputed: usize,
    /// Values that failed to parse as the column type and became missing.
    pub unparsed: usize,
    pub fill_value: Option<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub columns: Vec<ColumnCleaning>,
    /// Gaps per column over the deduplicated rows, before imputation.
    pub missing: MissingProfile,
}

/// Produces the canonical table: duplicates removed, every column typed,
/// numeric and categorical gaps imputed. The input is never modified.
pub fn clean(table: &Table, options: &AnalysisOptions) -> Table {
    clean_with_report(table, options).0
}

pub fn clean_with_report(table: &Table, options: &AnalysisOptions) -> (Table, CleaningReport) {
    let start = std::time::Instant::now();
    let rows_in = table.row_count();

    let raw_columns: Vec<&[CellValue]> = table.columns().iter().map(|c| c.values.as_slice()).collect();
    let keep = distinct_rows(&raw_columns, rows_in);
    tracing::debug!("Removed {} exact duplicate rows", rows_in - keep.len());

    let cleaned: Vec<(Column, ColumnCleaning)> = table
        .columns()
        .par_iter()
        .map(|column| clean_column(column, &keep, options.type_threshold))
        .collect();

    let (mut columns, reports): (Vec<Column>, Vec<ColumnCleaning>) = cleaned.into_iter().unzip();

    // Normalization and imputation can make distinct raw rows identical.
    let row_count = keep.len();
    let typed_columns: Vec<&[CellValue]> = columns.iter().map(|c| c.values.as_slice()).collect();
    let survivors = distinct_rows(&typed_columns, row_count);
    if survivors.len() < row_count {
        tracing::debug!(
            "Removed {} rows made identical by cleaning",
            row_count - survivors.len()
        );
        columns = columns
            .into_iter()
            .map(|column| Column {
                values: select_rows(&column.values, &survivors),
                ..column
            })
            .collect();
    }

    let rows_out = survivors.len();
    let missing = MissingProfile::from_counts(
        row_count,
        reports.iter().map(|r| (r.name.clone(), r.missing)),
    );
    let report = CleaningReport {
        rows_in,
        rows_out,
        duplicates_removed: rows_in - rows_out,
        columns: reports,
        missing,
    };

    tracing::info!(
        "Cleaned table: {} -> {} rows, {} columns in {:?}",
        rows_in,
        rows_out,
        columns.len(),
        start.elapsed()
    );

    (Table::from_parts(columns, rows_out), report)
}

fn clean_column(column: &Column, keep: &[usize], threshold: f64) -> (Column, ColumnCleaning) {
    let values = select_rows(&column.values, keep);
    let kind = column
        .kind
        .unwrap_or_else(|| inference::classify(&values, threshold));
    let typed = inference::coerce(&values, kind);
    let mut values = typed.values;
    let missing = values.iter().filter(|v| v.is_missing()).count();

    let fill_value = match kind {
        ColumnType::Numeric => column_mean(&values).map(CellValue::Number),
        ColumnType::Categorical => most_frequent(&values).map(CellValue::Text),
        ColumnType::Datetime => None,
    };

    let mut imputed = 0;
    match &fill_value {
        Some(fill) => {
            for value in values.iter_mut().filter(|v| v.is_missing()) {
                *value = fill.clone();
                imputed += 1;
            }
        }
        None if kind != ColumnType::Datetime && values.iter().all(CellValue::is_missing) => {
            tracing::warn!(
                "Column '{}' has no values to impute from; leaving it missing",
                column.name
            );
        }
        None => {}
    }

    tracing::debug!(
        "Column '{}' typed as {} ({} imputed, {} unparsed)",
        column.name,
        kind,
        imputed,
        typed.unparsed
    );

    let report = ColumnCleaning {
        name: column.name.clone(),
        kind,
        missing,
        imputed,
        unparsed: typed.unparsed,
        fill_value,
    };
    (Column::typed(column.name.clone(), kind, values), report)
}

/// Indices of the first occurrence of every distinct row, in order.
fn distinct_rows(columns: &[&[CellValue]], row_count: usize) -> Vec<usize> {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(row_count);
    (0..row_count)
        .filter(|&row| seen.insert(columns.iter().map(|c| c[row].key()).collect()))
        .collect()
}

fn select_rows(values: &[CellValue], rows: &[usize]) -> Vec<CellValue> {
    rows.iter().map(|&idx| values[idx].clone()).collect()
}

fn column_mean(values: &[CellValue]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter_map(CellValue::as_number)
        .fold((0.0, 0usize), |(sum, count), n| (sum + n, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Most frequent text value; ties go to the value seen first.
fn most_frequent(values: &[CellValue]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, text) in values.iter().enumerate().filter_map(|(i, v)| v.as_text().map(|t| (i, t))) {
        counts.entry(text).or_insert((0, idx)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(text, _)| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(columns: Vec<(&str, Vec<&str>)>) -> Table {
        Table::new(
            columns
                .into_iter()
                .map(|(name, values)| {
                    Column::raw(
                        name,
                        values
                            .into_iter()
                            .map(|v| if v.is_empty() { CellValue::Missing } else { CellValue::from(v) })
                            .collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_removes_duplicates_keeping_first() {
        let table = raw_table(vec![("A", vec!["1", "1", "5"]), ("B", vec!["x", "x", "y"])]);
        let cleaned = clean(&table, &AnalysisOptions::default());
        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(
            cleaned.column("A").unwrap().values,
            vec![CellValue::Number(1.0), CellValue::Number(5.0)]
        );
        assert_eq!(
            cleaned.column("B").unwrap().values,
            vec![CellValue::from("x"), CellValue::from("y")]
        );
    }

    #[test]
    fn test_mean_imputation() {
        let table = raw_table(vec![
            ("id", vec!["a", "b", "c", "d", "e"]),
            ("v", vec!["1", "2", "", "3", "6"]),
        ]);
        let (cleaned, report) = clean_with_report(&table, &AnalysisOptions::default());
        let v = cleaned.column("v").unwrap();
        assert_eq!(v.kind, Some(ColumnType::Numeric));
        assert_eq!(v.values[2], CellValue::Number(3.0));
        assert_eq!(report.columns[1].imputed, 1);
        assert_eq!(report.columns[1].fill_value, Some(CellValue::Number(3.0)));
        assert_eq!(v.missing_count(), 0);
        assert_eq!(report.missing.total(), 1);
        assert_eq!(report.missing.columns[1].pct, 20.0);
    }

    #[test]
    fn test_sparse_numeric_column_gets_mean() {
        let table = raw_table(vec![
            ("id", vec!["a", "b", "c", "d", "e"]),
            ("amount", vec!["10", "", "30", "", "50"]),
        ]);
        let (cleaned, report) = clean_with_report(&table, &AnalysisOptions::default());
        let amount = cleaned.column("amount").unwrap();
        assert_eq!(amount.kind, Some(ColumnType::Numeric));
        assert_eq!(
            amount.values,
            [10.0, 30.0, 30.0, 30.0, 50.0].map(CellValue::Number).to_vec()
        );
        assert_eq!(report.columns[1].missing, 2);
        assert_eq!(report.missing.total(), 2);
    }

    #[test]
    fn test_mode_imputation_breaks_ties_by_first_seen() {
        let table = raw_table(vec![
            ("id", vec!["1", "2", "3", "4", "5"]),
            ("c", vec!["b", "a", "a", "b", ""]),
        ]);
        let cleaned = clean(&table, &AnalysisOptions::default());
        assert_eq!(cleaned.column("c").unwrap().values[4], CellValue::from("b"));
    }

    #[test]
    fn test_datetime_gaps_are_not_imputed() {
        let table = raw_table(vec![
            ("id", vec!["1", "2", "3", "4"]),
            ("when", vec!["2024-01-01", "2024-01-02", "2024-01-03", "never"]),
        ]);
        let (cleaned, report) = clean_with_report(&table, &AnalysisOptions::default());
        let when = cleaned.column("when").unwrap();
        assert_eq!(when.kind, Some(ColumnType::Datetime));
        assert_eq!(when.values[3], CellValue::Missing);
        assert_eq!(report.columns[1].unparsed, 1);
        assert_eq!(report.columns[1].imputed, 0);
    }

    #[test]
    fn test_all_missing_column_stays_missing() {
        let table = raw_table(vec![("id", vec!["1", "2"]), ("empty", vec!["", ""])]);
        let cleaned = clean(&table, &AnalysisOptions::default());
        let empty = cleaned.column("empty").unwrap();
        assert_eq!(empty.kind, Some(ColumnType::Categorical));
        assert_eq!(empty.missing_count(), 2);
    }

    #[test]
    fn test_clean_does_not_mutate_input_and_is_idempotent() {
        let table = raw_table(vec![
            ("n", vec!["5", "5", "5", "5", "5", "5", "", "", "", "a"]),
            ("c", vec!["X", "x", "x", "y", "z", "w", "v", "u", "t", "s"]),
        ]);
        let snapshot = table.clone();
        let once = clean(&table, &AnalysisOptions::default());
        let twice = clean(&once, &AnalysisOptions::default());
        assert_eq!(table, snapshot);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rows_equal_after_imputation_are_collapsed() {
        let table = raw_table(vec![
            ("id", vec!["a", "a", "b"]),
            ("v", vec!["2", "", "2"]),
        ]);
        let (cleaned, report) = clean_with_report(&table, &AnalysisOptions::default());
        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(report.duplicates_removed, 1);
    }
}
