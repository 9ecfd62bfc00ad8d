//! Tabular data model shared by every stage of the analysis pipeline.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Raw tables come straight from ingest with untyped cells; the
//! cleaner produces a new table where every column carries a [`ColumnType`].

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Datetime,
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Datetime => write!(f, "datetime"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}

/// A single cell. `Missing` is a real value, never a sentinel string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Timestamp(NaiveDateTime),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Hashable identity used for duplicate detection.
    pub(crate) fn key(&self) -> CellKey {
        match self {
            // -0.0 and 0.0 compare equal, so they must share a key.
            CellValue::Number(n) if *n == 0.0 => CellKey::Number(0),
            CellValue::Number(n) => CellKey::Number(n.to_bits()),
            CellValue::Timestamp(ts) => CellKey::Timestamp(*ts),
            CellValue::Text(s) => CellKey::Text(s.clone()),
            CellValue::Missing => CellKey::Missing,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Number(u64),
    Timestamp(NaiveDateTime),
    Text(String),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    /// `None` until the cleaner assigns a type; never re-inferred afterwards.
    pub kind: Option<ColumnType>,
    pub values: Vec<CellValue>,
}

impl Column {
    /// An untyped column as produced by ingest.
    pub fn raw(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            values,
        }
    }

    pub fn typed(name: impl Into<String>, kind: ColumnType, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == Some(ColumnType::Numeric)
    }

    /// Non-missing numbers paired with their row index.
    pub fn numeric_values(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.as_number().map(|n| (idx, n)))
            .collect()
    }
}

/// Rectangular table with unique column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(AnalysisError::EmptyInput("table has no columns".to_string()));
        }

        let row_count = columns[0].len();
        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != row_count {
                return Err(AnalysisError::Parse(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    row_count
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(AnalysisError::Parse(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        if row_count == 0 {
            return Err(AnalysisError::EmptyInput("table has no rows".to_string()));
        }

        Ok(Self { columns, row_count })
    }

    /// Builds a raw table from a header and row-major records.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(AnalysisError::EmptyInput("table has no columns".to_string()));
        }

        let width = headers.len();
        let mut columns: Vec<Vec<CellValue>> = (0..width)
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(AnalysisError::Parse(format!(
                    "row {} has {} fields, expected {}",
                    row_idx + 1,
                    row.len(),
                    width
                )));
            }
            for (col_idx, cell) in row.into_iter().enumerate() {
                columns[col_idx].push(cell);
            }
        }

        Table::new(
            headers
                .into_iter()
                .zip(columns)
                .map(|(name, values)| Column::raw(name, values))
                .collect(),
        )
    }

    /// Assembles a table whose shape the caller has already guaranteed.
    pub(crate) fn from_parts(columns: Vec<Column>, row_count: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns_of(&self, kind: ColumnType) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.kind == Some(kind))
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns_of(ColumnType::Numeric).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_transposes() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec!["1".into(), "x".into()],
                vec![CellValue::Missing, "y".into()],
            ],
        )
        .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column("a").unwrap().missing_count(), 1);
        assert_eq!(table.column("b").unwrap().values[1], CellValue::from("y"));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()]],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[test]
    fn test_rejects_duplicate_names_and_empty() {
        let err = Table::new(vec![
            Column::raw("a", vec!["1".into()]),
            Column::raw("a", vec!["2".into()]),
        ])
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));

        assert!(matches!(Table::new(vec![]), Err(AnalysisError::EmptyInput(_))));
        assert!(matches!(
            Table::new(vec![Column::raw("a", vec![])]),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_signed_zero_shares_key() {
        assert_eq!(CellValue::Number(0.0).key(), CellValue::Number(-0.0).key());
        assert_ne!(CellValue::Number(1.0).key(), CellValue::from("1").key());
    }

    #[test]
    fn test_missing_serializes_as_null() {
        let json = serde_json::to_string(&vec![
            CellValue::Number(1.5),
            CellValue::from("x"),
            CellValue::Missing,
        ])
        .unwrap();
        assert_eq!(json, "[1.5,\"x\",null]");
    }
}
