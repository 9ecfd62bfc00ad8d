use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};

use super::utils::unique_headers;
use crate::error::{AnalysisError, Result};
use crate::models::{CellValue, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Xlsx,
    Xls,
}

/// Reads the first worksheet of an Excel workbook into a raw table.
pub fn read_workbook(data: &[u8], format: WorkbookFormat) -> Result<Table> {
    let start = std::time::Instant::now();
    tracing::info!("Opening {:?} workbook ({} bytes)", format, data.len());

    let cursor = Cursor::new(data.to_vec());
    let rows = match format {
        WorkbookFormat::Xlsx => {
            let workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
                tracing::error!("Failed to open Excel file: {}", e);
                AnalysisError::Parse(format!("Failed to open Excel file: {}", e))
            })?;
            first_sheet_rows(workbook)?
        }
        WorkbookFormat::Xls => {
            let workbook: Xls<_> = open_workbook_from_rs(cursor).map_err(|e| {
                tracing::error!("Failed to open Excel file: {}", e);
                AnalysisError::Parse(format!("Failed to open Excel file: {}", e))
            })?;
            first_sheet_rows(workbook)?
        }
    };
    tracing::info!("Workbook read in {:?}", start.elapsed());

    table_from_sheet(rows)
}

fn first_sheet_rows<R, RS>(mut workbook: R) -> Result<Vec<Vec<Data>>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_names = workbook.sheet_names().to_vec();
    tracing::debug!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| AnalysisError::EmptyInput("No sheets found in workbook".to_string()))?;

    let range = workbook.worksheet_range(sheet_name).map_err(|e| {
        tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
        AnalysisError::Parse(format!("Failed to read worksheet {}: {}", sheet_name, e))
    })?;

    Ok(range.rows().map(|row| row.to_vec()).collect())
}

/// Turns sheet rows (header first) into a raw table. Sheet ranges are
/// rectangular, so short rows are padded with missing cells.
pub(crate) fn table_from_sheet(rows: Vec<Vec<Data>>) -> Result<Table> {
    let mut rows = rows.into_iter();
    let header_row = rows
        .next()
        .ok_or_else(|| AnalysisError::EmptyInput("Worksheet is empty".to_string()))?;

    let header_text: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();
    let headers = unique_headers(header_text.iter().map(String::as_str));
    let width = headers.len();

    let body: Vec<Vec<CellValue>> = rows
        .map(|row| {
            (0..width)
                .map(|idx| row.get(idx).map(cell_value).unwrap_or(CellValue::Missing))
                .collect()
        })
        .collect();

    Table::from_rows(headers, body)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::String(s) if s.is_empty() => CellValue::Missing,
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(CellValue::Missing),
        other => CellValue::Text(other.to_string()),
    }
}
