//! Conversion of a cleaned table into a polars `DataFrame`, CSV bytes and
//! an XLSX workbook.

use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::AppError;
use crate::models::{CellValue, Column, ColumnType, Table};

fn column_series(column: &Column) -> Result<Series, AppError> {
    let series = match column.kind {
        Some(ColumnType::Numeric) => {
            let nums: Vec<Option<f64>> = column.values.iter().map(CellValue::as_number).collect();
            Series::new(&column.name, nums)
        }
        Some(ColumnType::Datetime) => {
            let millis: Vec<Option<i64>> = column
                .values
                .iter()
                .map(|v| v.as_timestamp().map(|ts| ts.and_utc().timestamp_millis()))
                .collect();
            Series::new(&column.name, millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(|e| AppError::Internal(format!("Failed to cast '{}' to datetime: {}", column.name, e)))?
        }
        _ => {
            let strings: Vec<Option<String>> = column
                .values
                .iter()
                .map(|v| (!v.is_missing()).then(|| v.to_string()))
                .collect();
            Series::new(&column.name, strings)
        }
    };
    Ok(series)
}

pub fn to_dataframe(table: &Table) -> Result<DataFrame, AppError> {
    let columns = table
        .columns()
        .iter()
        .map(column_series)
        .collect::<Result<Vec<_>, _>>()?;

    DataFrame::new(columns)
        .map_err(|e| AppError::Internal(format!("Failed to create DataFrame: {}", e)))
}

/// CSV with a header row. Missing cells are written as empty fields.
pub fn write_csv(table: &Table) -> Result<Vec<u8>, AppError> {
    let mut df = to_dataframe(table)?;
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV: {}", e)))?;
    tracing::debug!("Exported {} rows as {} bytes of CSV", df.height(), buf.len());
    Ok(buf)
}

pub const XLSX_SHEET_NAME: &str = "Data";
const XLSX_DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

fn xlsx_error(err: XlsxError) -> AppError {
    AppError::Internal(format!("Failed to write XLSX: {}", err))
}

/// Single worksheet named `Data` with a header row. Numbers and timestamps
/// keep their cell types; missing cells are left blank.
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let datetime_format = Format::new().set_num_format(XLSX_DATETIME_FORMAT);

    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME).map_err(xlsx_error)?;

    for (col, column) in table.columns().iter().enumerate() {
        let col = u16::try_from(col)
            .map_err(|_| AppError::Internal(format!("Too many columns for XLSX: {}", table.column_count())))?;
        sheet.write_string(0, col, &column.name).map_err(xlsx_error)?;

        for (idx, value) in column.values.iter().enumerate() {
            let row = u32::try_from(idx + 1)
                .map_err(|_| AppError::Internal(format!("Too many rows for XLSX: {}", table.row_count())))?;
            let written = match value {
                CellValue::Missing => continue,
                CellValue::Number(n) => sheet.write_number(row, col, *n),
                CellValue::Timestamp(ts) => sheet.write_datetime_with_format(row, col, ts, &datetime_format),
                CellValue::Text(s) => sheet.write_string(row, col, s),
            };
            written.map_err(xlsx_error)?;
        }
    }

    let buf = workbook.save_to_buffer().map_err(xlsx_error)?;
    tracing::debug!("Exported {} rows as {} bytes of XLSX", table.row_count(), buf.len());
    Ok(buf)
}
