use csv::ReaderBuilder;

use super::utils::unique_headers;
use crate::error::{AnalysisError, Result};
use crate::models::{CellValue, Table};

/// Parses CSV bytes into a raw table. The first record is the header.
pub fn read_csv(data: &[u8]) -> Result<Table> {
    let start = std::time::Instant::now();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let header_record = reader.headers()?.clone();
    if header_record.is_empty() {
        return Err(AnalysisError::EmptyInput("CSV input has no header row".to_string()));
    }
    let headers = unique_headers(header_record.iter());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Missing
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect::<Vec<_>>(),
        );
    }

    tracing::debug!(
        "Parsed CSV with {} columns and {} rows in {:?}",
        headers.len(),
        rows.len(),
        start.elapsed()
    );
    Table::from_rows(headers, rows)
}
