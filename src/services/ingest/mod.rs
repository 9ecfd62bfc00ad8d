//! Turns uploaded CSV and Excel bytes into raw, untyped tables.

pub mod delimited;
pub mod utils;
pub mod workbook;

pub use delimited::read_csv;
pub use workbook::{read_workbook, WorkbookFormat};

use crate::models::Table;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook(WorkbookFormat),
}

impl SourceFormat {
    /// Detects the format from a file name's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" => Some(SourceFormat::Workbook(WorkbookFormat::Xlsx)),
            "xls" => Some(SourceFormat::Workbook(WorkbookFormat::Xls)),
            _ => None,
        }
    }
}

pub fn read_table(data: &[u8], format: SourceFormat) -> Result<Table> {
    match format {
        SourceFormat::Csv => read_csv(data),
        SourceFormat::Workbook(kind) => read_workbook(data, kind),
    }
}
