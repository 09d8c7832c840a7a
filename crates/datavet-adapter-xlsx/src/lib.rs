#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-adapter-xlsx
//!
//! Spreadsheet adapter for datavet.
//!
//! Reads one sheet of an `.xlsx`/`.xlsm`/`.xlsb`/`.xls`/`.ods` workbook into a
//! [`datavet_ir::RawTable`]. Cells are rendered to text the way a user would
//! type them (integral numbers without `.0`, dates as `YYYY-MM-DD`) so that
//! spreadsheets go through the same coercion as delimited files.

pub mod reader;

pub use reader::XlsxReader;

use thiserror::Error;

/// Errors that can occur when reading a workbook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XlsxError {
    #[error("Cannot open workbook {source_name}: {message}")]
    Open {
        source_name: String,
        message: String,
    },

    #[error("Sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Workbook has no sheets")]
    NoSheets,

    #[error("Cannot read sheet '{sheet}': {message}")]
    Read { sheet: String, message: String },

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for XlsxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub use XlsxError as Error;
pub type Result<T> = std::result::Result<T, XlsxError>;
