#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-report
//!
//! Event log and result files for datavet runs.
//!
//! Validation outcomes are appended to an [`EventLog`] as [`LogEntry`]
//! values. When the run ends, [`finalize`] builds a [`Report`] and writes
//! the three result files (`output.log`, `results.txt`, `report.json`),
//! each a projection of the same ordered event list.

pub mod entry;
pub mod html;
pub mod log;
pub mod report;
mod text;

pub use entry::{Category, Level, LogEntry};
pub use log::{EventLog, FileStats};
pub use report::{
    finalize, write_error_log, Report, RunInfo, RunStatus, Totals, ERROR_LOG, OUTPUT_LOG,
    REPORT_JSON, RESULTS_TXT,
};

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing result files
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl Error {
    /// Create an I/O error with operation/path context
    pub fn io(operation: impl Into<String>, path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
