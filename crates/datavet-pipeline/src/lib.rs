#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-pipeline
//!
//! Run coordination for datavet.
//!
//! A run validates one data file against one schema inside its own working
//! directory: the coordinator prepares the directory, loads the schema,
//! classifies the input, selects the matching package or dataset, extracts
//! and validates every dataset, evaluates package rules and writes the
//! result files. [`batch`] runs several files concurrently.

pub mod batch;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod extract;
pub mod format;

pub use batch::{run_batch, worst_exit_code, BatchItem};
pub use config::{EngineConfig, PerformanceSettings, ValidationSettings};
pub use context::{ExecutionContext, RunRequest};
pub use coordinator::{run, Coordinator, RunOutcome};
pub use extract::{
    archive_entries, extract, read_source, Extraction, MissingFile, ReadFailure, SourceFile,
};
pub use format::{classify, InputKind};
pub use datavet_report::RunStatus;

use std::path::Path;
use thiserror::Error;

/// Errors that can occur in the pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Pipeline error during {operation} for '{path}': {message}")]
    Pipeline {
        operation: String,
        path: String,
        message: String,
    },

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Invalid run id '{0}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidRunId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] datavet_schema::Error),

    #[error("No package or dataset in the schema accepts {kind} input '{path}'")]
    NoMatchingSpec { kind: InputKind, path: String },

    #[error("Archive entry '{entry}' matches more than one dataset: {}", datasets.join(", "))]
    AmbiguousEntry { entry: String, datasets: Vec<String> },

    #[error(transparent)]
    Report(#[from] datavet_report::Error),
}

impl Error {
    /// Create a structured pipeline error with operation/path context.
    pub fn pipeline(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Pipeline {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with operation/path context.
    pub fn io(operation: impl Into<String>, path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
