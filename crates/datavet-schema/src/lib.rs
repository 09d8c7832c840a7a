#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-schema
//!
//! Schema model, loader and structural validation for datavet.
//!
//! A schema document declares datasets (one tabular file each: file-name
//! pattern, format, typed fields and rules) and packages (bundles of datasets
//! with cross-dataset rules). Loading validates the whole document and
//! reports every problem at once.
//!
//! ```rust
//! let schema = datavet_schema::load(
//!     "metadata: { name: demo }\ndatasets:\n  clients:\n    fields: [ { name: id, type: integer } ]\n",
//! )
//! .unwrap();
//! assert_eq!(schema.datasets[0].name, "clients");
//! ```

pub mod loader;
pub mod model;
pub mod pattern;
pub mod registry;

pub use loader::{load, load_from_file, load_json, load_yaml};
pub use model::{
    ContainerFormat, CsvFormat, DatasetSpec, ExcelFormat, FieldSpec, FieldType, FileFormat,
    Metadata, PackageSpec, SchemaDocument, Severity, TextEncoding, ValidationRule,
};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors that can occur when loading a schema
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    /// Every structural problem found in the document
    #[error("Schema validation failed with {} problem(s):\n  {}", .0.len(), .0.join("\n  "))]
    Validation(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Individual problem messages
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        match self {
            Error::Validation(problems) => problems.clone(),
            other => vec![other.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
