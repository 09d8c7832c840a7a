#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-adapter-csv
//!
//! Delimited-text adapter for datavet.
//!
//! Turns a CSV/TSV/pipe-delimited file into a [`datavet_ir::RawTable`]:
//! header row (optional), data rows with their source line numbers, and
//! notices for encoding problems.
//!
//! ## Example Usage
//!
//! ```rust
//! use datavet_adapter_csv::{CsvConfig, CsvReader};
//!
//! let reader = CsvReader::new().with_config(CsvConfig::new().delimiter(';'));
//! let table = reader.read_bytes("clients.csv", b"id;name\n1;Ann\n").unwrap();
//! assert_eq!(table.rows[0].cells, vec!["1", "Ann"]);
//! ```

pub mod config;
pub mod errors;
pub mod reader;

pub use config::{CsvConfig, Encoding};
pub use errors::{CsvError, CsvResult};
pub use reader::CsvReader;

pub use errors::CsvError as Error;
pub type Result<T> = CsvResult<T>;
