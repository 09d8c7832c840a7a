#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-ir
//!
//! Typed values and tabular buffers shared by the datavet validation engine.
//!
//! Adapters produce a [`RawTable`] (text cells plus source line numbers).
//! Coercion turns it into a column-oriented [`Table`] of typed [`Value`]s,
//! which is what the rule evaluator reads.

/// Raw and typed tabular buffers.
pub mod table;
/// Typed cell values.
pub mod value;

/// Raw text buffers produced by adapters and the typed column store.
pub use table::{Column, RawRow, RawTable, RowView, Table};
/// Cell value model.
pub use value::{Value, ValueKey};

use thiserror::Error;

/// Errors that can occur when working with tables
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Row width mismatch in '{table}': expected {expected} values, got {actual}")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column '{column}' in '{table}'")]
    DuplicateColumn { table: String, column: String },
}

/// Crate-local result type for table operations.
pub type Result<T> = std::result::Result<T, Error>;
