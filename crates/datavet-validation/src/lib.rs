#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-validation
//!
//! Type coercion, field constraints and rule evaluation.
//!
//! The engine takes a dataset declaration and the raw buffer an adapter
//! produced, and records every finding in a [`datavet_report::EventLog`]:
//! structural (format) problems, coercion errors, constraint violations,
//! duplicates in unique fields, failing field/row/dataset rules and rules
//! that could not be evaluated. Package rules run afterwards over the typed
//! tables of all members.
//!
//! ## Example Usage
//!
//! ```rust
//! use datavet_ir::RawTable;
//! use datavet_report::EventLog;
//! use datavet_validation::ValidationEngine;
//!
//! let schema = datavet_schema::load(
//!     "metadata: { name: demo }\ndatasets:\n  items:\n    fields: [ { name: qty, type: integer } ]\n",
//! )
//! .unwrap();
//!
//! let mut raw = RawTable::new("items.csv").with_header(vec!["qty".into()], 1);
//! raw.push_row(2, vec!["three".into()]);
//!
//! let mut log = EventLog::new();
//! let outcome = ValidationEngine::new().validate_dataset(&schema.datasets[0], &raw, &mut log);
//! assert_eq!(outcome.records, 1);
//! assert_eq!(log.error_count(), 1);
//! ```

pub mod coerce;
pub mod constraints;
pub mod engine;
pub mod package;

pub use coerce::{coerce, CoercionError};
pub use constraints::{Constraint, Violation};
pub use engine::{DatasetOutcome, RuleScope, ValidationConfig, ValidationEngine};

use datavet_ir::RawTable;
use datavet_report::EventLog;
use datavet_schema::DatasetSpec;

/// Convenience function to validate a dataset with default settings
pub fn validate_dataset(spec: &DatasetSpec, raw: &RawTable, log: &mut EventLog) -> DatasetOutcome {
    ValidationEngine::new().validate_dataset(spec, raw, log)
}
