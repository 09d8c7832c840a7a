#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # datavet-expr
//!
//! Restricted boolean rule language evaluated over datavet tables.
//!
//! Rules are side-effect free predicates: column references, literals,
//! comparison/membership/logical operators, a little arithmetic and a closed
//! set of functions (`sum`, `count`, `min`, `max`, `mean`, `isin`, `len`,
//! `lower`, `upper`, `coalesce`, `all`, `any`). There are no loops, no
//! assignments and no access to anything outside the tables in scope.
//!
//! ## Example Usage
//!
//! ```rust
//! use datavet_expr::{parse, Evaluator, TableScope};
//! use datavet_ir::{Table, Value};
//!
//! let mut table = Table::new("orders", ["amount"]).unwrap();
//! table.push_row(2, vec![Value::Integer(10)]).unwrap();
//! table.push_row(3, vec![Value::Integer(-4)]).unwrap();
//!
//! let expr = parse("amount > 0").unwrap();
//! let verdict = Evaluator::new().check(&expr, &TableScope::new(&table)).unwrap();
//! assert!(!verdict.passed);
//! assert_eq!(verdict.failed_rows, vec![1]);
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{BinaryOp, ColumnRef, Expr, Function, UnaryOp};
pub use eval::{Datum, Evaluator, Verdict};
pub use parser::parse;
pub use scope::{PackageScope, RowScope, Scope, TableScope};

use thiserror::Error;

/// Errors raised while parsing or evaluating a rule expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The expression text is not valid
    #[error("Syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("Column '{0}' must be qualified with a dataset name in this scope")]
    UnqualifiedReference(String),

    #[error("Type mismatch for '{op}': cannot apply to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("Length mismatch: cannot combine columns of {left} and {right} rows")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow in '{0}'")]
    Overflow(String),

    #[error("Function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Expression did not evaluate to a boolean (got {0})")]
    NonBoolean(String),
}

impl Error {
    /// Build a syntax error at a 1-indexed character column
    pub fn syntax(column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            column,
            message: message.into(),
        }
    }

    /// Build a type mismatch error from operand type names
    pub fn type_mismatch(
        op: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            op: op.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    /// Whether this error was raised by the parser rather than the evaluator
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
