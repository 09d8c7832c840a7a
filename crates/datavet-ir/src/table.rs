//! Raw and typed tabular buffers
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::value::Value;
use crate::{Error, Result};
use std::collections::HashMap;

/// One record as read from the source, before coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Line (or sheet row) in the source, 1-indexed
    pub line: usize,

    /// Cell texts in source order
    pub cells: Vec<String>,
}

impl RawRow {
    /// Create a new raw row
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }
}

/// Text buffer produced by an adapter for one dataset
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Source file (or archive member / sheet) the rows came from
    pub source: String,

    /// Header row, when the format declares one
    pub header: Option<Vec<String>>,

    /// Line of the header row in the source
    pub header_line: usize,

    /// Data rows in source order
    pub rows: Vec<RawRow>,

    /// Structural problems noticed while decoding (e.g. encoding fallback)
    pub notices: Vec<String>,
}

impl RawTable {
    /// Create an empty buffer for a source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Set the header row
    pub fn with_header(mut self, header: Vec<String>, line: usize) -> Self {
        self.header = Some(header);
        self.header_line = line;
        self
    }

    /// Append a data row
    pub fn push_row(&mut self, line: usize, cells: Vec<String>) {
        self.rows.push(RawRow::new(line, cells));
    }

    /// Record a structural notice
    pub fn add_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// Number of data rows
    pub fn record_count(&self) -> usize {
        self.rows.len()
    }
}

/// A named column of typed values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Column-oriented table of typed values
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    lines: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Create an empty table with the given column names
    ///
    /// # Errors
    ///
    /// Returns an error when a column name is repeated.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut table = Self {
            name,
            columns: Vec::new(),
            lines: Vec::new(),
            index: HashMap::new(),
        };
        for column in columns {
            let column = column.into();
            if table.index.contains_key(&column) {
                return Err(Error::DuplicateColumn {
                    table: table.name.clone(),
                    column,
                });
            }
            table.index.insert(column.clone(), table.columns.len());
            table.columns.push(Column {
                name: column,
                values: Vec::new(),
            });
        }
        Ok(table)
    }

    /// Append a row of values in column order
    ///
    /// # Errors
    ///
    /// Returns an error when the row width differs from the column count.
    pub fn push_row(&mut self, line: usize, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::RowWidth {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.values.push(value);
        }
        self.lines.push(line);
        Ok(())
    }

    /// Table name (the dataset name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Source line of every row
    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    /// All columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Borrow one row
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.row_count()).then_some(RowView { table: self, index })
    }

    /// Iterate over all rows
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.row_count()).map(move |index| RowView { table: self, index })
    }
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowView<'a> {
    /// Value of a named column in this row
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table
            .column(column)
            .and_then(|c| c.values.get(self.index))
    }

    /// Source line of this row
    pub fn line(&self) -> usize {
        self.table.lines[self.index]
    }

    /// Row position within the table
    pub fn index(&self) -> usize {
        self.index
    }

    /// The table the row belongs to
    pub fn table(&self) -> &'a Table {
        self.table
    }
}
