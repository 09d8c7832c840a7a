//! Name resolution for rule evaluation
//!
//! A [`Scope`] decides what a column reference means: a single cell in row
//! scope, a whole column in dataset scope, a qualified column of one member
//! table in package scope.

use crate::ast::ColumnRef;
use crate::eval::Datum;
use crate::{Error, Result};
use datavet_ir::{Table, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Name used by field rules to address the field's own value
pub const VALUE_BINDING: &str = "value";

/// Resolves column references during evaluation
pub trait Scope {
    /// Resolve a reference for element-wise use
    ///
    /// # Errors
    ///
    /// Unknown columns or datasets and references the scope cannot address.
    fn lookup(&self, column: &ColumnRef) -> Result<Datum<'_>>;

    /// The whole column behind a reference, used by aggregates and set membership
    ///
    /// # Errors
    ///
    /// Same conditions as [`Scope::lookup`].
    fn column(&self, column: &ColumnRef) -> Result<&[Value]>;

    /// Number of rows `count()` reports
    ///
    /// # Errors
    ///
    /// Scopes spanning several tables have no single row count.
    fn row_count(&self) -> Result<usize>;

    /// The scope with every row visible; aggregates always range over it
    fn unmasked(&self) -> &dyn Scope;
}

fn own_column<'t>(table: &'t Table, column: &ColumnRef) -> Result<&'t [Value]> {
    if let Some(dataset) = &column.dataset {
        if dataset != table.name() {
            return Err(Error::UnknownDataset(dataset.clone()));
        }
    }
    table
        .column(&column.name)
        .map(|c| c.values.as_slice())
        .ok_or_else(|| Error::UnknownColumn(column.to_string()))
}

/// One row of a table; references resolve to single cells
#[derive(Debug, Clone, Copy)]
pub struct RowScope<'a> {
    table: &'a Table,
    index: usize,
    value: Option<&'a Value>,
}

impl<'a> RowScope<'a> {
    #[must_use]
    pub fn new(table: &'a Table, index: usize) -> Self {
        Self {
            table,
            index,
            value: None,
        }
    }

    /// Bind `value` to a field's own cell (field rules)
    #[must_use]
    pub fn with_value(mut self, value: &'a Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl Scope for RowScope<'_> {
    fn lookup(&self, column: &ColumnRef) -> Result<Datum<'_>> {
        if column.dataset.is_none() && column.name == VALUE_BINDING {
            if let Some(value) = self.value {
                return Ok(Datum::Scalar(value.clone()));
            }
        }
        let values = own_column(self.table, column)?;
        Ok(Datum::Scalar(
            values.get(self.index).cloned().unwrap_or(Value::Null),
        ))
    }

    fn column(&self, column: &ColumnRef) -> Result<&[Value]> {
        own_column(self.table, column)
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.table.row_count())
    }

    fn unmasked(&self) -> &dyn Scope {
        self
    }
}

/// A whole table; references resolve to columns
#[derive(Debug, Clone, Copy)]
pub struct TableScope<'a> {
    table: &'a Table,
}

impl<'a> TableScope<'a> {
    #[must_use]
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }
}

impl Scope for TableScope<'_> {
    fn lookup(&self, column: &ColumnRef) -> Result<Datum<'_>> {
        own_column(self.table, column).map(|values| Datum::Column(Cow::Borrowed(values)))
    }

    fn column(&self, column: &ColumnRef) -> Result<&[Value]> {
        own_column(self.table, column)
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.table.row_count())
    }

    fn unmasked(&self) -> &dyn Scope {
        self
    }
}

/// Several member tables addressed as `dataset.column`
#[derive(Debug, Clone, Default)]
pub struct PackageScope<'a> {
    tables: HashMap<&'a str, &'a Table>,
}

impl<'a> PackageScope<'a> {
    /// Build a scope over tables keyed by their names
    pub fn new(tables: impl IntoIterator<Item = &'a Table>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name(), t)).collect(),
        }
    }

    /// Look a member table up by name
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&'a Table> {
        self.tables.get(name).copied()
    }

    fn resolve(&self, column: &ColumnRef) -> Result<&'a [Value]> {
        let dataset = column
            .dataset
            .as_deref()
            .ok_or_else(|| Error::UnqualifiedReference(column.name.clone()))?;
        let table = self
            .table(dataset)
            .ok_or_else(|| Error::UnknownDataset(dataset.to_string()))?;
        own_column(table, column)
    }
}

impl Scope for PackageScope<'_> {
    fn lookup(&self, column: &ColumnRef) -> Result<Datum<'_>> {
        self.resolve(column)
            .map(|values| Datum::Column(Cow::Borrowed(values)))
    }

    fn column(&self, column: &ColumnRef) -> Result<&[Value]> {
        self.resolve(column)
    }

    fn row_count(&self) -> Result<usize> {
        Err(Error::UnqualifiedReference("count()".to_string()))
    }

    fn unmasked(&self) -> &dyn Scope {
        self
    }
}

/// Another scope restricted to some positions of its columns
///
/// Element-wise lookups only see the selected rows. Whole-column access and
/// the row count still describe the full scope.
pub(crate) struct MaskedScope<'a> {
    inner: &'a dyn Scope,
    rows: &'a [usize],
    length: usize,
}

impl<'a> MaskedScope<'a> {
    /// `length` is the column length `rows` index into
    pub(crate) fn new(inner: &'a dyn Scope, rows: &'a [usize], length: usize) -> Self {
        Self {
            inner,
            rows,
            length,
        }
    }
}

impl Scope for MaskedScope<'_> {
    fn lookup(&self, column: &ColumnRef) -> Result<Datum<'_>> {
        match self.inner.lookup(column)? {
            Datum::Scalar(value) => Ok(Datum::Scalar(value)),
            Datum::Column(values) => {
                if values.len() != self.length {
                    return Err(Error::LengthMismatch {
                        left: self.length,
                        right: values.len(),
                    });
                }
                let selected = self.rows.iter().map(|&i| values[i].clone()).collect();
                Ok(Datum::Column(Cow::Owned(selected)))
            }
        }
    }

    fn column(&self, column: &ColumnRef) -> Result<&[Value]> {
        self.inner.column(column)
    }

    fn row_count(&self) -> Result<usize> {
        self.inner.row_count()
    }

    fn unmasked(&self) -> &dyn Scope {
        self.inner.unmasked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clients() -> Table {
        let mut table = Table::new("clients", ["id", "name"]).unwrap();
        table
            .push_row(2, vec![Value::Integer(1), Value::Text("Ann".into())])
            .unwrap();
        table
            .push_row(3, vec![Value::Integer(2), Value::Text("Bob".into())])
            .unwrap();
        table
    }

    #[test]
    fn test_row_scope_resolves_cell_and_binding() {
        let table = clients();
        let bound = Value::Integer(99);
        let scope = RowScope::new(&table, 1).with_value(&bound);

        assert_eq!(
            scope.lookup(&ColumnRef::new("name")).unwrap(),
            Datum::Scalar(Value::Text("Bob".into()))
        );
        assert_eq!(
            scope.lookup(&ColumnRef::new("value")).unwrap(),
            Datum::Scalar(Value::Integer(99))
        );
        assert_eq!(scope.column(&ColumnRef::new("id")).unwrap().len(), 2);
        assert_eq!(
            scope.lookup(&ColumnRef::new("missing")).unwrap_err(),
            Error::UnknownColumn("missing".into())
        );
    }

    #[test]
    fn test_table_scope_accepts_own_qualifier_only() {
        let table = clients();
        let scope = TableScope::new(&table);

        assert!(scope.lookup(&ColumnRef::qualified("clients", "id")).is_ok());
        assert_eq!(
            scope
                .lookup(&ColumnRef::qualified("orders", "id"))
                .unwrap_err(),
            Error::UnknownDataset("orders".into())
        );
    }

    #[test]
    fn test_package_scope_requires_qualification() {
        let table = clients();
        let scope = PackageScope::new([&table]);

        assert!(matches!(
            scope.lookup(&ColumnRef::qualified("clients", "id")).unwrap(),
            Datum::Column(values) if values.len() == 2
        ));
        assert_eq!(
            scope.lookup(&ColumnRef::new("id")).unwrap_err(),
            Error::UnqualifiedReference("id".into())
        );
        assert_eq!(
            scope
                .lookup(&ColumnRef::qualified("products", "id"))
                .unwrap_err(),
            Error::UnknownDataset("products".into())
        );
        assert!(scope.row_count().is_err());
    }

    #[test]
    fn test_masked_scope_selects_rows_but_keeps_whole_columns() {
        let table = clients();
        let inner = TableScope::new(&table);
        let rows = [1];
        let scope = MaskedScope::new(&inner, &rows, 2);

        assert_eq!(
            scope.lookup(&ColumnRef::new("name")).unwrap(),
            Datum::Column(Cow::Owned(vec![Value::Text("Bob".into())]))
        );
        assert_eq!(scope.column(&ColumnRef::new("id")).unwrap().len(), 2);
        assert_eq!(scope.row_count().unwrap(), 2);

        let short = MaskedScope::new(&inner, &rows, 5);
        assert_eq!(
            short.lookup(&ColumnRef::new("id")).unwrap_err(),
            Error::LengthMismatch { left: 5, right: 2 }
        );
    }
}
