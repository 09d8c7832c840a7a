//! End-to-end checks of the rule language over realistic tables

use anyhow::Result;
use chrono::NaiveDate;
use datavet_expr::{parse, Error, Evaluator, PackageScope, RowScope, TableScope};
use datavet_ir::{Table, Value};

fn date(y: i32, m: u32, d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn contracts() -> Result<Table> {
    let mut table = Table::new("contracts", ["id", "start", "end", "status"])?;
    table.push_row(
        2,
        vec![
            Value::Integer(1),
            date(2024, 1, 1),
            date(2024, 12, 31),
            Value::Text("active".into()),
        ],
    )?;
    table.push_row(
        3,
        vec![
            Value::Integer(2),
            date(2024, 6, 1),
            date(2024, 3, 1),
            Value::Text("active".into()),
        ],
    )?;
    table.push_row(
        4,
        vec![
            Value::Integer(3),
            date(2024, 2, 1),
            Value::Null,
            Value::Text("open".into()),
        ],
    )?;
    Ok(table)
}

#[test]
fn test_row_rules_evaluated_per_row() -> Result<()> {
    let table = contracts()?;
    let expr = parse("end is null or end >= start")?;
    let evaluator = Evaluator::new();

    let failing: Vec<usize> = (0..table.row_count())
        .filter(|&i| {
            !evaluator
                .check(&expr, &RowScope::new(&table, i))
                .map(|v| v.passed)
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(failing, vec![1]);
    Ok(())
}

#[test]
fn test_dates_compare_against_iso_literals() -> Result<()> {
    let table = contracts()?;
    let verdict = Evaluator::new().check(
        &parse("start >= '2024-01-01' and start < '2025-01-01'")?,
        &TableScope::new(&table),
    )?;
    assert!(verdict.passed);
    Ok(())
}

#[test]
fn test_dataset_rule_mixing_aggregate_and_column() -> Result<()> {
    let table = contracts()?;
    let verdict = Evaluator::new().check(&parse("id * 2 <= max(id) + 2")?, &TableScope::new(&table))?;
    assert_eq!(verdict.failed_rows, vec![2]);
    Ok(())
}

#[test]
fn test_package_rule_on_unqualified_column_is_fault() -> Result<()> {
    let table = contracts()?;
    let scope = PackageScope::new([&table]);
    let err = Evaluator::new().check(&parse("id > 0")?, &scope).unwrap_err();
    assert_eq!(err, Error::UnqualifiedReference("id".into()));
    Ok(())
}

#[test]
fn test_field_rule_uses_value_binding() -> Result<()> {
    let table = contracts()?;
    let expr = parse("value in ['active', 'closed']")?;
    let evaluator = Evaluator::new();

    let results: Vec<bool> = table
        .rows()
        .map(|row| {
            let value = row.get("status").unwrap();
            evaluator
                .check(&expr, &RowScope::new(&table, row.index()).with_value(value))
                .map(|v| v.passed)
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(results, vec![true, true, false]);
    Ok(())
}
