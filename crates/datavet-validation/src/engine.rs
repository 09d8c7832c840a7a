//! Validation engine
//!
//! Validates one dataset at a time: locate the declared fields in the raw
//! buffer, coerce every cell, check field constraints and uniqueness, then
//! evaluate field, row and dataset rules. Every outcome is recorded in the
//! run's [`EventLog`]; nothing here aborts a run.

use crate::coerce::coerce;
use crate::constraints::Constraint;
use datavet_expr::{Error as ExprError, Evaluator, RowScope, TableScope, Verdict};
use datavet_ir::{RawTable, Table, Value, ValueKey};
use datavet_report::{Category, EventLog, Level, LogEntry};
use datavet_schema::{DatasetSpec, Severity, ValidationRule};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, trace, warn};

/// Granularity a rule is evaluated at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    Field,
    Row,
    Dataset,
    Package,
}

impl RuleScope {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "field" => Some(Self::Field),
            "row" => Some(Self::Row),
            "dataset" => Some(Self::Dataset),
            "package" => Some(Self::Package),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Row => "row",
            Self::Dataset => "dataset",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Duplicates listed per unique field before the listing is truncated
    pub max_duplicate_reports: usize,
    /// Failing rows listed in the detail of a vectorised rule
    pub max_listed_failures: usize,
    /// Record count above which rules of `skip_scopes` are not evaluated
    pub skip_rules_above: Option<usize>,
    pub skip_scopes: Vec<RuleScope>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_duplicate_reports: 100,
            max_listed_failures: 10,
            skip_rules_above: None,
            skip_scopes: vec![RuleScope::Row],
        }
    }
}

impl ValidationConfig {
    /// Whether rules of a scope are skipped for a dataset of this size
    #[must_use]
    pub fn skips(&self, scope: RuleScope, records: usize) -> bool {
        self.skip_rules_above
            .is_some_and(|limit| records > limit && self.skip_scopes.contains(&scope))
    }
}

/// What validating one dataset produced
#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub dataset: String,
    /// File or archive entry the data came from
    pub source: String,
    /// Data rows read, including rows that failed
    pub records: usize,
    pub errors: usize,
    /// Typed table, absent when the layout could not be resolved
    pub table: Option<Table>,
}

/// Where each declared field sits in a raw row
struct Layout {
    positions: Vec<usize>,
    width: usize,
}

/// Main validation engine
#[derive(Debug, Default)]
pub struct ValidationEngine {
    config: ValidationConfig,
    evaluator: Evaluator,
}

impl ValidationEngine {
    /// Create a new validation engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self {
            config,
            evaluator: Evaluator::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub(crate) fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Validate one dataset read from `raw`
    pub fn validate_dataset(
        &self,
        spec: &DatasetSpec,
        raw: &RawTable,
        log: &mut EventLog,
    ) -> DatasetOutcome {
        let source = raw.source.as_str();
        let records = raw.record_count();
        let errors_before = log.error_count();
        log.begin_dataset(&spec.name, source);

        for notice in &raw.notices {
            log.record(LogEntry::error(Category::Format, notice.clone()).with_file(source));
        }

        let table = match self.resolve_layout(spec, raw, log) {
            Some(layout) => self.build_table(spec, raw, &layout, log),
            None => {
                log.record(
                    LogEntry::warning(
                        Category::Skipped,
                        format!("Rules of dataset '{}' not evaluated: header does not match the schema", spec.name),
                    )
                    .with_file(source),
                );
                None
            }
        };

        if let Some((table, coercion_failed)) = &table {
            self.check_unique(spec, table, source, log);
            self.run_field_rules(spec, table, source, log);
            self.run_row_rules(spec, table, coercion_failed, source, log);
            self.run_dataset_rules(spec, table, source, log);
        }

        let errors = log.error_count() - errors_before;
        if errors == 0 {
            log.record(LogEntry::success(format!(
                "Dataset '{}' passed validation ({} record(s))",
                spec.name, records
            )));
        } else {
            log.record(LogEntry::info(format!(
                "Dataset '{}' finished with {} error(s) ({} record(s))",
                spec.name, errors, records
            )));
        }
        log.end_dataset(records);

        DatasetOutcome {
            dataset: spec.name.clone(),
            source: source.to_string(),
            records,
            errors,
            table: table.map(|(table, _)| table),
        }
    }

    fn resolve_layout(&self, spec: &DatasetSpec, raw: &RawTable, log: &mut EventLog) -> Option<Layout> {
        let declared = spec.fields.len();
        let header = match (&raw.header, spec.has_header()) {
            (Some(header), true) => header,
            // Positional contract, or an empty file with no header at all.
            _ => {
                return Some(Layout {
                    positions: (0..declared).collect(),
                    width: declared,
                });
            }
        };

        let mut positions = Vec::with_capacity(declared);
        let mut missing = false;
        for field in &spec.fields {
            match header.iter().position(|h| h.trim() == field.name) {
                Some(position) => positions.push(position),
                None => {
                    missing = true;
                    log.record(
                        LogEntry::error(
                            Category::Format,
                            format!("Header is missing declared column '{}'", field.name),
                        )
                        .with_file(&raw.source),
                    );
                }
            }
        }

        for (position, name) in header.iter().enumerate() {
            if !positions.contains(&position) {
                log.record(
                    LogEntry::warning(
                        Category::Format,
                        format!("Column '{}' is not declared and was ignored", name.trim()),
                    )
                    .with_file(&raw.source),
                );
            }
        }

        if missing {
            debug!("{}: header does not provide every declared field", raw.source);
            return None;
        }
        Some(Layout {
            positions,
            width: header.len(),
        })
    }

    /// Coerce every well-formed row; returns the table and, per table row,
    /// whether any cell failed coercion
    fn build_table(
        &self,
        spec: &DatasetSpec,
        raw: &RawTable,
        layout: &Layout,
        log: &mut EventLog,
    ) -> Option<(Table, Vec<bool>)> {
        let source = raw.source.as_str();
        let mut table = match Table::new(&spec.name, spec.field_names()) {
            Ok(table) => table,
            Err(e) => {
                log.record(LogEntry::error(Category::Format, e.to_string()).with_file(source));
                return None;
            }
        };

        let constraints: Vec<Option<Constraint>> = spec
            .fields
            .iter()
            .map(|field| match Constraint::from_field(field) {
                Ok(c) if c.is_empty() => None,
                Ok(c) => Some(c),
                Err(e) => {
                    log.record(
                        LogEntry::error(
                            Category::RuleFault,
                            format!("Pattern of field '{}' could not be compiled: {}", field.name, e),
                        )
                        .with_file(source)
                        .with_rule(format!("{}.pattern", field.name)),
                    );
                    None
                }
            })
            .collect();

        let mut coercion_failed = Vec::with_capacity(raw.record_count());
        for row in &raw.rows {
            if row.cells.len() != layout.width {
                log.record(
                    LogEntry::error(
                        Category::Format,
                        format!(
                            "Row has {} value(s), expected {}",
                            row.cells.len(),
                            layout.width
                        ),
                    )
                    .with_file(source)
                    .with_line(row.line),
                );
                continue;
            }

            let mut failed = false;
            let mut values = Vec::with_capacity(spec.fields.len());
            for ((field, &position), constraint) in
                spec.fields.iter().zip(&layout.positions).zip(&constraints)
            {
                let cell = row.cells.get(position).map_or("", String::as_str);
                match coerce(cell, field) {
                    Ok(value) => {
                        for violation in constraint.iter().flat_map(|c| c.check(cell, &value)) {
                            log.record(
                                LogEntry::error(Category::FieldRule, violation.message)
                                    .with_file(source)
                                    .with_line(row.line)
                                    .with_rule(format!("{}.{}", field.name, violation.constraint))
                                    .with_value(cell),
                            );
                        }
                        values.push(value);
                    }
                    Err(e) => {
                        failed = true;
                        let mut entry = LogEntry::error(Category::Coercion, e.to_string())
                            .with_file(source)
                            .with_line(row.line)
                            .with_rule(&field.name);
                        if let Some(value) = e.value() {
                            entry = entry.with_value(value);
                        }
                        log.record(entry);
                        values.push(Value::Null);
                    }
                }
            }

            if let Err(e) = table.push_row(row.line, values) {
                log.record(
                    LogEntry::error(Category::Format, e.to_string())
                        .with_file(source)
                        .with_line(row.line),
                );
                continue;
            }
            coercion_failed.push(failed);
        }

        debug!(
            "{}: {} of {} record(s) typed",
            source,
            table.row_count(),
            raw.record_count()
        );
        Some((table, coercion_failed))
    }

    fn check_unique(&self, spec: &DatasetSpec, table: &Table, source: &str, log: &mut EventLog) {
        for field in spec.fields.iter().filter(|f| f.unique) {
            let Some(column) = table.column(&field.name) else {
                continue;
            };
            let mut first_seen: HashMap<ValueKey, usize> = HashMap::new();
            let mut reported = 0;
            let mut unlisted = 0;

            for (value, &line) in column.values.iter().zip(table.lines()) {
                if value.is_null() {
                    continue;
                }
                match first_seen.entry(value.key()) {
                    Entry::Vacant(slot) => {
                        slot.insert(line);
                    }
                    Entry::Occupied(first) if reported < self.config.max_duplicate_reports => {
                        reported += 1;
                        log.record(
                            LogEntry::error(
                                Category::Unique,
                                format!(
                                    "Duplicate value in unique field '{}' (first seen at line {})",
                                    field.name,
                                    first.get()
                                ),
                            )
                            .with_file(source)
                            .with_line(line)
                            .with_rule(&field.name)
                            .with_value(value.to_string()),
                        );
                    }
                    Entry::Occupied(_) => unlisted += 1,
                }
            }

            if unlisted > 0 {
                warn!("{}: duplicate listing for '{}' truncated", source, field.name);
                log.record(
                    LogEntry::warning(
                        Category::Unique,
                        format!(
                            "Duplicate listing for field '{}' truncated after {} report(s) for performance; {} further duplicate(s) not listed",
                            field.name, reported, unlisted
                        ),
                    )
                    .with_file(source)
                    .with_rule(&field.name),
                );
            }
        }
    }

    fn run_field_rules(&self, spec: &DatasetSpec, table: &Table, source: &str, log: &mut EventLog) {
        let rules = spec.fields.iter().flat_map(|f| f.rules.iter());
        if self.skip(RuleScope::Field, rules, table.row_count(), source, log) {
            return;
        }

        for field in spec.fields.iter().filter(|f| !f.rules.is_empty()) {
            let Some(column) = table.column(&field.name) else {
                continue;
            };
            for rule in &field.rules {
                let mut faults = HashSet::new();
                for (index, value) in column.values.iter().enumerate() {
                    if value.is_null() {
                        continue;
                    }
                    let line = table.lines()[index];
                    let scope = RowScope::new(table, index).with_value(value);
                    match self.evaluator.check(&rule.expr, &scope) {
                        Ok(verdict) if verdict.passed => {}
                        Ok(_) => {
                            log.record(
                                failure(rule, Category::FieldRule)
                                    .with_file(source)
                                    .with_line(line)
                                    .with_value(value.to_string()),
                            );
                        }
                        Err(e) => fault(rule, &e, source, Some(line), &mut faults, log),
                    }
                }
            }
        }
    }

    fn run_row_rules(
        &self,
        spec: &DatasetSpec,
        table: &Table,
        coercion_failed: &[bool],
        source: &str,
        log: &mut EventLog,
    ) {
        if spec.row_rules.is_empty()
            || self.skip(RuleScope::Row, spec.row_rules.iter(), table.row_count(), source, log)
        {
            return;
        }

        for rule in &spec.row_rules {
            let mut faults = HashSet::new();
            for index in 0..table.row_count() {
                if coercion_failed.get(index).copied().unwrap_or(false) {
                    trace!("{}: row {} excluded from '{}'", source, index, rule.name);
                    continue;
                }
                let line = table.lines()[index];
                match self.evaluator.check(&rule.expr, &RowScope::new(table, index)) {
                    Ok(verdict) if verdict.passed => {}
                    Ok(_) => {
                        log.record(failure(rule, Category::RowRule).with_file(source).with_line(line));
                    }
                    Err(e) => fault(rule, &e, source, Some(line), &mut faults, log),
                }
            }
        }
    }

    fn run_dataset_rules(&self, spec: &DatasetSpec, table: &Table, source: &str, log: &mut EventLog) {
        if spec.dataset_rules.is_empty()
            || self.skip(
                RuleScope::Dataset,
                spec.dataset_rules.iter(),
                table.row_count(),
                source,
                log,
            )
        {
            return;
        }

        let scope = TableScope::new(table);
        for rule in &spec.dataset_rules {
            match self.evaluator.check(&rule.expr, &scope) {
                Ok(verdict) if verdict.passed => debug!("{}: rule '{}' passed", source, rule.name),
                Ok(verdict) => {
                    let mut entry = failure(rule, Category::DatasetRule).with_file(source);
                    if let Some(detail) = self.failure_detail(&verdict, rule, table) {
                        entry = entry.with_detail(detail);
                    }
                    log.record(entry);
                }
                Err(e) => fault(rule, &e, source, None, &mut HashSet::new(), log),
            }
        }
    }

    /// Record one warning per rule not evaluated because of the dataset size
    pub(crate) fn skip<'r>(
        &self,
        scope: RuleScope,
        rules: impl Iterator<Item = &'r ValidationRule>,
        records: usize,
        source: &str,
        log: &mut EventLog,
    ) -> bool {
        if !self.config.skips(scope, records) {
            return false;
        }
        let limit = self.config.skip_rules_above.unwrap_or_default();
        for rule in rules {
            log.record(
                LogEntry::warning(
                    Category::Skipped,
                    format!(
                        "{} rule '{}' skipped: {} record(s) exceed the limit of {}",
                        scope, rule.name, records, limit
                    ),
                )
                .with_file(source)
                .with_rule(&rule.name),
            );
        }
        true
    }

    /// Failing row count and the first failing lines of a vectorised result
    ///
    /// When the rule reads a single column of `table`, the offending values
    /// are listed next to their lines.
    pub(crate) fn failure_detail(
        &self,
        verdict: &Verdict,
        rule: &ValidationRule,
        table: &Table,
    ) -> Option<String> {
        if verdict.failed_rows.is_empty() {
            return None;
        }

        let mut columns: Vec<&str> = rule
            .expr
            .references()
            .into_iter()
            .filter(|r| r.dataset.as_deref().is_none_or(|d| d == table.name()))
            .map(|r| r.name.as_str())
            .collect();
        columns.sort_unstable();
        columns.dedup();
        let single = match columns.as_slice() {
            [name] => table.column(name),
            _ => None,
        };

        let listed: Vec<String> = verdict
            .failed_rows
            .iter()
            .take(self.config.max_listed_failures)
            .filter_map(|&index| {
                let line = *table.lines().get(index)?;
                Some(match single.and_then(|c| c.values.get(index)) {
                    Some(value) => format!("{line} ('{value}')"),
                    None => line.to_string(),
                })
            })
            .collect();

        let total = verdict.failed_rows.len();
        let mut detail = format!("{total} failing row(s); first lines: {}", listed.join(", "));
        if total > listed.len() {
            detail.push_str(&format!(" (+{} more)", total - listed.len()));
        }
        Some(detail)
    }
}

fn level(severity: Severity) -> Level {
    match severity {
        Severity::Error => Level::Error,
        Severity::Warning => Level::Warning,
    }
}

/// Entry for a rule that evaluated to false
pub(crate) fn failure(rule: &ValidationRule, category: Category) -> LogEntry {
    LogEntry::new(level(rule.severity), category, rule.description.clone()).with_rule(&rule.name)
}

/// Record a rule fault once per distinct message
pub(crate) fn fault(
    rule: &ValidationRule,
    error: &ExprError,
    source: &str,
    line: Option<usize>,
    seen: &mut HashSet<String>,
    log: &mut EventLog,
) {
    let message = error.to_string();
    if !seen.insert(message.clone()) {
        return;
    }
    warn!("Rule '{}' could not be evaluated: {}", rule.name, message);
    let mut entry = LogEntry::error(
        Category::RuleFault,
        format!("Rule '{}' could not be evaluated: {}", rule.name, message),
    )
    .with_rule(&rule.name)
    .with_detail(rule.expression.clone());
    if !source.is_empty() {
        entry = entry.with_file(source);
    }
    if let Some(line) = line {
        entry = entry.with_line(line);
    }
    log.record(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavet_schema::FieldType;

    fn schema(yaml: &str) -> datavet_schema::SchemaDocument {
        datavet_schema::load(yaml).unwrap()
    }

    fn raw(header: Option<&[&str]>, rows: &[&[&str]]) -> RawTable {
        let mut raw = RawTable::new("data.csv");
        let mut line = 1;
        if let Some(header) = header {
            raw = raw.with_header(header.iter().map(ToString::to_string).collect(), line);
            line += 1;
        }
        for row in rows {
            raw.push_row(line, row.iter().map(ToString::to_string).collect());
            line += 1;
        }
        raw
    }

    const CLIENTS: &str = "
metadata: { name: t }
datasets:
  clients:
    fields:
      - { name: id, type: integer, unique: true }
      - { name: name, type: text, required: true }
      - { name: age, type: integer, rules: [ 'value >= 18' ] }
    row_rules:
      - { name: named_adult, expression: 'age is null or len(name) > 1', severity: warning }
    dataset_rules:
      - { name: ids_positive, expression: 'id > 0', description: 'Ids must be positive' }
";

    #[test]
    fn test_clean_dataset_has_no_errors() {
        let doc = schema(CLIENTS);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "age"]), &[&["1", "Ann", "30"], &["2", "Bob", ""]]),
            &mut log,
        );
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.errors, 0);
        assert_eq!(log.warning_count(), 0);
        assert_eq!(outcome.table.unwrap().row_count(), 2);
        assert_eq!(log.entries().last().unwrap().level, Level::Success);
    }

    #[test]
    fn test_duplicate_reports_second_occurrence() {
        let doc = schema(CLIENTS);
        let mut log = EventLog::new();
        ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "age"]), &[&["7", "Ann", ""], &["7", "Bob", ""]]),
            &mut log,
        );
        let dups: Vec<_> = log.by_category(Category::Unique).collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].line, Some(3));
        assert!(dups[0].message.contains("first seen at line 2"));
    }

    #[test]
    fn test_duplicate_listing_is_capped() {
        let doc = schema(CLIENTS);
        let rows: Vec<Vec<&str>> = (0..6).map(|_| vec!["1", "Ann", ""]).collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let mut log = EventLog::new();
        let engine = ValidationEngine::with_config(ValidationConfig {
            max_duplicate_reports: 2,
            ..ValidationConfig::default()
        });
        engine.validate_dataset(&doc.datasets[0], &raw(Some(&["id", "name", "age"]), &rows), &mut log);

        let entries: Vec<_> = log.by_category(Category::Unique).collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].level, Level::Warning);
        assert!(entries[2].message.contains("3 further duplicate(s)"));
    }

    #[test]
    fn test_missing_header_column_skips_rules() {
        let doc = schema(CLIENTS);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "extra"]), &[&["-1", "A", "x"]]),
            &mut log,
        );
        assert!(outcome.table.is_none());
        assert_eq!(outcome.records, 1);
        let format: Vec<_> = log.by_category(Category::Format).collect();
        assert_eq!(format.len(), 2);
        assert_eq!(format[0].level, Level::Error);
        assert!(format[0].message.contains("'age'"));
        assert_eq!(format[1].level, Level::Warning);
        assert_eq!(log.by_category(Category::DatasetRule).count(), 0);
    }

    #[test]
    fn test_header_columns_located_by_name() {
        let doc = schema(CLIENTS);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["age", "id", "name"]), &[&["40", "3", "Cy"]]),
            &mut log,
        );
        let table = outcome.table.unwrap();
        assert_eq!(table.column("age").unwrap().values, vec![Value::Integer(40)]);
        assert_eq!(log.error_count(), 0);
    }

    #[test]
    fn test_rule_kinds_and_severity() {
        let doc = schema(CLIENTS);
        let mut log = EventLog::new();
        ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "age"]), &[&["-4", "A", "12"], &["5", "Bo", "20"]]),
            &mut log,
        );

        let field: Vec<_> = log.by_category(Category::FieldRule).collect();
        assert_eq!(field.len(), 1);
        assert_eq!(field[0].line, Some(2));
        assert_eq!(field[0].value.as_deref(), Some("12"));

        let row: Vec<_> = log.by_category(Category::RowRule).collect();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].level, Level::Warning);

        let dataset: Vec<_> = log.by_category(Category::DatasetRule).collect();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0].message, "Ids must be positive");
        assert_eq!(dataset[0].detail.as_deref(), Some("1 failing row(s); first lines: 2 ('-4')"));
    }

    #[test]
    fn test_coercion_failure_excludes_row_from_row_rules() {
        let yaml = "
metadata: { name: t }
datasets:
  products:
    fields:
      - { name: sku, type: text }
      - { name: price, type: decimal }
    row_rules: [ 'price > 0' ]
";
        let doc = schema(yaml);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["sku", "price"]), &[&["A", "abc"], &["B", "2.5"]]),
            &mut log,
        );
        let coercion: Vec<_> = log.by_category(Category::Coercion).collect();
        assert_eq!(coercion.len(), 1);
        assert_eq!(coercion[0].line, Some(2));
        assert_eq!(coercion[0].value.as_deref(), Some("abc"));
        assert!(coercion[0].message.contains("'price'"));
        assert_eq!(log.by_category(Category::RowRule).count(), 0);
        assert_eq!(outcome.errors, 1);
    }

    #[test]
    fn test_headerless_width_mismatch() {
        let yaml = "
metadata: { name: t }
datasets:
  wide:
    file_format: { type: csv, header: false }
    fields: [ { name: a }, { name: b }, { name: c }, { name: d }, { name: e } ]
    row_rules: [ 'a is not null' ]
";
        let doc = schema(yaml);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(None, &[&["1", "2", "3", "4", "5"], &["1", "2", "3", "4"]]),
            &mut log,
        );
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.table.unwrap().row_count(), 1);
        let format: Vec<_> = log.by_category(Category::Format).collect();
        assert_eq!(format.len(), 1);
        assert_eq!(format[0].line, Some(2));
        assert_eq!(format[0].message, "Row has 4 value(s), expected 5");
        assert_eq!(log.file_stats()[0].records, 2);
    }

    #[test]
    fn test_rule_fault_reported_once() {
        let yaml = "
metadata: { name: t }
datasets:
  d:
    fields: [ { name: a, type: integer } ]
    row_rules: [ { name: typo, expression: 'b > 1' } ]
";
        let doc = schema(yaml);
        let mut log = EventLog::new();
        ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["a"]), &[&["1"], &["2"], &["3"]]),
            &mut log,
        );
        let faults: Vec<_> = log.by_category(Category::RuleFault).collect();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].message.contains("typo"));
        assert_eq!(log.by_category(Category::RowRule).count(), 0);
    }

    #[test]
    fn test_guarded_row_rule_skips_excluded_rows() {
        let yaml = "
metadata: { name: t }
datasets:
  lines:
    fields:
      - { name: qty, type: integer }
      - { name: total, type: integer }
    row_rules:
      - { name: unit_price, expression: 'qty == 0 or total / qty >= 1' }
    dataset_rules:
      - { name: positive_units, expression: 'qty == 0 or total / qty > 0' }
";
        let doc = schema(yaml);
        let mut log = EventLog::new();
        let outcome = ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["qty", "total"]), &[&["0", "0"], &["2", "10"]]),
            &mut log,
        );
        assert_eq!(outcome.errors, 0);
        assert_eq!(log.by_category(Category::RuleFault).count(), 0);
        assert_eq!(log.by_category(Category::RowRule).count(), 0);
        assert_eq!(log.by_category(Category::DatasetRule).count(), 0);
    }

    #[test]
    fn test_skip_threshold() {
        let doc = schema(CLIENTS);
        let engine = ValidationEngine::with_config(ValidationConfig {
            skip_rules_above: Some(1),
            ..ValidationConfig::default()
        });
        let mut log = EventLog::new();
        engine.validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "age"]), &[&["1", "A", ""], &["2", "B", ""]]),
            &mut log,
        );
        let skipped: Vec<_> = log.by_category(Category::Skipped).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].rule.as_deref(), Some("named_adult"));
        assert_eq!(log.by_category(Category::RowRule).count(), 0);
        assert!(engine.config().skips(RuleScope::Row, 2));
        assert!(!engine.config().skips(RuleScope::Dataset, 2));
    }

    #[test]
    fn test_constraints_reported_as_field_errors() {
        let mut doc = schema(CLIENTS);
        let name = doc.datasets[0].fields.iter_mut().find(|f| f.name == "name").unwrap();
        name.max_length = Some(3);
        assert_eq!(name.field_type, FieldType::Text);

        let mut log = EventLog::new();
        ValidationEngine::new().validate_dataset(
            &doc.datasets[0],
            &raw(Some(&["id", "name", "age"]), &[&["1", "Annabel", ""]]),
            &mut log,
        );
        let field: Vec<_> = log.by_category(Category::FieldRule).collect();
        assert_eq!(field.len(), 1);
        assert_eq!(field[0].rule.as_deref(), Some("name.max_length"));
    }
}
