//! Cross-dataset rules
//!
//! Package rules run once every member dataset has been validated on its
//! own. Columns are addressed as `dataset.column`; a failing vectorised rule
//! reports its lines against the first referenced dataset whose row count
//! matches the result.

use crate::engine::{failure, fault, DatasetOutcome, RuleScope, ValidationEngine};
use datavet_expr::PackageScope;
use datavet_report::{Category, EventLog, LogEntry};
use datavet_schema::PackageSpec;
use std::collections::HashSet;
use tracing::debug;

impl ValidationEngine {
    /// Evaluate a package's rules over its validated members
    ///
    /// Members without a typed table (missing file, unusable header) make
    /// the rules that reference them skipped rather than faulted.
    pub fn validate_package(
        &self,
        package: &PackageSpec,
        members: &[DatasetOutcome],
        log: &mut EventLog,
    ) {
        if package.rules.is_empty() {
            return;
        }
        let records = members.iter().map(|m| m.records).sum();
        if self.skip(RuleScope::Package, package.rules.iter(), records, "", log) {
            return;
        }

        let scope = PackageScope::new(members.iter().filter_map(|m| m.table.as_ref()));
        for rule in &package.rules {
            let mut referenced: Vec<&str> = Vec::new();
            for column in rule.expr.references() {
                if let Some(dataset) = column.dataset.as_deref() {
                    if !referenced.contains(&dataset) {
                        referenced.push(dataset);
                    }
                }
            }

            if let Some(absent) = referenced.iter().find(|d| scope.table(d).is_none()) {
                log.record(
                    LogEntry::warning(
                        Category::Skipped,
                        format!(
                            "Package rule '{}' not evaluated: dataset '{}' is not available",
                            rule.name, absent
                        ),
                    )
                    .with_rule(&rule.name),
                );
                continue;
            }

            match self.evaluator().check(&rule.expr, &scope) {
                Ok(verdict) if verdict.passed => {
                    debug!("Package '{}': rule '{}' passed", package.name, rule.name);
                }
                Ok(verdict) => {
                    let mut entry = failure(rule, Category::PackageRule);
                    let anchor = verdict.length.and_then(|length| {
                        referenced.iter().find_map(|name| {
                            members.iter().find(|m| {
                                m.dataset == *name
                                    && m.table.as_ref().is_some_and(|t| t.row_count() == length)
                            })
                        })
                    });
                    if let Some(member) = anchor {
                        entry = entry.with_file(&member.source);
                        if let Some(table) = &member.table {
                            if let Some(detail) = self.failure_detail(&verdict, rule, table) {
                                entry = entry.with_detail(format!("{}: {}", member.dataset, detail));
                            }
                        }
                    }
                    log.record(entry);
                }
                Err(e) => fault(rule, &e, "", None, &mut HashSet::new(), log),
            }
        }
    }
}
