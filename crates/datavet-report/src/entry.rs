//! Log entries
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)] // Builder setters are designed for chaining.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of outcome an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Run lifecycle
    Run,
    /// Structural problem in a file
    Format,
    MissingFile,
    Coercion,
    FieldRule,
    RowRule,
    DatasetRule,
    PackageRule,
    Unique,
    /// A rule whose expression could not be evaluated
    RuleFault,
    /// A rule not evaluated because of performance limits
    Skipped,
    /// Failure that aborted the run
    Critical,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Run => "run",
            Category::Format => "format",
            Category::MissingFile => "missing_file",
            Category::Coercion => "coercion",
            Category::FieldRule => "field_rule",
            Category::RowRule => "row_rule",
            Category::DatasetRule => "dataset_rule",
            Category::PackageRule => "package_rule",
            Category::Unique => "unique",
            Category::RuleFault => "rule_fault",
            Category::Skipped => "skipped",
            Category::Critical => "critical",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reportable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the run's event log, from 1
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: Category,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LogEntry {
    /// Create an entry; the sequence number is assigned when it is recorded
    pub fn new(level: Level, category: Category, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now(),
            level,
            category,
            message: message.into(),
            detail: None,
            file: None,
            line: None,
            rule: None,
            value: None,
        }
    }

    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Level::Error, category, message)
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, category, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, Category::Run, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, Category::Run, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// `file:line` location, when known
    pub fn location(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            (Some(file), None) => Some(file.clone()),
            (None, Some(line)) => Some(format!("line {line}")),
            (None, None) => None,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.level.as_str().to_uppercase())?;
        if let Some(location) = self.location() {
            write!(f, "{location}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (value: '{value}')")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " - {detail}")?;
        }
        Ok(())
    }
}
