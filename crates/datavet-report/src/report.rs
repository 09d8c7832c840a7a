//! Run summary and the result files
//!
//! A [`Report`] is built from the [`EventLog`] once the run is over and
//! written as three projections of the same event list: `output.log`
//! (HTML), `results.txt` and `report.json`.

use crate::entry::{Category, LogEntry};
use crate::log::{EventLog, FileStats};
use crate::{html, text, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const OUTPUT_LOG: &str = "output.log";
pub const RESULTS_TXT: &str = "results.txt";
pub const REPORT_JSON: &str = "report.json";
pub const ERROR_LOG: &str = "error.log";

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No errors; warnings allowed
    Success,
    /// The data failed validation
    Failed,
    /// The run aborted
    Critical,
}

impl RunStatus {
    /// Derive the status from the log
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        if log.has_critical() {
            Self::Critical
        } else if log.error_count() > 0 {
            Self::Failed
        } else {
            Self::Success
        }
    }

    /// Process exit code: 0, 1 or 2
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Critical => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and context of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    /// Original schema path
    pub schema_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Original data path
    pub data_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunInfo {
    pub fn new(
        run_id: impl Into<String>,
        schema_file: impl Into<String>,
        data_file: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            schema_file: schema_file.into(),
            schema_name: None,
            schema_version: None,
            data_file: data_file.into(),
            box_id: None,
            sender_id: None,
            channel: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Milliseconds between start and finish, zero while running
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(0)
    }
}

/// Run-wide counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub records: usize,
    pub records_with_errors: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Percentage of records without errors, two decimals
    pub success_rate: f64,
}

impl Totals {
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let records = log.total_records();
        let records_with_errors = log.records_with_errors().min(records);
        Self {
            records,
            records_with_errors,
            errors: log.error_count(),
            warnings: log.warning_count(),
            success_rate: success_rate(records, records_with_errors),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(records: usize, failed: usize) -> f64 {
    if records == 0 {
        return 100.0;
    }
    let rate = (records - failed) as f64 / records as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Everything the result files contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run: RunInfo,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub totals: Totals,
    pub datasets: Vec<FileStats>,
    pub format_errors: Vec<LogEntry>,
    pub missing_files: Vec<LogEntry>,
    pub skipped_rules: Vec<LogEntry>,
    pub rule_faults: Vec<LogEntry>,
    pub events: Vec<LogEntry>,
}

impl Report {
    /// Build the report for a finished run
    #[must_use]
    pub fn build(mut run: RunInfo, log: &EventLog) -> Self {
        if run.finished_at.is_none() {
            run.finished_at = Some(Utc::now());
        }
        let section = |category| log.by_category(category).cloned().collect::<Vec<_>>();
        Self {
            duration_ms: run.duration_ms(),
            status: RunStatus::from_log(log),
            totals: Totals::from_log(log),
            datasets: log.file_stats().to_vec(),
            format_errors: section(Category::Format),
            missing_files: section(Category::MissingFile),
            skipped_rules: section(Category::Skipped),
            rule_faults: section(Category::RuleFault),
            events: log.entries().to_vec(),
            run,
        }
    }

    /// Write `output.log`, `results.txt` and `report.json` into `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        write_file(dir, OUTPUT_LOG, &html::render(self))?;
        write_file(dir, RESULTS_TXT, &text::render(self))?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        write_file(dir, REPORT_JSON, &json)?;
        info!(
            "Run {} finished: {} ({} error(s), {} warning(s))",
            self.run.run_id, self.status, self.totals.errors, self.totals.warnings
        );
        Ok(())
    }
}

/// Build the report and write the result files in one step
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn finalize(run: RunInfo, log: &EventLog, dir: &Path) -> Result<Report> {
    let report = Report::build(run, log);
    report.write_to(dir)?;
    Ok(report)
}

/// Write `error.log` for an aborted run
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_error_log(dir: &Path, run_id: &str, message: &str) -> Result<()> {
    let body = format!(
        "[{}] run {} aborted\n{}\n",
        Utc::now().to_rfc3339(),
        run_id,
        message
    );
    write_file(dir, ERROR_LOG, &body)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|e| Error::io("write", &path, &e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
