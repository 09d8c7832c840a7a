//! Append-only event log
//!
//! Every outcome of a run goes through [`EventLog::record`]. The log assigns
//! sequence numbers, keeps the run-wide error and warning counters, and
//! attributes each entry to the dataset being validated at the time.

use crate::entry::{Category, Level, LogEntry};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

/// Per-dataset counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub dataset: String,
    /// File or archive entry the dataset was read from
    pub source: String,
    /// Data rows read, including rows that failed
    pub records: usize,
    pub errors: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

impl FileStats {
    fn new(dataset: &str, source: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            source: source.to_string(),
            records: 0,
            errors: 0,
            warnings: 0,
            duration_ms: 0,
        }
    }
}

#[derive(Debug)]
struct OpenDataset {
    index: usize,
    started: Instant,
}

/// Ordered list of everything that happened during a run
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    stats: Vec<FileStats>,
    open: Option<OpenDataset>,
    errors: usize,
    warnings: usize,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its sequence number
    pub fn record(&mut self, mut entry: LogEntry) -> u64 {
        entry.seq = self.entries.len() as u64 + 1;

        match entry.level {
            Level::Error => {
                self.errors += 1;
                if let Some(stats) = self.open_stats() {
                    stats.errors += 1;
                }
            }
            Level::Warning => {
                self.warnings += 1;
                if let Some(stats) = self.open_stats() {
                    stats.warnings += 1;
                }
            }
            Level::Info | Level::Success => {}
        }

        match (entry.category, entry.level) {
            (Category::Critical, _) => error!("{}", entry),
            (_, Level::Error | Level::Warning) => debug!("{}", entry),
            _ => info!("{}", entry.message),
        }

        let seq = entry.seq;
        self.entries.push(entry);
        seq
    }

    /// Start attributing entries to a dataset
    ///
    /// A dataset still open is closed first with the records it has.
    pub fn begin_dataset(&mut self, dataset: &str, source: &str) {
        if let Some(open) = &self.open {
            let records = self.stats[open.index].records;
            self.end_dataset(records);
        }
        debug!("Validating dataset '{}' from {}", dataset, source);
        self.stats.push(FileStats::new(dataset, source));
        self.open = Some(OpenDataset {
            index: self.stats.len() - 1,
            started: Instant::now(),
        });
    }

    /// Close the open dataset with its final record count
    pub fn end_dataset(&mut self, records: usize) {
        if let Some(open) = self.open.take() {
            let stats = &mut self.stats[open.index];
            stats.records = records;
            stats.duration_ms = u64::try_from(open.started.elapsed().as_millis()).unwrap_or(u64::MAX);
            debug!(
                "Dataset '{}': {} record(s), {} error(s), {} warning(s)",
                stats.dataset, stats.records, stats.errors, stats.warnings
            );
        }
    }

    fn open_stats(&mut self) -> Option<&mut FileStats> {
        let index = self.open.as_ref()?.index;
        self.stats.get_mut(index)
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn file_stats(&self) -> &[FileStats] {
        &self.stats
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Records across all datasets
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.stats.iter().map(|s| s.records).sum()
    }

    /// Entries of one category, in order
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.entries.iter().any(|e| e.category == Category::Critical)
    }

    /// Distinct (file, line) pairs that carry an error
    #[must_use]
    pub fn records_with_errors(&self) -> usize {
        let mut seen: Vec<(&str, usize)> = self
            .entries
            .iter()
            .filter(|e| e.level == Level::Error)
            .filter_map(|e| Some((e.file.as_deref()?, e.line?)))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}
